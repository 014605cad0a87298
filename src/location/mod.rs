//! Module to track the device's location, and to load location fixes from
//! various providers.

pub mod geojson;
pub mod gpx;
pub mod replay;
pub mod tracker;
pub mod walk;

use futures::channel::mpsc::UnboundedSender;
use std::sync::{Arc, RwLock};

/// A single geolocation reading, in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

/// Single-slot cell holding the most recent location fix.
///
/// Cloning the handle shares the same slot: the tracker writes it, the
/// scheduler reads it. Only the latest value survives.
#[derive(Clone, Default)]
pub struct LatestFix {
    slot: Arc<RwLock<Option<Location>>>,
}

impl LatestFix {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the latest fix, if any was ever received.
    pub fn current_fix(&self) -> Option<Location> {
        *self.slot.read().unwrap()
    }

    /// Overwrites the latest fix.
    pub fn store(&self, location: Location) {
        *self.slot.write().unwrap() = Some(location);
    }
}

/// Authorization state of the location provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user hasn't been asked yet.
    NotDetermined,
    /// Access is restricted by a policy outside of the user's control.
    Restricted,
    /// The user refused access.
    Denied,
    /// Access is allowed at any time.
    AuthorizedAlways,
    /// Access is allowed while the application is in use.
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    /// Whether this status allows starting location updates.
    pub fn is_granted(&self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse
        )
    }
}

/// Event delivered by a [`LocationSource`].
#[derive(Clone, Debug, PartialEq)]
pub enum LocationEvent {
    /// Batch of fixes, ordered from oldest to newest.
    Updates(Vec<Location>),
    /// The authorization status changed.
    AuthorizationChanged(AuthorizationStatus),
    /// Informational failure of the provider.
    Error(String),
}

/// Sending side of the location event channel.
pub type LocationEventSender = UnboundedSender<LocationEvent>;

/// A provider of location fixes.
///
/// Results are delivered asynchronously as [`LocationEvent`]s on the channel
/// the source was constructed with.
pub trait LocationSource: Send {
    /// Current authorization status.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Asks for authorization. The outcome is delivered as a
    /// [`LocationEvent::AuthorizationChanged`].
    fn request_authorization(&mut self);

    /// Whether location services are enabled at the platform level.
    fn services_enabled(&self) -> bool;

    /// Starts streaming location updates.
    fn start_updates(&mut self) -> anyhow::Result<()>;

    /// Stops streaming location updates.
    fn stop_updates(&mut self);
}
