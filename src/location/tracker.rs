//! Background service keeping track of the latest location fix.

use super::{AuthorizationStatus, LatestFix, LocationEvent, LocationSource};
use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use log::{debug, info, trace, warn};

/// Tracks the latest fix reported by a [`LocationSource`].
pub struct LocationTracker<S> {
    /// Provider of location fixes.
    source: S,
    /// Slot where the latest fix is stored.
    latest: LatestFix,
}

impl<S: LocationSource> LocationTracker<S> {
    /// Creates a new tracker writing to the given slot.
    pub fn new(source: S, latest: LatestFix) -> Self {
        Self { source, latest }
    }

    /// Asks for authorization if it was never determined, otherwise starts the
    /// location updates right away.
    pub fn setup(&mut self) {
        match self.source.authorization_status() {
            AuthorizationStatus::NotDetermined => {
                info!("Requesting location authorization");
                self.source.request_authorization();
            }
            status if status.is_granted() => self.start_updates(),
            status => warn!("Location permission not allowed, status: {status:?}"),
        }
    }

    /// Loop that processes the events sent by the location source.
    ///
    /// This loop terminates when the event channel is closed.
    pub async fn run(mut self, mut events: UnboundedReceiver<LocationEvent>) {
        self.setup();
        while let Some(event) = events.next().await {
            self.process_event(event);
        }
        self.source.stop_updates();
        info!("End of LocationTracker::run");
    }

    /// Processes a single event from the location source.
    pub fn process_event(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::Updates(locations) => match locations.last() {
                Some(&last) => {
                    trace!("Received {} location(s), latest = {last:?}", locations.len());
                    self.latest.store(last);
                }
                None => debug!("Received an empty batch of locations"),
            },
            LocationEvent::AuthorizationChanged(status) => {
                if status.is_granted() {
                    info!("Location authorization granted: {status:?}");
                    self.start_updates();
                } else if status == AuthorizationStatus::NotDetermined {
                    debug!("Location authorization still not determined");
                } else {
                    warn!("Location permission not allowed, status: {status:?}");
                }
            }
            LocationEvent::Error(e) => warn!("Location error: {e}"),
        }
    }

    /// Starts the location updates, unless location services are disabled.
    fn start_updates(&mut self) {
        if !self.source.services_enabled() {
            warn!("Location services not enabled");
            return;
        }
        if let Err(e) = self.source.start_updates() {
            warn!("Failed to start location updates: {e:?}");
        }
    }
}
