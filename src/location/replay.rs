//! Location provider replaying a pre-recorded list of fixes.

use super::{AuthorizationStatus, Location, LocationEvent, LocationEventSender, LocationSource};
use crate::config::SourceConfig;
use crate::ui::util::warn_on_error;
use anyhow::bail;
use log::{debug, info};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Replays a list of fixes in batches, at a fixed interval.
pub struct ReplaySource {
    /// Fixes to replay, in order.
    locations: Arc<[Location]>,
    /// Simulated provider behavior.
    config: SourceConfig,
    /// Current authorization status.
    status: AuthorizationStatus,
    /// Channel to deliver events to the tracker.
    tx: LocationEventSender,
    /// Runtime on which the replay task is spawned.
    handle: Handle,
    /// Replay task, while updates are running.
    task: Option<JoinHandle<()>>,
}

impl ReplaySource {
    /// Creates a new provider replaying the given fixes.
    pub fn new(
        locations: Vec<Location>,
        config: SourceConfig,
        tx: LocationEventSender,
        handle: Handle,
    ) -> Self {
        Self {
            locations: locations.into(),
            status: config.authorization,
            config,
            tx,
            handle,
            task: None,
        }
    }

    /// Loop that sends the fixes in batches.
    async fn replay_loop(
        locations: Arc<[Location]>,
        config: SourceConfig,
        tx: LocationEventSender,
    ) {
        let batch_size = config.batch_size.max(1);
        let mut interval = time::interval(config.fix_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            for batch in locations.chunks(batch_size) {
                interval.tick().await;
                debug!("Replaying {} fix(es)", batch.len());
                if tx
                    .unbounded_send(LocationEvent::Updates(batch.to_vec()))
                    .is_err()
                {
                    debug!("Location channel closed, stopping replay");
                    return;
                }
            }
            if !config.repeat {
                info!("All {} fixes were replayed", locations.len());
                warn_on_error(
                    tx.unbounded_send(LocationEvent::Error(
                        "No more location fixes to replay".to_owned(),
                    )),
                    "end of track on location channel",
                );
                return;
            }
        }
    }
}

impl LocationSource for ReplaySource {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status
    }

    fn request_authorization(&mut self) {
        self.status = self.config.authorization_response;
        warn_on_error(
            self.tx
                .unbounded_send(LocationEvent::AuthorizationChanged(self.status)),
            "authorization change on location channel",
        );
    }

    fn services_enabled(&self) -> bool {
        self.config.services_enabled
    }

    fn start_updates(&mut self) -> anyhow::Result<()> {
        if self.locations.is_empty() {
            bail!("No location to replay");
        }
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Location updates already running");
            return Ok(());
        }

        info!("Starting location updates");
        self.task = Some(self.handle.spawn(Self::replay_loop(
            self.locations.clone(),
            self.config.clone(),
            self.tx.clone(),
        )));
        Ok(())
    }

    fn stop_updates(&mut self) {
        if let Some(task) = self.task.take() {
            info!("Stopping location updates");
            task.abort();
        }
    }
}
