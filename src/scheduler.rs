//! Background service sampling the latest location at a fixed cadence, and
//! sending the rendered QR codes to the UI thread.

use crate::config::{LOCATION_MISSING, TICK_INTERVAL};
use crate::encoder;
use crate::location::LatestFix;
use crate::payload::{PayloadFormatter, Sample};
use crate::ui::util::warn_on_error;
use crate::ui::{RenderedResult, UiMessage};
use log::{debug, info, trace};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

/// Turns a location sample into an image and a summary.
///
/// This runs on a background worker, away from the UI thread.
pub trait SampleRenderer: Send + Sync + 'static {
    /// Renders the given sample.
    fn render(&self, sample: &Sample) -> RenderedResult;
}

/// Renders samples as QR codes of a fixed size.
pub struct QrRenderer {
    formatter: PayloadFormatter,
    /// Side of the QR code, in device pixels.
    pixel_size: u32,
}

impl QrRenderer {
    /// Creates a renderer of `pixel_size` × `pixel_size` QR codes.
    pub fn new(formatter: PayloadFormatter, pixel_size: u32) -> Self {
        Self {
            formatter,
            pixel_size,
        }
    }
}

impl SampleRenderer for QrRenderer {
    fn render(&self, sample: &Sample) -> RenderedResult {
        let payload = self.formatter.format(sample);
        trace!("Encoding {:?}", payload.encode_text);
        RenderedResult {
            image: encoder::encode(&payload.encode_text, self.pixel_size),
            display_text: payload.display_text,
        }
    }
}

/// Notifications from the host environment when the application changes
/// visibility.
pub trait Lifecycle {
    /// The application went to the background.
    fn on_background(&mut self);
    /// The application came back to the foreground.
    fn on_foreground(&mut self);
}

/// Whether the scheduler is ticking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No tick is scheduled.
    Idle,
    /// Ticks are scheduled every [`TICK_INTERVAL`].
    Running,
}

/// Everything needed to process one tick.
#[derive(Clone)]
struct Ticker {
    latest: LatestFix,
    renderer: Arc<dyn SampleRenderer>,
    ui_tx: Sender<UiMessage>,
}

impl Ticker {
    /// Samples the latest fix and hands it to a background worker, or reports
    /// that the location is missing.
    fn tick(&self) {
        let Some(location) = self.latest.current_fix() else {
            debug!("No location fix yet");
            warn_on_error(
                self.ui_tx.send(UiMessage::Status(LOCATION_MISSING.to_owned())),
                "status to UI",
            );
            return;
        };

        let sample = Sample::now(location);
        trace!("Sampled {sample:?}");
        let renderer = self.renderer.clone();
        let ui_tx = self.ui_tx.clone();
        // Not awaited: a result may land after the scheduler is stopped, and
        // results of overlapping ticks may land in any order.
        task::spawn_blocking(move || {
            let result = renderer.render(&sample);
            warn_on_error(ui_tx.send(UiMessage::Code(result)), "QR code to UI");
        });
    }

    /// Loop that ticks at a fixed cadence, the first tick one interval after
    /// the start.
    async fn tick_loop(self) {
        let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick();
        }
    }
}

/// Drives the sampling of the latest location fix.
pub struct SampleScheduler {
    ticker: Ticker,
    /// Runtime on which the ticks are scheduled.
    handle: Handle,
    /// Tick task, while running.
    task: Option<JoinHandle<()>>,
}

impl SampleScheduler {
    /// Creates an idle scheduler reading from the given slot and sending the
    /// results to the UI thread.
    pub fn new(
        latest: LatestFix,
        renderer: Arc<dyn SampleRenderer>,
        ui_tx: Sender<UiMessage>,
        handle: Handle,
    ) -> Self {
        Self {
            ticker: Ticker {
                latest,
                renderer,
                ui_tx,
            },
            handle,
            task: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        match self.task {
            Some(_) => SchedulerState::Running,
            None => SchedulerState::Idle,
        }
    }

    /// Starts ticking, replacing any previous cadence.
    pub fn start(&mut self) {
        if self.state() == SchedulerState::Running {
            debug!("Restarting the sample scheduler");
        }
        self.stop();
        info!("Starting the sample scheduler");
        self.task = Some(self.handle.spawn(self.ticker.clone().tick_loop()));
    }

    /// Stops ticking. Work already handed to a background worker still
    /// completes and publishes its result.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            info!("Stopping the sample scheduler");
            task.abort();
        }
    }
}

impl Lifecycle for SampleScheduler {
    fn on_background(&mut self) {
        self.stop();
    }

    fn on_foreground(&mut self) {
        self.start();
    }
}

impl Drop for SampleScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::location::Location;
    use chrono::{DateTime, FixedOffset, Locale, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::runtime::Runtime;

    const KREUZBERG: Location = Location {
        latitude: 52.5014787,
        longitude: 13.4358693,
    };

    /// Renderer counting how many samples it rendered.
    #[derive(Default)]
    struct CountingRenderer {
        count: AtomicUsize,
    }

    impl SampleRenderer for CountingRenderer {
        fn render(&self, _sample: &Sample) -> RenderedResult {
            self.count.fetch_add(1, Ordering::SeqCst);
            RenderedResult {
                image: None,
                display_text: String::new(),
            }
        }
    }

    /// Renderer recording the timestamps of the samples.
    #[derive(Default)]
    struct RecordingRenderer {
        timestamps: Mutex<Vec<DateTime<Utc>>>,
    }

    impl SampleRenderer for RecordingRenderer {
        fn render(&self, sample: &Sample) -> RenderedResult {
            self.timestamps.lock().unwrap().push(sample.timestamp);
            RenderedResult {
                image: None,
                display_text: String::new(),
            }
        }
    }

    /// Renderer blocking until the test releases it.
    struct GatedRenderer {
        started_tx: Mutex<Sender<()>>,
        release_rx: Mutex<Receiver<()>>,
        count: AtomicUsize,
    }

    impl SampleRenderer for GatedRenderer {
        fn render(&self, _sample: &Sample) -> RenderedResult {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.started_tx.lock().unwrap().send(()).unwrap();
            self.release_rx
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(10))
                .unwrap();
            RenderedResult {
                image: None,
                display_text: "late".to_owned(),
            }
        }
    }

    fn drain(ui_rx: &Receiver<UiMessage>) -> Vec<UiMessage> {
        ui_rx.try_iter().collect()
    }

    #[tokio::test(start_paused = true)]
    async fn missing_location_never_encodes() {
        let renderer = Arc::new(CountingRenderer::default());
        let (ui_tx, ui_rx) = channel();
        let mut scheduler =
            SampleScheduler::new(LatestFix::new(), renderer.clone(), ui_tx, Handle::current());
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        time::sleep(Duration::from_millis(2500)).await;
        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let messages = drain(&ui_rx);
        assert!(messages.len() >= 2, "{messages:?}");
        for msg in messages {
            assert!(
                matches!(&msg, UiMessage::Status(status) if status == "Location Missing"),
                "{msg:?}"
            );
        }
        assert_eq!(renderer.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_keeps_one_cadence() {
        let (ui_tx, ui_rx) = channel();
        let mut scheduler = SampleScheduler::new(
            LatestFix::new(),
            Arc::new(CountingRenderer::default()),
            ui_tx,
            Handle::current(),
        );

        scheduler.start();
        scheduler.start();
        time::sleep(Duration::from_millis(5500)).await;
        scheduler.stop();

        // Ticks at 1, 2, 3, 4 and 5 seconds.
        let ticks = drain(&ui_rx).len();
        assert!((5..=6).contains(&ticks), "{ticks} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_stops_and_restarts() {
        let (ui_tx, ui_rx) = channel();
        let mut scheduler = SampleScheduler::new(
            LatestFix::new(),
            Arc::new(CountingRenderer::default()),
            ui_tx,
            Handle::current(),
        );

        scheduler.on_foreground();
        time::sleep(Duration::from_millis(1500)).await;
        scheduler.on_background();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!drain(&ui_rx).is_empty());

        time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&ui_rx).is_empty());

        scheduler.on_foreground();
        time::sleep(Duration::from_millis(500)).await;
        assert!(drain(&ui_rx).is_empty());
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(drain(&ui_rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_interval() {
        let (ui_tx, ui_rx) = channel();
        let mut scheduler = SampleScheduler::new(
            LatestFix::new(),
            Arc::new(CountingRenderer::default()),
            ui_tx,
            Handle::current(),
        );

        scheduler.start();
        time::sleep(Duration::from_millis(900)).await;
        assert!(drain(&ui_rx).is_empty());
        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(drain(&ui_rx).len(), 1);
    }

    #[test]
    fn renders_qr_code_with_fix() {
        let rt = Runtime::new().unwrap();
        let latest = LatestFix::new();
        latest.store(KREUZBERG);
        let formatter =
            PayloadFormatter::new(Locale::en_US, Some(FixedOffset::east_opt(7200).unwrap()));
        let (ui_tx, ui_rx) = channel();
        let mut scheduler = SampleScheduler::new(
            latest,
            Arc::new(QrRenderer::new(formatter, 120)),
            ui_tx,
            rt.handle().clone(),
        );

        scheduler.start();
        let msg = ui_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();

        let result = match msg {
            UiMessage::Code(result) => result,
            other => panic!("Expected a QR code, got {other:?}"),
        };
        assert_eq!(result.image.map(|image| image.dimensions()), Some((120, 120)));
        let lines: Vec<&str> = result.display_text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "LatLong: 52.501479, 13.435869");
        assert!(lines[1].starts_with("Time: "));
        assert_eq!(lines[2], "Timezone: +2");
    }

    #[test]
    fn sample_is_timestamped_at_tick_time() {
        let rt = Runtime::new().unwrap();
        let latest = LatestFix::new();
        latest.store(KREUZBERG);
        std::thread::sleep(Duration::from_millis(1200));
        let t0 = Utc::now();

        let renderer = Arc::new(RecordingRenderer::default());
        let (ui_tx, ui_rx) = channel();
        let mut scheduler =
            SampleScheduler::new(latest, renderer.clone(), ui_tx, rt.handle().clone());
        scheduler.start();
        ui_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();

        let timestamps = renderer.timestamps.lock().unwrap();
        assert!(!timestamps.is_empty());
        for timestamp in timestamps.iter() {
            assert!(*timestamp >= t0, "{timestamp} < {t0}");
        }
    }

    #[test]
    fn qr_renderer_layout() {
        let formatter =
            PayloadFormatter::new(Locale::en_US, Some(FixedOffset::east_opt(0).unwrap()));
        let renderer = QrRenderer::new(formatter, 64);
        let sample = Sample::now(KREUZBERG);
        let result = renderer.render(&sample);

        let expected = formatter.format(&sample);
        assert_eq!(result.display_text, expected.display_text);
        assert_eq!(
            expected.encode_text,
            format!(
                "52.5014787, 13.4358693 {} 0",
                crate::payload::epoch_millis(&sample.timestamp)
            )
        );
        assert!(result.image.is_some());
    }

    #[test]
    fn late_publish_after_stop() {
        let rt = Runtime::new().unwrap();
        let latest = LatestFix::new();
        latest.store(KREUZBERG);
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        let renderer = Arc::new(GatedRenderer {
            started_tx: Mutex::new(started_tx),
            release_rx: Mutex::new(release_rx),
            count: AtomicUsize::new(0),
        });
        let (ui_tx, ui_rx) = channel();
        let mut scheduler =
            SampleScheduler::new(latest, renderer.clone(), ui_tx, rt.handle().clone());

        scheduler.start();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();
        release_tx.send(()).unwrap();

        let msg = ui_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(
            matches!(&msg, UiMessage::Code(result) if result.display_text == "late"),
            "{msg:?}"
        );

        // No tick after the scheduler was stopped.
        assert_eq!(
            ui_rx.recv_timeout(Duration::from_millis(1500)).unwrap_err(),
            RecvTimeoutError::Timeout
        );
        assert_eq!(renderer.count.load(Ordering::SeqCst), 1);
    }
}
