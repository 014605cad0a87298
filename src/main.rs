//! QRcation - show your location and time as a QR code!

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cli;
mod config;
mod encoder;
mod lifecycle;
mod location;
mod payload;
mod scheduler;
mod ui;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, FixedParams, SourceParams};
use config::SourceConfig;
use futures::channel::mpsc::unbounded;
use futures::channel::oneshot;
use futures::future::{self, FutureExt};
use futures::select;
use lifecycle::Exit;
use location::replay::ReplaySource;
use location::tracker::LocationTracker;
use location::{LatestFix, Location};
use log::{error, info};
use payload::PayloadFormatter;
use scheduler::{QrRenderer, SampleScheduler};
use std::sync::mpsc::{channel, Sender};
use std::io::BufReader;
use std::sync::Arc;
use std::thread;
use tokio::runtime::{Builder, Handle};
use ui::layout::Layout;
use ui::window::Window;
use ui::UiMessage;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Cli {
        source_params,
        source_config,
        viewport,
        scale,
        output,
        utc_offset,
        encode_workers,
        max_updates,
    } = Cli::parse();

    let layout = Layout::new(viewport);
    let pixel_size = layout.pixel_size(scale);
    let formatter = PayloadFormatter::from_env(utc_offset);
    let source_config = source_config.unwrap_or_default();

    // Separate threads for the UI and the background work.
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let (ui_tx, ui_rx) = channel();

    let background = thread::spawn(move || -> anyhow::Result<()> {
        let rt = Builder::new_multi_thread()
            .enable_all()
            .max_blocking_threads(encode_workers as usize)
            .build()
            .context("Failed to create the Tokio runtime")?;
        let handle = rt.handle().clone();

        // Spawn the root task.
        let result = rt.block_on(async {
            select!(
                _ = cancel_rx.fuse() => Ok(()),
                res = tokio_loop(
                    ui_tx,
                    handle,
                    source_params,
                    source_config,
                    formatter,
                    pixel_size,
                    encode_workers as usize,
                ).fuse() => res,
            )
        });
        info!("End of background thread");
        result
    });

    match Window::ui_loop(ui_rx, cancel_tx, layout, &output, max_updates) {
        Ok(()) => info!("End of UI thread"),
        Err(e) => error!("Failed to run UI thread: {e:?}"),
    }

    match background.join() {
        Ok(result) => result,
        Err(_) => bail!("Background thread panicked"),
    }
}

/// Asynchronous loop tracking the location and sampling it, sending the
/// results to the UI thread via a channel.
///
/// This is invoked with a Tokio runtime in a background thread by the main
/// function.
async fn tokio_loop(
    ui_tx: Sender<UiMessage>,
    handle: Handle,
    source_params: Option<SourceParams>,
    source_config: SourceConfig,
    formatter: PayloadFormatter,
    pixel_size: u32,
    parallel_requests: usize,
) -> anyhow::Result<()> {
    let locations = load_locations(source_params, parallel_requests).await?;
    info!("Loaded {} location fix(es)", locations.len());

    let latest = LatestFix::new();
    let (events_tx, events_rx) = unbounded();
    let source = ReplaySource::new(locations, source_config, events_tx, handle.clone());
    let tracker = LocationTracker::new(source, latest.clone());

    let renderer = Arc::new(QrRenderer::new(formatter, pixel_size));
    let mut scheduler = SampleScheduler::new(latest, renderer, ui_tx, handle);
    scheduler.start();

    let commands = async {
        let lines = lifecycle::read_lines(BufReader::new(std::io::stdin()));
        match lifecycle::command_loop(lines, &mut scheduler).await? {
            Exit::Quit => info!("Quitting"),
            // Keep running until interrupted.
            Exit::EndOfInput => future::pending::<()>().await,
        }
        anyhow::Ok(())
    };

    let result = select!(
        _ = tracker.run(events_rx).fuse() => Ok(()),
        res = commands.fuse() => res,
        res = tokio::signal::ctrl_c().fuse() => {
            res.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted");
            Ok(())
        },
    );
    result
}

/// Loads the location fixes to replay, based on the given parameters.
async fn load_locations(
    source_params: Option<SourceParams>,
    parallel_requests: usize,
) -> anyhow::Result<Vec<Location>> {
    let locations = match source_params {
        None => fixed_location(FixedParams::default()),
        Some(SourceParams::Fixed(params)) => fixed_location(params),
        Some(SourceParams::Gpx(params)) => {
            location::gpx::read_locations(&params.files, parallel_requests)
                .await
                .context("Failed to load GPX track")?
        }
        Some(SourceParams::Geojson(params)) => {
            location::geojson::read_locations(&params.files, parallel_requests)
                .await
                .context("Failed to load GeoJSON track")?
        }
        Some(SourceParams::Walk(params)) => location::walk::random_walk(
            &mut rand::rng(),
            Location {
                latitude: params.lat,
                longitude: params.lon,
            },
            params.step_meters,
            params.points as usize,
        ),
    };
    if locations.is_empty() {
        bail!("No location found in the given track(s)");
    }
    Ok(locations)
}

/// A single fix at the given location.
fn fixed_location(params: FixedParams) -> Vec<Location> {
    vec![Location {
        latitude: params.lat,
        longitude: params.lon,
    }]
}
