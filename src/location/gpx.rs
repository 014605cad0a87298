//! Module to extract location fixes from GPX files.

use super::Location;
use anyhow::Context;
use futures::{stream, StreamExt, TryStreamExt};
use log::debug;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tokio::task;

/// Schema for a GPX file.
#[derive(Deserialize)]
struct Gpx {
    trk: GpxTrack,
}

/// Schema for a track in a GPX file.
#[derive(Deserialize)]
struct GpxTrack {
    trkseg: GpxTrackSegment,
}

/// Schema for a segment within a GPX track.
#[derive(Deserialize)]
struct GpxTrackSegment {
    trkpt: Vec<GpxTrackPoint>,
}

/// Schema for a track point within a GPX track segment.
#[derive(Deserialize)]
struct GpxTrackPoint {
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
}

impl Gpx {
    /// Parses the given GPX file.
    fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open GPX file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let gpx: Self = serde_xml_rs::from_reader(reader)
            .with_context(|| format!("Failed to parse GPX file: {}", path.display()))?;

        Ok(gpx)
    }

    /// Parses the given GPX document.
    #[cfg(test)]
    fn parse(xml: &str) -> anyhow::Result<Self> {
        serde_xml_rs::from_str(xml).context("Failed to parse GPX document")
    }
}

impl From<Gpx> for Vec<Location> {
    fn from(gpx: Gpx) -> Self {
        gpx.trk
            .trkseg
            .trkpt
            .iter()
            .map(|point| Location {
                latitude: point.lat,
                longitude: point.lon,
            })
            .collect()
    }
}

/// Reads the track points of the given GPX files, concatenated in the order of
/// the files.
///
/// This reads up to `parallel_requests` files in parallel.
pub async fn read_locations(
    files: &[String],
    parallel_requests: usize,
) -> anyhow::Result<Vec<Location>> {
    let tracks: Vec<Vec<Location>> = stream::iter(files)
        .map(|path| read_file(path.clone()))
        .buffered(parallel_requests)
        .try_collect()
        .await?;
    Ok(tracks.into_iter().flatten().collect())
}

/// Reads and parses the track contained in the given GPX file.
async fn read_file(path: String) -> anyhow::Result<Vec<Location>> {
    debug!("Reading GPX file {path}");
    let path2 = path.clone();
    task::spawn_blocking(move || Gpx::read_from_file(path).map(Vec::<Location>::from))
        .await
        .with_context(|| format!("Failed to join background task to read GPX file: {path2}"))?
}
