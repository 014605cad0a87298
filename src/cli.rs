//! Command-line interface.

use crate::config::SourceConfig;
use crate::ui::layout::Viewport;
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Show your location and time as a QR code.
#[derive(Parser, Debug)]
#[command(name = "QRcation")]
#[command(version)]
#[command(author)]
#[command(about = "Show your location and time as a QR code", long_about = None)]
pub struct Cli {
    /// Sub-command to choose the location provider.
    #[command(subcommand)]
    pub source_params: Option<SourceParams>,

    /// JSON file describing the behavior of the location provider
    /// (authorization, services, cadence).
    #[arg(long, value_parser = clap::value_parser!(SourceConfig))]
    pub source_config: Option<SourceConfig>,

    /// Size of the display area, in logical points.
    #[arg(long, default_value = "375x667")]
    pub viewport: Viewport,

    /// Display scale factor, i.e. number of device pixels per logical point.
    #[arg(long, default_value_t = 2.0, value_parser = parse_scale)]
    pub scale: f64,

    /// PNG file where the QR code is written.
    #[arg(long, short = 'o', default_value = "qrcation.png")]
    pub output: PathBuf,

    /// Fixed UTC offset (e.g. `+05:30`), instead of the system timezone.
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset: Option<FixedOffset>,

    /// Maximum number of QR codes to encode in parallel.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=16))]
    pub encode_workers: u32,

    /// Exit after this many display updates.
    #[arg(long)]
    pub max_updates: Option<usize>,
}

/// Parameters to choose the location provider.
#[derive(Subcommand, Debug)]
pub enum SourceParams {
    /// Report a fixed location.
    Fixed(FixedParams),

    /// Replay the track points of GPX file(s).
    Gpx(GpxParams),

    /// Replay the positions of GeoJSON file(s).
    Geojson(GeoJsonParams),

    /// Wander randomly around a starting location.
    Walk(WalkParams),
}

/// Parameters of a fixed location.
#[derive(Parser, Debug)]
pub struct FixedParams {
    /// Latitude, in decimal degrees.
    #[arg(long, default_value_t = 52.5014787, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude, in decimal degrees.
    #[arg(long, default_value_t = 13.4358693, allow_hyphen_values = true)]
    pub lon: f64,
}

impl Default for FixedParams {
    fn default() -> Self {
        Self {
            lat: 52.5014787,
            lon: 13.4358693,
        }
    }
}

/// Parameters to load GPX files.
#[derive(Parser, Debug)]
pub struct GpxParams {
    /// GPX file(s) to read.
    #[arg(long = "file", short = 'f', required = true, value_delimiter = ',')]
    pub files: Vec<String>,
}

/// Parameters to load GeoJSON files.
#[derive(Parser, Debug)]
pub struct GeoJsonParams {
    /// GeoJSON file(s) to read.
    #[arg(long = "file", short = 'f', required = true, value_delimiter = ',')]
    pub files: Vec<String>,
}

/// Parameters of a random walk.
#[derive(Parser, Debug)]
pub struct WalkParams {
    /// Starting latitude, in decimal degrees.
    #[arg(long, default_value_t = 52.5014787, allow_hyphen_values = true)]
    pub lat: f64,

    /// Starting longitude, in decimal degrees.
    #[arg(long, default_value_t = 13.4358693, allow_hyphen_values = true)]
    pub lon: f64,

    /// Distance between two consecutive fixes, in meters.
    #[arg(long, default_value_t = 25.0)]
    pub step_meters: f64,

    /// Number of fixes in the walk.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=100000))]
    pub points: u32,
}

/// Parses a display scale factor between 0.5 and 4.
fn parse_scale(s: &str) -> Result<f64, String> {
    let scale: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.5..=4.0).contains(&scale) {
        Ok(scale)
    } else {
        Err(format!("scale must be between 0.5 and 4, found {scale}"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["qrcation"]).unwrap();
        assert!(cli.source_params.is_none());
        assert!(cli.source_config.is_none());
        assert_eq!(
            cli.viewport,
            Viewport {
                width: 375.0,
                height: 667.0
            }
        );
        assert_eq!(cli.scale, 2.0);
        assert_eq!(cli.output, PathBuf::from("qrcation.png"));
        assert_eq!(cli.encode_workers, 2);
    }

    #[test]
    fn walk_and_offset() {
        let cli = Cli::try_parse_from([
            "qrcation",
            "--utc-offset",
            "-05:00",
            "--scale",
            "3",
            "walk",
            "--lat",
            "-33.8688",
            "--points",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.utc_offset, FixedOffset::west_opt(5 * 3600));
        assert_eq!(cli.scale, 3.0);
        match cli.source_params {
            Some(SourceParams::Walk(walk)) => {
                assert_eq!(walk.lat, -33.8688);
                assert_eq!(walk.points, 10);
            }
            other => panic!("Unexpected source: {other:?}"),
        }
    }

    #[test]
    fn invalid_scale() {
        assert!(Cli::try_parse_from(["qrcation", "--scale", "10"]).is_err());
    }
}
