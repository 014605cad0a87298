//! Module to extract location fixes from GeoJSON files.

use super::Location;
use anyhow::Context;
use futures::{stream, StreamExt, TryStreamExt};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, PointType, Value};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tokio::task;

struct GeoJsonFile {
    inner: GeoJson,
}

impl GeoJsonFile {
    /// Parses the given GeoJSON file.
    fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open GeoJSON file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let geojson = GeoJson::from_reader(reader)
            .with_context(|| format!("Failed to parse GeoJSON file: {}", path.display()))?;

        Ok(Self { inner: geojson })
    }
}

/// Appends the positions of a line, which GeoJSON stores as (longitude,
/// latitude) pairs.
fn push_line(line: &[PointType], locations: &mut Vec<Location>) {
    locations.extend(line.iter().map(|position| Location {
        latitude: position[1],
        longitude: position[0],
    }));
}

impl From<GeoJsonFile> for Vec<Location> {
    fn from(geo: GeoJsonFile) -> Self {
        fn visit_feature_collection(collection: &FeatureCollection, locations: &mut Vec<Location>) {
            for feature in &collection.features {
                visit_feature(feature, locations);
            }
        }

        fn visit_feature(feature: &Feature, locations: &mut Vec<Location>) {
            if let Some(geometry) = &feature.geometry {
                visit_geometry(geometry, locations);
            }
        }

        fn visit_geometry(geometry: &Geometry, locations: &mut Vec<Location>) {
            match &geometry.value {
                Value::Point(position) => push_line(std::slice::from_ref(position), locations),
                Value::MultiPoint(line) | Value::LineString(line) => push_line(line, locations),
                Value::MultiLineString(lines) => {
                    for line in lines {
                        push_line(line, locations);
                    }
                }
                Value::Polygon(_) | Value::MultiPolygon(_) => (),
                Value::GeometryCollection(collection) => {
                    for geometry in collection {
                        visit_geometry(geometry, locations);
                    }
                }
            }
        }

        let mut locations = Vec::new();
        match &geo.inner {
            GeoJson::FeatureCollection(collection) => {
                visit_feature_collection(collection, &mut locations)
            }
            GeoJson::Feature(feature) => visit_feature(feature, &mut locations),
            GeoJson::Geometry(geometry) => visit_geometry(geometry, &mut locations),
        }
        locations
    }
}

/// Reads the positions of the given GeoJSON files, concatenated in the order of
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

/// Reads and parses the positions contained in the given GeoJSON file.
async fn read_file(path: String) -> anyhow::Result<Vec<Location>> {
    debug!("Reading GeoJSON file {path}");
    let path2 = path.clone();
    task::spawn_blocking(move || GeoJsonFile::read_from_file(path).map(Vec::<Location>::from))
        .await
        .with_context(|| format!("Failed to join background task to read GeoJSON file: {path2}"))?
}
