//! Geo layers: point construction, CRS handling, spatial joins and
//! shapefile/GeoJSON export.

pub mod crs;
pub mod geojson_io;
pub mod join;
pub mod layer;
pub mod shapefile_io;

pub use crs::Crs;
pub use geojson_io::{read_geojson, to_geojson, write_geojson};
pub use join::{INDEX_RIGHT, SpatialJoinKind, spatial_join};
pub use layer::{GeoTable, points_from_table};
pub use shapefile_io::{read_shapefile, write_shapefile};

use anyhow::{Result, bail};
use geo::{Geometry, Polygon, polygon};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DataResult;
use crate::table::{DataType, Schema, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoFormat {
    Shapefile,
    GeoJson,
}

impl GeoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            GeoFormat::Shapefile => "shp",
            GeoFormat::GeoJson => "geojson",
        }
    }
}

/// Writes `layer` to `path` in `format`. GeoJSON output is always EPSG:4326.
#[tracing::instrument(skip(layer), fields(features = layer.len()))]
pub fn export(layer: &GeoTable, path: &Path, format: GeoFormat) -> Result<()> {
    match format {
        GeoFormat::Shapefile => write_shapefile(layer, path),
        GeoFormat::GeoJson => write_geojson(layer, path),
    }
}

/// Reads a layer from a `.shp`, `.geojson` or `.json` file.
pub fn load_layer(path: &Path) -> Result<GeoTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("shp") => read_shapefile(path),
        Some("geojson" | "json") => read_geojson(path),
        _ => bail!("unsupported layer format: {}", path.display()),
    }
}

/// Two districts splitting the study area along 18.5°E, in EPSG:4326.
pub fn sample_districts() -> DataResult<GeoTable> {
    let west: Polygon<f64> = polygon![
        (x: 18.0, y: 49.5),
        (x: 18.5, y: 49.5),
        (x: 18.5, y: 50.0),
        (x: 18.0, y: 50.0),
        (x: 18.0, y: 49.5),
    ];
    let east: Polygon<f64> = polygon![
        (x: 18.5, y: 49.5),
        (x: 19.0, y: 49.5),
        (x: 19.0, y: 50.0),
        (x: 18.5, y: 50.0),
        (x: 18.5, y: 49.5),
    ];

    let mut attributes = Table::new(
        Schema::of(&[
            ("district_id", DataType::Int),
            ("district", DataType::Text),
            ("name", DataType::Text),
        ])?,
    );
    for (id, district, name) in [(1, "West", "Western district"), (2, "East", "Eastern district")] {
        attributes.push_row(vec![Value::Int(id), Value::text(district), Value::text(name)])?;
    }

    GeoTable::new(
        Crs::Wgs84,
        attributes,
        vec![Geometry::Polygon(west), Geometry::Polygon(east)],
    )
}
