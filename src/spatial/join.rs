use geo::{Centroid, Contains, Geometry, Point};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::layer::GeoTable;
use crate::error::DataResult;
use crate::table::{DataType, Field, Schema, Table, Value};

pub const INDEX_RIGHT: &str = "index_right";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialJoinKind {
    #[default]
    Inner,
    Left,
}

/// Relates each point to the polygons that contain it.
///
/// Points are reprojected to the polygon CRS first when the two differ. A
/// point inside several polygons yields one row per polygon. The output
/// keeps the point geometries and appends `index_right` (row of the
/// matching polygon) and the polygon attributes; clashing column names get
/// `_left` and `_right` suffixes. With [`SpatialJoinKind::Left`] unmatched
/// points stay, with null polygon attributes.
#[tracing::instrument(skip(points, polygons), fields(points = points.len(), polygons = polygons.len()))]
pub fn spatial_join(
    points: &GeoTable,
    polygons: &GeoTable,
    kind: SpatialJoinKind,
) -> DataResult<GeoTable> {
    let points = if points.crs() != polygons.crs() {
        warn!(
            from = %points.crs(),
            to = %polygons.crs(),
            "Point layer CRS differs from polygon layer, reprojecting points"
        );
        points.reproject(polygons.crs())
    } else {
        points.clone()
    };

    let left = points.attributes();
    let right = polygons.attributes();
    let left_names = left.column_names();
    let right_names = right.column_names();

    let mut fields = Vec::with_capacity(left.width() + right.width() + 1);
    for f in left.schema().fields() {
        let name = if right_names.contains(&f.name.as_str()) || f.name == INDEX_RIGHT {
            format!("{}_left", f.name)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.dtype));
    }
    fields.push(Field::new(INDEX_RIGHT, DataType::Int));
    for f in right.schema().fields() {
        let name = if left_names.contains(&f.name.as_str()) || f.name == INDEX_RIGHT {
            format!("{}_right", f.name)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.dtype));
    }
    let mut attributes = Table::new(Schema::new(fields)?);
    let mut geometries = Vec::new();

    let mut unmatched = 0usize;
    for (pi, geometry) in points.geometries().iter().enumerate() {
        let matches: Vec<usize> = match representative_point(geometry) {
            Some(pt) => polygons
                .geometries()
                .iter()
                .enumerate()
                .filter(|(_, poly)| polygon_contains(poly, &pt))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };

        if matches.is_empty() {
            unmatched += 1;
            if kind == SpatialJoinKind::Left {
                let mut row = left.rows()[pi].clone();
                row.push(Value::Null);
                row.extend(std::iter::repeat_n(Value::Null, right.width()));
                attributes.push_row(row)?;
                geometries.push(geometry.clone());
            }
            continue;
        }
        for ri in matches {
            let mut row = left.rows()[pi].clone();
            row.push(Value::Int(ri as i64));
            row.extend(right.rows()[ri].iter().cloned());
            attributes.push_row(row)?;
            geometries.push(geometry.clone());
        }
    }

    info!(rows = attributes.len(), unmatched, ?kind, "Spatial join complete");
    GeoTable::new(polygons.crs(), attributes, geometries)
}

fn representative_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        other => other.centroid(),
    }
}

fn polygon_contains(geometry: &Geometry<f64>, point: &Point<f64>) -> bool {
    match geometry {
        Geometry::Polygon(p) => p.contains(point),
        Geometry::MultiPolygon(mp) => mp.contains(point),
        Geometry::Rect(r) => r.contains(point),
        _ => false,
    }
}
