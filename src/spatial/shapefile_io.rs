//! ESRI shapefile reading and writing.
//!
//! A layer is written as `.shp`/`.shx`/`.dbf` plus a `.prj` holding the
//! layer CRS. dBase limits field names to 10 bytes, so longer column
//! names are truncated (and de-duplicated with a numeric tail).

use anyhow::{Context, Result, anyhow, bail};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{PolygonRing, Shape};
use std::path::Path;
use tracing::{debug, info, warn};

use super::crs::Crs;
use super::layer::GeoTable;
use crate::output::ensure_parent;
use crate::table::{DataType, Table, Value};

const MAX_FIELD_NAME: usize = 10;
const TEXT_FIELD_LEN: u8 = 254;

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_bytes(s: &str, max: usize) -> &str {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Column names as they will appear in the `.dbf`.
pub fn dbf_field_names(columns: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for column in columns {
        let base = truncate_bytes(column, MAX_FIELD_NAME);
        let mut name = base.to_string();
        let mut n = 1;
        while out.contains(&name) {
            let tail = n.to_string();
            let keep = MAX_FIELD_NAME.saturating_sub(tail.len());
            name = format!("{}{}", truncate_bytes(base, keep), tail);
            n += 1;
        }
        out.push(name);
    }
    out
}

pub fn write_shapefile(layer: &GeoTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let attributes = layer.attributes();
    let names = dbf_field_names(&attributes.column_names());
    let renamed = attributes
        .column_names()
        .iter()
        .zip(&names)
        .filter(|(a, b)| **a != b.as_str())
        .count();
    if renamed > 0 {
        warn!(renamed, "Column names truncated to fit dBase field limits");
    }

    let mut builder = TableWriterBuilder::new();
    for (field, name) in attributes.schema().fields().iter().zip(&names) {
        let field_name =
            FieldName::try_from(name.as_str()).map_err(|e| anyhow!("invalid field name {name}: {e:?}"))?;
        builder = match field.dtype {
            DataType::Int => builder.add_numeric_field(field_name, 18, 0),
            DataType::Float => builder.add_numeric_field(field_name, 24, 10),
            DataType::Bool => builder.add_logical_field(field_name),
            DataType::Text | DataType::Date | DataType::Timestamp => {
                builder.add_character_field(field_name, TEXT_FIELD_LEN)
            }
        };
    }

    let records: Vec<Record> = attributes
        .rows()
        .iter()
        .map(|row| {
            let mut record = Record::default();
            for ((value, field), name) in row.iter().zip(attributes.schema().fields()).zip(&names) {
                record.insert(name.clone(), field_value(value, field.dtype));
            }
            record
        })
        .collect();

    let points = layer
        .geometries()
        .iter()
        .map(|g| match g {
            Geometry::Point(p) => Some(shapefile::Point::new(p.x(), p.y())),
            _ => None,
        })
        .collect::<Option<Vec<_>>>();
    let polygons = layer
        .geometries()
        .iter()
        .map(to_shp_polygon)
        .collect::<Option<Vec<_>>>();

    if points.is_none() && polygons.is_none() {
        bail!(
            "{}: shapefiles hold a single geometry type, layer mixes points and polygons",
            path.display()
        );
    }

    let mut writer = shapefile::Writer::from_path(path, builder)
        .with_context(|| format!("failed to create {}", path.display()))?;
    if let Some(points) = points {
        for (shape, record) in points.iter().zip(&records) {
            writer.write_shape_and_record(shape, record)?;
        }
    } else if let Some(polygons) = polygons {
        for (shape, record) in polygons.iter().zip(&records) {
            writer.write_shape_and_record(shape, record)?;
        }
    }
    drop(writer);

    std::fs::write(path.with_extension("prj"), layer.crs().wkt())
        .with_context(|| format!("failed to write projection for {}", path.display()))?;
    info!(path = %path.display(), features = layer.len(), crs = %layer.crs(), "Shapefile written");
    Ok(())
}

fn field_value(value: &Value, dtype: DataType) -> FieldValue {
    match dtype {
        DataType::Int | DataType::Float => FieldValue::Numeric(value.as_f64()),
        DataType::Bool => FieldValue::Logical(match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }),
        DataType::Text | DataType::Date | DataType::Timestamp => {
            FieldValue::Character((!value.is_null()).then(|| value.to_string()))
        }
    }
}

fn to_shp_polygon(geometry: &Geometry<f64>) -> Option<shapefile::Polygon> {
    let polygons: Vec<&Polygon<f64>> = match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
        _ => return None,
    };
    let ring = |ls: &LineString<f64>| -> Vec<shapefile::Point> {
        ls.coords().map(|c| shapefile::Point::new(c.x, c.y)).collect()
    };
    let mut rings = Vec::new();
    for p in polygons {
        rings.push(PolygonRing::Outer(ring(p.exterior())));
        rings.extend(p.interiors().iter().map(|i| PolygonRing::Inner(ring(i))));
    }
    Some(shapefile::Polygon::with_rings(rings))
}

/// Reads a point or polygon shapefile with its attributes. The CRS comes
/// from the `.prj` sidecar, EPSG:4326 when it is missing or unknown.
pub fn read_shapefile(path: impl AsRef<Path>) -> Result<GeoTable> {
    let path = path.as_ref();
    let crs = match std::fs::read_to_string(path.with_extension("prj")) {
        Ok(wkt) => Crs::from_wkt(&wkt).unwrap_or_else(|| {
            warn!(path = %path.display(), "Unrecognised projection, assuming EPSG:4326");
            Crs::Wgs84
        }),
        Err(_) => {
            warn!(path = %path.display(), "No .prj sidecar, assuming EPSG:4326");
            Crs::Wgs84
        }
    };

    let names: Vec<String> = shapefile::dbase::Reader::from_path(path.with_extension("dbf"))
        .with_context(|| format!("failed to open attributes of {}", path.display()))?
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .filter(|n| n != "DeletionFlag")
        .collect();

    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    let mut geometries = Vec::new();
    let mut skipped = 0usize;
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item?;
        let Some(geometry) = from_shape(shape) else {
            skipped += 1;
            continue;
        };
        geometries.push(geometry);
        rows.push(names.iter().map(|n| from_field(record.get(n))).collect());
    }
    if skipped > 0 {
        debug!(skipped, "Unsupported or empty shapes skipped");
    }

    let attributes = Table::from_value_rows(names, rows)?;
    Ok(GeoTable::new(crs, attributes, geometries)?)
}

fn from_shape(shape: Shape) -> Option<Geometry<f64>> {
    match shape {
        Shape::Point(p) => Some(Geometry::Point(Point::new(p.x, p.y))),
        Shape::Polygon(polygon) => {
            let mut polygons: Vec<Polygon<f64>> = Vec::new();
            for ring in polygon.rings() {
                let coords: Vec<Coord<f64>> =
                    ring.points().iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                match ring {
                    PolygonRing::Outer(_) => polygons.push(Polygon::new(LineString(coords), vec![])),
                    PolygonRing::Inner(_) => {
                        if let Some(last) = polygons.last_mut() {
                            last.interiors_push(LineString(coords));
                        }
                    }
                }
            }
            match polygons.len() {
                0 => None,
                1 => polygons.pop().map(Geometry::Polygon),
                _ => Some(Geometry::MultiPolygon(MultiPolygon(polygons))),
            }
        }
        _ => None,
    }
}

fn from_field(value: Option<&FieldValue>) -> Value {
    match value {
        Some(FieldValue::Character(Some(s))) => {
            let s = s.trim();
            if s.is_empty() { Value::Null } else { Value::text(s) }
        }
        Some(FieldValue::Numeric(n)) => (*n).into(),
        Some(FieldValue::Float(f)) => f.map(f64::from).into(),
        Some(FieldValue::Integer(i)) => Value::Int(*i as i64),
        Some(FieldValue::Double(d)) => Value::float(*d),
        Some(FieldValue::Logical(b)) => (*b).into(),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::layer::points_from_table;
    use crate::spatial::sample_districts;
    use serde_json::json;

    #[test]
    fn test_dbf_field_names_truncate_and_dedupe() {
        let names = dbf_field_names(&["station_name", "station_names", "avg_delay", "district_id"]);
        assert_eq!(names, vec!["station_na", "station_n1", "avg_delay", "district_i"]);
        assert!(names.iter().all(|n| n.len() <= MAX_FIELD_NAME));
    }

    #[test]
    fn test_dbf_field_names_limit_bytes_not_chars() {
        let names = dbf_field_names(&["zpoždění_min", "zpoždění_max", "čas"]);
        assert_eq!(names, vec!["zpožděn", "zpožděn1", "čas"]);
        assert!(names.iter().all(|n| n.len() <= MAX_FIELD_NAME));
    }

    #[test]
    fn test_point_shapefile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.shp");
        let table = Table::from_json_rows(&[
            json!({"station_name": "Ostrava hl.n.", "latitude": 49.8465, "longitude": 18.2917, "avg_delay_minutes": 5.0}),
            json!({"station_name": "Celadna", "latitude": 49.5760, "longitude": 18.3615, "avg_delay_minutes": null}),
        ])
        .unwrap();
        let layer = points_from_table(&table, "latitude", "longitude", Crs::Wgs84).unwrap();

        write_shapefile(&layer, &path).unwrap();
        assert!(path.with_extension("shx").exists());
        assert!(path.with_extension("dbf").exists());
        assert!(path.with_extension("prj").exists());

        let back = read_shapefile(&path).unwrap();
        assert_eq!(back.crs(), Crs::Wgs84);
        assert_eq!(back.len(), 2);
        assert_eq!(
            back.attributes().column_names(),
            vec!["station_na", "latitude", "longitude", "avg_delay_"]
        );
        assert_eq!(back.attributes().value(1, "station_na"), Some(&Value::text("Celadna")));
        assert_eq!(back.attributes().value(1, "avg_delay_"), Some(&Value::Null));
        let Geometry::Point(p) = back.geometries()[0] else {
            panic!("expected a point");
        };
        assert!((p.x() - 18.2917).abs() < 1e-9);
        assert!((p.y() - 49.8465).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_shapefile_keeps_crs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("districts.shp");
        let layer = sample_districts().unwrap().reproject(Crs::Utm { zone: 34, north: true });

        write_shapefile(&layer, &path).unwrap();
        let back = read_shapefile(&path).unwrap();

        assert_eq!(back.crs(), Crs::Utm { zone: 34, north: true });
        assert_eq!(back.len(), 2);
        assert!(matches!(back.geometries()[0], Geometry::Polygon(_)));
        assert_eq!(back.attributes().value(1, "district"), Some(&Value::text("East")));
    }

    #[test]
    fn test_mixed_geometries_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.shp");
        let districts = sample_districts().unwrap();
        let mut geometries = districts.geometries().to_vec();
        geometries[0] = Geometry::Point(Point::new(18.2, 49.8));
        let layer = GeoTable::new(Crs::Wgs84, districts.attributes().clone(), geometries).unwrap();
        assert!(write_shapefile(&layer, &path).is_err());
    }
}
