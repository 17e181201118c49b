use anyhow::{Context, Result, bail};
use geo::Geometry;
use geojson::{Feature, FeatureCollection, GeoJson};
use std::path::Path;
use tracing::{info, warn};

use super::crs::Crs;
use super::layer::GeoTable;
use crate::output::ensure_parent;
use crate::table::Table;

/// Encodes the layer as a GeoJSON FeatureCollection in EPSG:4326.
pub fn to_geojson(layer: &GeoTable) -> GeoJson {
    let layer = layer.reproject(Crs::Wgs84);
    let features: Vec<Feature> = layer
        .attributes()
        .to_json_rows()
        .into_iter()
        .zip(layer.geometries())
        .map(|(props, geometry)| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        })
        .collect();
    GeoJson::from(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Writes the layer as a GeoJSON FeatureCollection in EPSG:4326.
pub fn write_geojson(layer: &GeoTable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    std::fs::write(path, to_geojson(layer).to_string())
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), features = layer.len(), "GeoJSON written");
    Ok(())
}

/// Reads a GeoJSON FeatureCollection. Coordinates are taken as EPSG:4326;
/// features without a geometry are skipped.
pub fn read_geojson(path: impl AsRef<Path>) -> Result<GeoTable> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let gj: GeoJson = text
        .parse()
        .with_context(|| format!("invalid GeoJSON in {}", path.display()))?;
    let fc = match gj {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => bail!("{} holds a bare geometry, expected features", path.display()),
    };

    let mut properties = Vec::with_capacity(fc.features.len());
    let mut geometries = Vec::with_capacity(fc.features.len());
    let mut skipped = 0usize;
    for feature in fc.features {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry = Geometry::<f64>::try_from(geometry)
            .with_context(|| format!("unsupported geometry in {}", path.display()))?;
        geometries.push(geometry);
        properties.push(serde_json::Value::Object(feature.properties.unwrap_or_default()));
    }
    if skipped > 0 {
        warn!(skipped, path = %path.display(), "Features without geometry skipped");
    }

    let attributes = Table::from_json_rows(&properties)?;
    Ok(GeoTable::new(Crs::Wgs84, attributes, geometries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::layer::points_from_table;
    use crate::spatial::sample_districts;
    use crate::table::Value;
    use serde_json::json;

    fn utm_stations() -> GeoTable {
        let table = Table::from_json_rows(&[
            json!({"station_name": "Ostrava hl.n.", "lat": 49.8465, "lon": 18.2917, "avg_delay": 5.0}),
            json!({"station_name": "Celadna", "lat": 49.5760, "lon": 18.3615, "avg_delay": 2.5}),
        ])
        .unwrap();
        points_from_table(&table, "lat", "lon", Crs::Wgs84)
            .unwrap()
            .reproject(Crs::Utm { zone: 34, north: true })
    }

    #[test]
    fn test_geojson_round_trip_in_wgs84() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.geojson");
        let layer = utm_stations();

        write_geojson(&layer, &path).unwrap();
        let back = read_geojson(&path).unwrap();

        assert_eq!(back.crs(), Crs::Wgs84);
        assert_eq!(back.len(), 2);
        assert_eq!(back.attributes().value(1, "station_name"), Some(&Value::text("Celadna")));
        assert_eq!(back.attributes().value(0, "avg_delay"), Some(&Value::Float(5.0)));

        let expected = layer.reproject(Crs::Wgs84);
        for (a, b) in back.geometries().iter().zip(expected.geometries()) {
            let (Geometry::Point(a), Geometry::Point(b)) = (a, b) else {
                panic!("expected points");
            };
            assert!((a.x() - b.x()).abs() < 1e-9);
            assert!((a.y() - b.y()).abs() < 1e-9);
        }
        let Geometry::Point(first) = back.geometries()[0] else {
            panic!("expected a point");
        };
        assert!((first.x() - 18.2917).abs() < 1e-6);
        assert!((first.y() - 49.8465).abs() < 1e-6);
    }

    #[test]
    fn test_polygons_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("districts.geojson");
        write_geojson(&sample_districts().unwrap(), &path).unwrap();

        let back = read_geojson(&path).unwrap();
        assert_eq!(back.geometries(), sample_districts().unwrap().geometries());
    }

    #[test]
    fn test_read_geojson_skips_null_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.geojson");
        std::fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "geometry": null, "properties": {"a": 1}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [18.0, 49.0]}, "properties": {"a": 2}}
            ]}"#,
        )
        .unwrap();
        let layer = read_geojson(&path).unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.attributes().value(0, "a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_read_geojson_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.geojson");
        std::fs::write(&path, "not geojson").unwrap();
        assert!(read_geojson(&path).is_err());
    }
}
