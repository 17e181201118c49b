use geo::{Coord, Geometry, MapCoords, Point};
use tracing::{info, warn};

use super::crs::Crs;
use crate::error::{DataError, DataResult};
use crate::table::Table;

/// An attribute table with one geometry per row, tagged with its CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTable {
    crs: Crs,
    attributes: Table,
    geometries: Vec<Geometry<f64>>,
}

impl GeoTable {
    pub fn new(crs: Crs, attributes: Table, geometries: Vec<Geometry<f64>>) -> DataResult<Self> {
        if attributes.len() != geometries.len() {
            return Err(DataError::InvalidArgument(format!(
                "{} attribute rows but {} geometries",
                attributes.len(),
                geometries.len()
            )));
        }
        Ok(Self {
            crs,
            attributes,
            geometries,
        })
    }

    pub fn empty(crs: Crs) -> Self {
        Self {
            crs,
            attributes: Table::default(),
            geometries: Vec::new(),
        }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn attributes(&self) -> &Table {
        &self.attributes
    }

    pub fn geometries(&self) -> &[Geometry<f64>] {
        &self.geometries
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Copy of the layer with every coordinate transformed into `target`.
    pub fn reproject(&self, target: Crs) -> GeoTable {
        if self.crs == target {
            return self.clone();
        }
        let source = self.crs;
        let geometries = self
            .geometries
            .iter()
            .map(|g| {
                g.map_coords(move |c: Coord<f64>| {
                    let (x, y) = source.transform(target, c.x, c.y);
                    Coord { x, y }
                })
            })
            .collect();
        GeoTable {
            crs: target,
            attributes: self.attributes.clone(),
            geometries,
        }
    }
}

/// Builds a point layer from latitude/longitude columns.
///
/// Rows with a null coordinate are dropped and counted in the log. Each
/// point is `(x = lon, y = lat)` in `crs`.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn points_from_table(
    table: &Table,
    lat_column: &str,
    lon_column: &str,
    crs: Crs,
) -> DataResult<GeoTable> {
    let lats = table.floats(lat_column)?;
    let lons = table.floats(lon_column)?;

    let mut keep = Vec::with_capacity(table.len());
    let mut geometries = Vec::with_capacity(table.len());
    for (idx, (lat, lon)) in lats.into_iter().zip(lons).enumerate() {
        if let (Some(lat), Some(lon)) = (lat, lon) {
            keep.push(idx);
            geometries.push(Geometry::Point(Point::new(lon, lat)));
        }
    }

    let dropped = table.len() - keep.len();
    if dropped > 0 {
        warn!(dropped, "Rows without coordinates dropped from point layer");
    }
    info!(points = keep.len(), %crs, "Point layer built");
    GeoTable::new(crs, table.take_rows(&keep), geometries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stations() -> Table {
        Table::from_json_rows(&[
            json!({"station_name": "Ostrava hl.n.", "latitude": 49.8465, "longitude": 18.2917}),
            json!({"station_name": "Nowhere", "latitude": null, "longitude": 18.0}),
            json!({"station_name": "Celadna", "latitude": 49.5760, "longitude": 18.3615}),
        ])
        .unwrap()
    }

    #[test]
    fn test_points_from_table_drops_missing_coordinates() {
        let layer = points_from_table(&stations(), "latitude", "longitude", Crs::Wgs84).unwrap();
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.attributes().len(), 2);
        assert_eq!(layer.geometries()[0], Geometry::Point(Point::new(18.2917, 49.8465)));
        assert_eq!(layer.crs(), Crs::Wgs84);
    }

    #[test]
    fn test_points_from_table_missing_column() {
        assert_eq!(
            points_from_table(&stations(), "lat", "longitude", Crs::Wgs84),
            Err(DataError::MissingColumn("lat".to_string()))
        );
    }

    #[test]
    fn test_reproject_round_trip() {
        let layer = points_from_table(&stations(), "latitude", "longitude", Crs::Wgs84).unwrap();
        let projected = layer.reproject(Crs::WebMercator);
        assert_eq!(projected.crs(), Crs::WebMercator);
        let Geometry::Point(p) = projected.geometries()[0] else {
            panic!("expected a point");
        };
        assert!(p.x() > 2_000_000.0);

        let back = projected.reproject(Crs::Wgs84);
        let Geometry::Point(q) = back.geometries()[0] else {
            panic!("expected a point");
        };
        assert!((q.x() - 18.2917).abs() < 1e-9);
        assert!((q.y() - 49.8465).abs() < 1e-9);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        assert!(GeoTable::new(Crs::Wgs84, stations(), vec![]).is_err());
    }
}
