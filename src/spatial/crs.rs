//! Coordinate reference systems and the transforms between them.
//!
//! Three families are supported, all on the WGS84 ellipsoid:
//! geographic lon/lat (EPSG:4326), spherical Web Mercator (EPSG:3857) and
//! Universal Transverse Mercator zones (EPSG:326zz north, 327zz south;
//! ETRS89 zones 258zz are read as WGS84 north zones).
//!
//! Every transform goes through lon/lat degrees.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_INV_F: f64 = 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
/// Web Mercator latitude limit.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

const GEOGCS_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Crs {
    #[default]
    Wgs84,
    WebMercator,
    Utm { zone: u8, north: bool },
}

impl Crs {
    pub fn utm(zone: u8, north: bool) -> Result<Self, DataError> {
        if !(1..=60).contains(&zone) {
            return Err(DataError::InvalidArgument(format!(
                "UTM zone must be 1-60, got {zone}"
            )));
        }
        Ok(Crs::Utm { zone, north })
    }

    /// UTM zone covering the given lon/lat.
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i64).rem_euclid(60) + 1;
        Crs::Utm {
            zone: zone as u8,
            north: lat >= 0.0,
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::Utm { zone, north: true } => 32600 + *zone as u32,
            Crs::Utm { zone, north: false } => 32700 + *zone as u32,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            3857 | 3785 | 900913 => Some(Crs::WebMercator),
            32601..=32660 => Some(Crs::Utm { zone: (code - 32600) as u8, north: true }),
            32701..=32760 => Some(Crs::Utm { zone: (code - 32700) as u8, north: false }),
            25801..=25860 => Some(Crs::Utm { zone: (code - 25800) as u8, north: true }),
            _ => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// ESRI WKT written to `.prj` sidecar files.
    pub fn wkt(&self) -> String {
        match self {
            Crs::Wgs84 => GEOGCS_WGS84.to_string(),
            Crs::WebMercator => format!(
                r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",{GEOGCS_WGS84},PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#
            ),
            Crs::Utm { zone, north } => {
                let hemisphere = if *north { 'N' } else { 'S' };
                let false_northing = if *north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
                format!(
                    r#"PROJCS["WGS_1984_UTM_Zone_{zone}{hemisphere}",{GEOGCS_WGS84},PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",{UTM_FALSE_EASTING:.1}],PARAMETER["False_Northing",{false_northing:.1}],PARAMETER["Central_Meridian",{:.1}],PARAMETER["Scale_Factor",{UTM_K0}],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#,
                    central_meridian(*zone)
                )
            }
        }
    }

    /// Recognises the WKT written by [`Crs::wkt`] and the common ESRI and
    /// OGC spellings of the same systems.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        let upper = wkt.to_ascii_uppercase();
        if let Some(pos) = upper.find("UTM_ZONE_").or_else(|| upper.find("UTM ZONE ")) {
            let rest = &upper[pos + 9..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let zone: u8 = digits.parse().ok()?;
            let north = rest[digits.len()..].chars().next() != Some('S');
            return Crs::utm(zone, north).ok();
        }
        if upper.contains("MERCATOR_AUXILIARY_SPHERE")
            || upper.contains("PSEUDO-MERCATOR")
            || upper.contains("POPULAR VISUALISATION")
        {
            return Some(Crs::WebMercator);
        }
        if upper.trim_start().starts_with("GEOGCS") && upper.contains("WGS") {
            return Some(Crs::Wgs84);
        }
        None
    }

    /// Converts lon/lat degrees into this system's x/y.
    pub fn from_lon_lat(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Crs::Wgs84 => (lon, lat),
            Crs::WebMercator => {
                let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
                let x = WGS84_A * lon.to_radians();
                let y = WGS84_A * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
            Crs::Utm { zone, north } => utm_forward(lon, lat, *zone, *north),
        }
    }

    /// Converts this system's x/y into lon/lat degrees.
    pub fn to_lon_lat(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Wgs84 => (x, y),
            Crs::WebMercator => {
                let lon = (x / WGS84_A).to_degrees();
                let lat = (2.0 * (y / WGS84_A).exp().atan() - PI / 2.0).to_degrees();
                (lon, lat)
            }
            Crs::Utm { zone, north } => utm_inverse(x, y, *zone, *north),
        }
    }

    pub fn transform(&self, target: Crs, x: f64, y: f64) -> (f64, f64) {
        if *self == target {
            return (x, y);
        }
        let (lon, lat) = self.to_lon_lat(x, y);
        target.from_lon_lat(lon, lat)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        code.parse::<u32>()
            .ok()
            .and_then(Crs::from_epsg)
            .ok_or_else(|| DataError::InvalidArgument(format!("unsupported CRS '{s}'")))
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

fn eccentricity_squared() -> f64 {
    let f = 1.0 / WGS84_INV_F;
    f * (2.0 - f)
}

fn utm_forward(lon: f64, lat: f64, zone: u8, north: bool) -> (f64, f64) {
    let a = WGS84_A;
    let e2 = eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);

    let phi = lat.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = phi.tan().powi(2);
    let c = ep2 * cos_phi * cos_phi;
    let big_a = cos_phi * (lon - central_meridian(zone)).to_radians();

    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e2.powi(2) / 32.0 + 45.0 * e2.powi(3) / 1024.0)
                * (2.0 * phi).sin()
            + (15.0 * e2.powi(2) / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e2.powi(3) / 3072.0) * (6.0 * phi).sin());

    let x = UTM_K0
        * n
        * (big_a
            + (1.0 - t + c) * big_a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;
    let mut y = UTM_K0
        * (m + n
            * phi.tan()
            * (big_a.powi(2) / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * big_a.powi(6) / 720.0));
    if !north {
        y += UTM_FALSE_NORTHING_SOUTH;
    }
    (x, y)
}

fn utm_inverse(x: f64, y: f64, zone: u8, north: bool) -> (f64, f64) {
    let a = WGS84_A;
    let e2 = eccentricity_squared();
    let ep2 = e2 / (1.0 - e2);

    let x = x - UTM_FALSE_EASTING;
    let y = if north { y } else { y - UTM_FALSE_NORTHING_SOUTH };

    let m = y / UTM_K0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let j1 = 3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0;
    let j2 = 21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0;
    let j3 = 151.0 * e1.powi(3) / 96.0;
    let j4 = 1097.0 * e1.powi(4) / 512.0;
    let fp = mu
        + j1 * (2.0 * mu).sin()
        + j2 * (4.0 * mu).sin()
        + j3 * (6.0 * mu).sin()
        + j4 * (8.0 * mu).sin();

    let (sin_fp, cos_fp) = fp.sin_cos();
    let c1 = ep2 * cos_fp * cos_fp;
    let t1 = fp.tan().powi(2);
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_fp * sin_fp).powf(1.5);
    let n1 = a / (1.0 - e2 * sin_fp * sin_fp).sqrt();
    let d = x / (n1 * UTM_K0);

    let lat = fp
        - (n1 * fp.tan() / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / cos_fp;

    (central_meridian(zone) + lon.to_degrees(), lat.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64), tol: f64) -> bool {
        (a.0 - b.0).abs() < tol && (a.1 - b.1).abs() < tol
    }

    #[test]
    fn test_web_mercator_known_values() {
        let (x, y) = Crs::WebMercator.from_lon_lat(180.0, 0.0);
        assert!((x - 20_037_508.342_789).abs() < 1e-3);
        assert!(y.abs() < 1e-6);
        let back = Crs::WebMercator.to_lon_lat(x, y);
        assert!(close(back, (180.0, 0.0), 1e-9));
    }

    #[test]
    fn test_utm_central_meridian_on_equator() {
        let (x, y) = Crs::Utm { zone: 33, north: true }.from_lon_lat(15.0, 0.0);
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_utm_round_trip_ostrava() {
        let utm = Crs::utm_for(18.2917, 49.8465);
        assert_eq!(utm, Crs::Utm { zone: 34, north: true });
        for crs in [utm, Crs::Utm { zone: 33, north: true }, Crs::WebMercator] {
            let (x, y) = crs.from_lon_lat(18.2917, 49.8465);
            let back = crs.to_lon_lat(x, y);
            assert!(close(back, (18.2917, 49.8465), 1e-6), "{crs}: {back:?}");
        }
    }

    #[test]
    fn test_utm_southern_hemisphere() {
        let crs = Crs::Utm { zone: 56, north: false };
        let (x, y) = crs.from_lon_lat(151.2093, -33.8688);
        assert!(y > 6_000_000.0 && y < 6_400_000.0);
        assert!(close(crs.to_lon_lat(x, y), (151.2093, -33.8688), 1e-6));
    }

    #[test]
    fn test_epsg_and_wkt_round_trip() {
        for crs in [
            Crs::Wgs84,
            Crs::WebMercator,
            Crs::Utm { zone: 33, north: true },
            Crs::Utm { zone: 19, north: false },
        ] {
            assert_eq!(Crs::from_epsg(crs.epsg()), Some(crs));
            assert_eq!(Crs::from_wkt(&crs.wkt()), Some(crs));
            assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        }
        assert_eq!(Crs::from_epsg(25833), Some(Crs::Utm { zone: 33, north: true }));
        assert!("EPSG:2065".parse::<Crs>().is_err());
        assert!(Crs::utm(61, true).is_err());
    }
}
