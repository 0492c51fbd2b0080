//! Geodesic distance against configured reference points, on the
//! WGS-84 ellipsoid (Karney's algorithm as implemented by
//! GeographicLib). Pure computation, no state beyond the shared
//! ellipsoid model.

use geographiclib_rs::{Geodesic, InverseGeodesic};
use kstring::KString;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::table::{DistanceColumn, JoinedTable};

lazy_static! {
    static ref WGS84: Geodesic = Geodesic::wgs84();
}

/// A fixed configured coordinate (an access point or the mesh
/// center) that distance columns are computed against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferencePoint {
    pub lat: f64,
    pub lon: f64,
}

/// Distance in meters between two (lat, lon) coordinates.
pub fn geodesic_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let s12: f64 = WGS84.inverse(lat1, lon1, lat2, lon2);
    s12
}

/// Append a named distance column: for every row, the distance from
/// the row's coordinate to `reference`.
pub fn append_distance_column(table: &mut JoinedTable, name: KString, reference: &ReferencePoint) {
    let values = table
        .rows
        .iter()
        .map(|row| geodesic_distance_m(row.lat, row.lon, reference.lat, reference.lon))
        .collect();
    table.distances.push(DistanceColumn { name, values });
}
