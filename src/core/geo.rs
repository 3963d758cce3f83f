use crate::models::{BoundingBox, Profile};

/// Earth's radius in statute miles. The whole core measures distance in
/// miles; preference defaults (50) and scoring decay (1 point per 5) assume
/// this unit.
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Miles per degree of latitude.
const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Calculate the great-circle (haversine) distance between two points.
///
/// # Arguments
/// * `lat1`, `lon1` - first point in degrees
/// * `lat2`, `lon2` - second point in degrees
///
/// # Returns
/// Distance in miles
#[inline]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Distance between two profiles in miles, or 0.0 when either side has no
/// coordinates. Callers that award points for proximity must check
/// `coordinates()` themselves; this 0.0 means "unknown", not "co-located".
#[inline]
pub fn distance_between(a: &Profile, b: &Profile) -> f64 {
    match (a.coordinates(), b.coordinates()) {
        (Some((lat1, lon1)), Some((lat2, lon2))) => haversine_miles(lat1, lon1, lat2, lon2),
        _ => 0.0,
    }
}

/// Calculate a bounding box around a center point.
///
/// Much cheaper than haversine, used only to pre-filter candidates before
/// exact scoring. 1 degree latitude is ~69 miles; 1 degree longitude shrinks
/// with the cosine of the latitude. Approximation error near the poles is
/// accepted.
pub fn bounding_box(lat: f64, lon: f64, radius_miles: f64) -> BoundingBox {
    let lat_delta = radius_miles / MILES_PER_DEGREE_LAT;
    let lon_delta = radius_miles / (MILES_PER_DEGREE_LAT * lat.to_radians().cos().abs().max(0.01));

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box.
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat && lat <= bbox.max_lat && lon >= bbox.min_lon && lon <= bbox.max_lon
}

/// Bucket coordinates onto a 0.1-degree grid (roughly neighborhood sized).
/// Used as the location key of the behavior vector.
#[inline]
pub fn location_bucket(lat: f64, lon: f64) -> String {
    format!("{:.1}:{:.1}", lat, lon)
}
