/// Great-circle distance and radius filtering
use super::GeoPoint;
use crate::state::data::Review;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius used when the configuration does not override it
pub const DEFAULT_RADIUS_KM: f64 = 1.0;

/// Haversine distance between two points in kilometers
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Keep the reviews within `radius_km` of `center`, in their original order
///
/// Reviews without a usable position never match.
pub fn filter_within_radius(center: &GeoPoint, reviews: &[Review], radius_km: f64) -> Vec<Review> {
    reviews
        .iter()
        .filter(|review| match &review.position {
            Some(position) => haversine_km(center, position) <= radius_km,
            None => false,
        })
        .cloned()
        .collect()
}
