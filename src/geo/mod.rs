/// Geographic primitives
///
/// - Validated points (point.rs)
/// - Haversine distance and radius filtering (distance.rs)

pub mod point;
pub mod distance;

pub use distance::{filter_within_radius, haversine_km, DEFAULT_RADIUS_KM};
pub use point::{GeoError, GeoPoint};
