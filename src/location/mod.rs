/// Location selection
///
/// The rest of the app only sees `LocationSelector`: one user selection in,
/// one validated `GeoPoint` out. The desktop build pairs a place catalog for
/// search with the map pad for clicks.
///
/// - Built-in destinations (catalog.rs)
/// - Map pad projection, zoom and pan (viewport.rs)

pub mod catalog;
pub mod viewport;

pub use catalog::{Place, DESTINATIONS};
pub use viewport::Viewport;

use crate::geo::{GeoError, GeoPoint};

/// Label given to points picked by clicking, which have no name of their own
pub const CLICKED_LABEL: &str = "Selected location";

/// A single user selection
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    /// Click on the map pad
    Click { latitude: f64, longitude: f64 },
    /// A search result was chosen
    Search(Place),
}

/// Capability that turns user selections into points
pub trait LocationSelector {
    /// Places matching `query`, best matches first
    fn search(&self, query: &str) -> Vec<Place>;

    /// Exactly one point per event; invalid coordinates are rejected, never emitted
    fn select(&self, event: SelectionEvent) -> Result<GeoPoint, GeoError>;
}

/// Desktop selector backed by a fixed place catalog
#[derive(Debug, Clone)]
pub struct CatalogSelector {
    places: Vec<Place>,
}

impl Default for CatalogSelector {
    fn default() -> Self {
        Self::new(DESTINATIONS.iter().map(Place::from_entry).collect())
    }
}

impl CatalogSelector {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }
}

impl LocationSelector for CatalogSelector {
    fn search(&self, query: &str) -> Vec<Place> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        // Prefix matches first, then anything containing the query
        let (mut prefix, mut contains): (Vec<&Place>, Vec<&Place>) = self
            .places
            .iter()
            .filter(|place| place.name.to_lowercase().contains(&query))
            .partition(|place| place.name.to_lowercase().starts_with(&query));

        prefix.append(&mut contains);
        prefix.into_iter().cloned().collect()
    }

    fn select(&self, event: SelectionEvent) -> Result<GeoPoint, GeoError> {
        match event {
            SelectionEvent::Click { latitude, longitude } => {
                Ok(GeoPoint::new(latitude, longitude)?.with_label(CLICKED_LABEL))
            }
            SelectionEvent::Search(place) => {
                Ok(GeoPoint::new(place.latitude, place.longitude)?.with_label(place.name))
            }
        }
    }
}
