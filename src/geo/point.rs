use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected coordinates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinates must be finite numbers")]
    NotFinite,
}

/// A latitude/longitude pair, optionally labeled
///
/// Always in range: construction and deserialization both go through `GeoPoint::new`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
    label: Option<String>,
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
    label: Option<String>,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        let mut point = GeoPoint::new(raw.latitude, raw.longitude)?;
        point.label = raw.label;
        Ok(point)
    }
}

impl GeoPoint {
    /// Create a point, validating both coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeoError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
            label: None,
        })
    }

    /// Build from possibly-missing coordinates; `None` if either is absent or invalid
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?).ok()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// "16.84090, 96.17350" style display used when no label is available
    pub fn coordinates_text(&self) -> String {
        format!("{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({})", label, self.coordinates_text()),
            None => f.write_str(&self.coordinates_text()),
        }
    }
}
