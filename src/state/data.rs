/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the review client, the local cache, and the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// A confirmed review as the store returned it
///
/// Read-only on this side: it is replaced, never edited.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Review {
    /// Store-assigned identifier (opaque)
    pub id: String,
    pub title: String,
    pub comment: String,
    /// 1..=5 stars
    pub rating: u8,
    /// None when the store sent missing or unusable coordinates
    pub position: Option<GeoPoint>,
    pub address: Option<String>,
    pub author_name: Option<String>,
    /// Absolute URL or store-relative path of the attached photo
    pub image_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Star string for list display, e.g. "★★★☆☆"
    pub fn stars(&self) -> String {
        let filled = self.rating.min(5) as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }

    #[cfg(test)]
    pub fn at(id: &str, position: Option<GeoPoint>) -> Self {
        Review {
            id: id.to_string(),
            title: format!("Review {}", id),
            comment: "Nice place".to_string(),
            rating: 4,
            position,
            address: None,
            author_name: None,
            image_ref: None,
            created_at: None,
        }
    }
}

/// A photo picked for upload, already read into memory
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub file_name: String,
    /// MIME type sent with the multipart part (e.g. "image/jpeg")
    pub mime: String,
    pub bytes: Vec<u8>,
}
