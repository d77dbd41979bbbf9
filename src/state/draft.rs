/// In-progress review being composed
///
/// The draft lives from "open compose" until a successful submit or a cancel.
/// A failed submit leaves it untouched so the user can retry.

use super::data::ImageAttachment;
use crate::error::ReviewError;
use crate::geo::GeoPoint;

/// Lowest and highest star rating the store accepts
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// All form fields plus the selected point
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    pub title: String,
    pub comment: String,
    /// 1..=5, starts at 5
    pub rating: u8,
    /// Free-form address; falls back to the point's label when blank
    pub address: String,
    /// Optional display name
    pub author_name: String,
    pub image: Option<ImageAttachment>,
    /// Set by the location selector
    pub point: Option<GeoPoint>,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            comment: String::new(),
            rating: 5,
            address: String::new(),
            author_name: String::new(),
            image: None,
            point: None,
        }
    }
}

impl ReviewDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check everything the store requires before anything is sent
    pub fn validate(&self) -> Result<&GeoPoint, ReviewError> {
        if self.title.trim().is_empty() {
            return Err(ReviewError::validation("Please add a title."));
        }
        if self.comment.trim().is_empty() {
            return Err(ReviewError::validation("Please write a comment."));
        }
        if !RATING_RANGE.contains(&self.rating) {
            return Err(ReviewError::validation("Rating must be between 1 and 5 stars."));
        }

        self.point
            .as_ref()
            .ok_or_else(|| ReviewError::validation("Please select a place on the map first."))
    }

    /// Address sent to the store: typed address, else the point label, else coordinates
    pub fn effective_address(&self) -> String {
        let typed = self.address.trim();
        if !typed.is_empty() {
            return typed.to_string();
        }

        match &self.point {
            Some(point) => point
                .label()
                .map(str::to_string)
                .unwrap_or_else(|| point.coordinates_text()),
            None => String::new(),
        }
    }

    /// Author name if one was typed
    pub fn author(&self) -> Option<String> {
        let name = self.author_name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Drop every field, including the selected point
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether the user has typed or attached anything yet
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
            && self.comment.trim().is_empty()
            && self.address.trim().is_empty()
            && self.author_name.trim().is_empty()
            && self.image.is_none()
    }
}
