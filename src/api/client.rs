use reqwest::Url;
use std::sync::{Arc, RwLock};

use super::transport::ReviewTransport;
use super::wire::{reviews_from_records, NewReview};
use crate::error::ReviewError;
use crate::geo::{filter_within_radius, GeoPoint};
use crate::state::data::Review;
use crate::state::draft::ReviewDraft;
use crate::state::session::Session;

/// Where a proximity result came from
#[derive(Debug, Clone, PartialEq)]
pub enum NearSource {
    /// The store's own proximity query answered
    Server,
    /// The store failed; the last-known list was filtered locally
    LocalFallback(ReviewError),
}

/// Result of `ReviewClient::fetch_near`
#[derive(Debug, Clone, PartialEq)]
pub struct NearReviews {
    pub reviews: Vec<Review>,
    pub source: NearSource,
}

/// The only component that talks to the review store
///
/// Cheap to clone; clones share the transport and the last-known full list.
/// That list is swapped as a whole after a successful fetch or submit and is
/// what `fetch_near` falls back to.
#[derive(Clone)]
pub struct ReviewClient {
    transport: Arc<dyn ReviewTransport>,
    last_known: Arc<RwLock<Arc<Vec<Review>>>>,
    radius_km: f64,
}

impl ReviewClient {
    pub fn new(transport: Arc<dyn ReviewTransport>, radius_km: f64) -> Self {
        Self {
            transport,
            last_known: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            radius_km,
        }
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Seed the fallback list, e.g. from the local cache at start-up
    pub fn remember(&self, reviews: Vec<Review>) {
        self.replace_last_known(Arc::new(reviews));
    }

    /// Snapshot of the last successfully fetched full list
    pub fn last_known(&self) -> Arc<Vec<Review>> {
        match self.last_known.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn replace_last_known(&self, reviews: Arc<Vec<Review>>) {
        match self.last_known.write() {
            Ok(mut guard) => *guard = reviews,
            Err(poisoned) => *poisoned.into_inner() = reviews,
        }
    }

    /// Fetch every review, in the store's order
    pub async fn fetch_all(&self) -> Result<Vec<Review>, ReviewError> {
        let records = self.transport.list_reviews(None).await.map_err(|e| {
            log::warn!("⚠️  Fetching reviews failed: {}", e);
            e
        })?;

        let reviews = reviews_from_records(records);
        log::info!("📥 Fetched {} reviews", reviews.len());

        self.replace_last_known(Arc::new(reviews.clone()));
        Ok(reviews)
    }

    /// Reviews near `point`; never fails
    ///
    /// Asks the store first. If that fails, filters the last-known full list
    /// with the configured radius instead.
    pub async fn fetch_near(&self, point: &GeoPoint) -> NearReviews {
        match self.transport.list_reviews(Some(point)).await {
            Ok(records) => {
                let reviews = reviews_from_records(records);
                log::info!("📍 {} reviews near {}", reviews.len(), point);
                NearReviews {
                    reviews,
                    source: NearSource::Server,
                }
            }
            Err(err) => {
                let reviews = filter_within_radius(point, &self.last_known(), self.radius_km);
                log::warn!(
                    "⚠️  Proximity query failed ({}); {} reviews matched locally",
                    err,
                    reviews.len()
                );
                NearReviews {
                    reviews,
                    source: NearSource::LocalFallback(err),
                }
            }
        }
    }

    /// Post a new review
    ///
    /// Validation failures return before anything is sent. The draft is only
    /// read; clearing it after success is the caller's call.
    pub async fn submit(&self, draft: &ReviewDraft, session: &Session) -> Result<Review, ReviewError> {
        let point = draft.validate()?;

        let new_review = NewReview {
            title: draft.title.trim().to_string(),
            comment: draft.comment.trim().to_string(),
            rating: draft.rating,
            latitude: point.latitude(),
            longitude: point.longitude(),
            address: draft.effective_address(),
            user_id: session.user_id,
            image: draft.image.clone(),
        };

        let mut record = self.transport.create_review(new_review).await.map_err(|e| {
            log::warn!("⚠️  Submitting review failed: {}", e);
            e
        })?;
        record.fill_from_draft(draft);

        let review = record.into_review().ok_or_else(|| ReviewError::Server {
            status: 200,
            message: "The review service did not return an id for the new review".to_string(),
        })?;

        let mut updated = self.last_known().as_ref().clone();
        updated.push(review.clone());
        self.replace_last_known(Arc::new(updated));

        log::info!("✅ Posted review {} \"{}\"", review.id, review.title);
        Ok(review)
    }
}

impl ReviewClient {
    /// Download a review photo for display
    pub async fn fetch_photo(&self, url: &Url) -> Result<Vec<u8>, ReviewError> {
        let bytes = self.transport.fetch_image(url).await.map_err(|e| {
            log::warn!("⚠️  Fetching photo {} failed: {}", url, e);
            e
        })?;
        log::debug!("🖼️  Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

impl std::fmt::Debug for ReviewClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewClient")
            .field("radius_km", &self.radius_km)
            .field("last_known", &self.last_known().len())
            .finish()
    }
}
