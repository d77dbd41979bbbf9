/// JSON shapes exchanged with the review store
///
/// The store is loose about types: ids come as numbers or strings, the list
/// endpoint names the title `place_name`, and coordinates may be missing.
/// Decoding is lenient here so one odd record never fails a whole list.
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::geo::GeoPoint;
use crate::state::data::{ImageAttachment, Review};
use crate::state::draft::ReviewDraft;

/// One review as the store sends it
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ReviewRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub review_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub place_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<u8>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ReviewRecord {
    /// Fill in what the create endpoint does not echo back (comment, rating, ...)
    pub fn fill_from_draft(&mut self, draft: &ReviewDraft) {
        if self.title.is_none() && self.place_name.is_none() {
            self.title = Some(draft.title.trim().to_string());
        }
        if self.comment.is_none() {
            self.comment = Some(draft.comment.trim().to_string());
        }
        if self.rating.is_none() {
            self.rating = Some(draft.rating);
        }
        if let Some(point) = &draft.point {
            if self.latitude.is_none() || self.longitude.is_none() {
                self.latitude = Some(point.latitude());
                self.longitude = Some(point.longitude());
            }
        }
        if self.address.is_none() {
            self.address = Some(draft.effective_address());
        }
        if let Some(author) = draft.author() {
            // The store answers with a placeholder name on create
            if self.user_name.as_deref().map_or(true, |name| name == "User") {
                self.user_name = Some(author);
            }
        }
    }

    /// Convert into the domain type; None when the record has no id at all
    pub fn into_review(self) -> Option<Review> {
        let id = self.id.or(self.review_id)?;
        let position = GeoPoint::from_parts(self.latitude, self.longitude);

        Some(Review {
            id,
            title: self.title.or(self.place_name).unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
            rating: self.rating.unwrap_or(0),
            position,
            address: self.address.filter(|a| !a.trim().is_empty()),
            author_name: self.user_name.filter(|n| !n.trim().is_empty()),
            image_ref: self.image_path.filter(|p| !p.trim().is_empty()),
            created_at: self.created_at,
        })
    }
}

/// Decode a list, dropping records the client cannot identify
pub fn reviews_from_records(records: Vec<ReviewRecord>) -> Vec<Review> {
    let total = records.len();
    let reviews: Vec<Review> = records
        .into_iter()
        .filter_map(ReviewRecord::into_review)
        .collect();

    if reviews.len() < total {
        log::warn!("⚠️  Dropped {} review records without an id", total - reviews.len());
    }
    reviews
}

/// Decode a list body record by record
///
/// The body must be a JSON array; elements that are not review objects are
/// skipped with a warning instead of failing the whole list.
pub fn decode_records(body: &[u8]) -> Result<Vec<ReviewRecord>, serde_json::Error> {
    let items: Vec<Value> = serde_json::from_slice(body)?;
    let total = items.len();
    let records: Vec<ReviewRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if records.len() < total {
        log::warn!("⚠️  Skipped {} unreadable review records", total - records.len());
    }
    Ok(records)
}

/// A validated review ready to post
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub title: String,
    pub comment: String,
    pub rating: u8,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub user_id: i64,
    pub image: Option<ImageAttachment>,
}

impl NewReview {
    /// Text fields of the multipart form, in the order the store documents them
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("title", self.title.clone()),
            ("comment", self.comment.clone()),
            ("rating", self.rating.to_string()),
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("address", self.address.clone()),
            ("user_id", self.user_id.to_string()),
        ]
    }
}

/// Pull a human-readable message out of an error body
///
/// Handles `{"detail": "..."}` and validation errors shaped like
/// `{"detail": [{"msg": "..."}, ...]}`.
pub fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

/// Resolve an `image_path` against the store's origin
///
/// Absolute http(s) URLs are returned as-is; relative paths are joined onto
/// scheme + host + port of `base`.
pub fn resolve_image_url(base: &Url, image_path: &str) -> Option<Url> {
    let image_path = image_path.trim();
    if image_path.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(image_path) {
        return matches!(url.scheme(), "http" | "https").then_some(url);
    }

    let mut origin = base.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin.join(image_path.trim_start_matches('/')).ok()
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 5.0) as u8))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

/// RFC 3339, or a naive timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_list_record() {
        let json = r#"{
            "review_id": 12, "user_id": 3, "place_id": 4, "rating": 4,
            "comment": "Sunset from the temple", "image_path": "uploads/3_1700000000.jpg",
            "created_at": "2024-11-02T17:45:10.123456",
            "user_name": "thiri", "place_name": "Shwesandaw", "address": "Bagan",
            "latitude": 21.1622, "longitude": 94.8766
        }"#;
        let record: ReviewRecord = serde_json::from_str(json).unwrap();
        let review = record.into_review().unwrap();

        assert_eq!(review.id, "12");
        assert_eq!(review.title, "Shwesandaw");
        assert_eq!(review.rating, 4);
        assert_eq!(review.author_name.as_deref(), Some("thiri"));
        assert_eq!(review.image_ref.as_deref(), Some("uploads/3_1700000000.jpg"));
        let position = review.position.unwrap();
        assert_eq!(position.latitude(), 21.1622);
        let created = review.created_at.unwrap();
        assert_eq!((created.year(), created.hour()), (2024, 17));
    }

    #[test]
    fn test_decode_create_response() {
        let json = r#"{
            "message": "Review added successfully", "review_id": 31, "id": 31,
            "title": "Great spot", "user_name": "User", "address": "Bangkok",
            "latitude": 13.7563, "longitude": 100.5018, "image_path": null,
            "created_at": "2025-01-05T08:00:00+07:00"
        }"#;
        let mut record: ReviewRecord = serde_json::from_str(json).unwrap();
        let draft = ReviewDraft {
            title: "Great spot".to_string(),
            comment: "Loved it".to_string(),
            rating: 5,
            author_name: "Mya".to_string(),
            point: Some(GeoPoint::new(13.7563, 100.5018).unwrap()),
            ..ReviewDraft::default()
        };
        record.fill_from_draft(&draft);
        let review = record.into_review().unwrap();

        assert_eq!(review.id, "31");
        assert_eq!(review.comment, "Loved it");
        assert_eq!(review.rating, 5);
        assert_eq!(review.author_name.as_deref(), Some("Mya"));
        assert_eq!(review.address.as_deref(), Some("Bangkok"));
        assert!(review.image_ref.is_none());
        assert_eq!(review.created_at.unwrap().hour(), 1);
    }

    #[test]
    fn test_bad_coordinates_decode_as_missing() {
        let json = r#"[
            {"id": "a", "latitude": "16.84", "longitude": "96.17"},
            {"id": "b", "latitude": "north", "longitude": 96.17},
            {"id": "c", "longitude": 96.17},
            {"id": "d", "latitude": 123.0, "longitude": 96.17},
            {"id": "e", "latitude": null, "longitude": null}
        ]"#;
        let records: Vec<ReviewRecord> = serde_json::from_str(json).unwrap();
        let reviews = reviews_from_records(records);

        assert_eq!(reviews.len(), 5);
        assert!(reviews[0].position.is_some());
        assert!(reviews[1..].iter().all(|r| r.position.is_none()));
    }

    #[test]
    fn test_odd_records_do_not_fail_the_list() {
        let body = br#"[
            null,
            {"id": 1, "title": 42, "comment": ["x"], "user_name": true},
            "not a record",
            {"id": 2, "place_name": "Inle Lake"}
        ]"#;
        let reviews = reviews_from_records(decode_records(body).unwrap());

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].title, "42");
        assert_eq!(reviews[0].comment, "");
        assert_eq!(reviews[0].author_name.as_deref(), Some("true"));
        assert_eq!(reviews[1].title, "Inle Lake");
    }

    #[test]
    fn test_non_array_body_is_an_error() {
        assert!(decode_records(b"<html>oops</html>").is_err());
        assert!(decode_records(br#"{"detail": "x"}"#).is_err());
    }

    #[test]
    fn test_records_without_id_are_dropped() {
        let records: Vec<ReviewRecord> =
            serde_json::from_str(r#"[{"title": "ghost"}, {"id": 1, "title": "real"}]"#).unwrap();
        let reviews = reviews_from_records(records);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].title, "real");
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert!(parse_timestamp("2025-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2025-03-01T10:00:00").is_some());
        assert!(parse_timestamp("2025-03-01 10:00:00.5").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(
            error_detail(r#"{"detail": "Error adding review: boom"}"#).as_deref(),
            Some("Error adding review: boom")
        );
        assert_eq!(
            error_detail(r#"{"detail": [{"loc": ["body", "title"], "msg": "field required"}]}"#)
                .as_deref(),
            Some("field required")
        );
        assert_eq!(error_detail(r#"{"error": "x"}"#), None);
        assert_eq!(error_detail("<html>502</html>"), None);
    }

    #[test]
    fn test_form_fields() {
        let review = NewReview {
            title: "Great spot".to_string(),
            comment: "Loved it".to_string(),
            rating: 5,
            latitude: 13.7563,
            longitude: 100.5018,
            address: "Bangkok".to_string(),
            user_id: 9,
            image: None,
        };
        let fields = review.form_fields();
        let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["title", "comment", "rating", "latitude", "longitude", "address", "user_id"]
        );
        assert_eq!(fields[3].1, "13.7563");
        assert_eq!(fields[6].1, "9");
    }

    #[test]
    fn test_resolve_image_url() {
        let base = Url::parse("http://localhost:8000/api").unwrap();

        assert_eq!(
            resolve_image_url(&base, "uploads/1_17.jpg").unwrap().as_str(),
            "http://localhost:8000/uploads/1_17.jpg"
        );
        assert_eq!(
            resolve_image_url(&base, "/uploads/1_17.jpg").unwrap().as_str(),
            "http://localhost:8000/uploads/1_17.jpg"
        );
        assert_eq!(
            resolve_image_url(&base, "https://cdn.example.com/a.jpg").unwrap().as_str(),
            "https://cdn.example.com/a.jpg"
        );
        assert!(resolve_image_url(&base, "  ").is_none());
    }
}
