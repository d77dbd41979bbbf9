use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::geo::DEFAULT_RADIUS_KM;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid API URL {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("request timeout must be greater than 0")]
    ZeroTimeout,
    #[error("search radius must be a positive number of kilometers, got {0}")]
    InvalidRadius(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base of the review store; photo paths resolve against its origin
    pub base_url: String,
    /// Review collection, relative to `base_url`
    pub reviews_path: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Radius used when filtering locally
    pub radius_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// SQLite file holding the last fetched list
    pub cache_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionConfig {
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api".to_string(),
                reviews_path: "reviews/".to_string(),
                request_timeout_secs: 15,
            },
            search: SearchConfig {
                radius_km: DEFAULT_RADIUS_KM,
            },
            storage: StorageConfig {
                cache_path: default_cache_path(),
            },
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source on top of the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("LAN_PYA_API_URL") {
            let v = v.trim().trim_end_matches('/');
            if !v.is_empty() {
                cfg.api.base_url = v.to_string();
            }
        }
        if let Some(v) = lookup("LAN_PYA_REVIEWS_PATH") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.api.reviews_path = v.to_string();
            }
        }
        if let Some(value) = lookup("LAN_PYA_REQUEST_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            cfg.api.request_timeout_secs = value;
        }
        if let Some(value) = lookup("LAN_PYA_RADIUS_KM").and_then(|v| parse_f64(&v)) {
            cfg.search.radius_km = value;
        }
        if let Some(v) = lookup("LAN_PYA_CACHE_PATH") {
            if !v.trim().is_empty() {
                cfg.storage.cache_path = Some(PathBuf::from(v.trim()));
            }
        }
        if let Some(value) = lookup("LAN_PYA_USER_ID").and_then(|v| parse_i64(&v)) {
            cfg.session.user_id = Some(value);
        }
        if let Some(v) = lookup("LAN_PYA_USERNAME") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.session.username = Some(v.to_string());
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match reqwest::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::InvalidApiUrl {
                    url: self.api.base_url.clone(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidApiUrl {
                    url: self.api.base_url.clone(),
                    reason: e.to_string(),
                })
            }
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(self.search.radius_km.is_finite() && self.search.radius_km > 0.0) {
            return Err(ConfigError::InvalidRadius(self.search.radius_km));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}

/// <data dir>/lan-pya/reviews.db, falling back to the home directory
fn default_cache_path() -> Option<PathBuf> {
    let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
    path.push("lan-pya");
    path.push("reviews.db");
    Some(path)
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_i64(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::from_lookup(|_| None);
        assert_eq!(cfg.api.base_url, "http://localhost:8000/api");
        assert_eq!(cfg.api.reviews_path, "reviews/");
        assert_eq!(cfg.search.radius_km, 1.0);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(15));
        assert!(cfg.session.user_id.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("LAN_PYA_API_URL", "https://reviews.example.com/api/"),
            ("LAN_PYA_REVIEWS_PATH", "v2/reviews"),
            ("LAN_PYA_REQUEST_TIMEOUT_SECS", " 30 "),
            ("LAN_PYA_RADIUS_KM", "2.5"),
            ("LAN_PYA_CACHE_PATH", "/tmp/lan-pya.db"),
            ("LAN_PYA_USER_ID", "42"),
            ("LAN_PYA_USERNAME", "aung"),
        ]));

        assert_eq!(cfg.api.base_url, "https://reviews.example.com/api");
        assert_eq!(cfg.api.reviews_path, "v2/reviews");
        assert_eq!(cfg.api.request_timeout_secs, 30);
        assert_eq!(cfg.search.radius_km, 2.5);
        assert_eq!(cfg.storage.cache_path, Some(PathBuf::from("/tmp/lan-pya.db")));
        assert_eq!(cfg.session.user_id, Some(42));
        assert_eq!(cfg.session.username.as_deref(), Some("aung"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("LAN_PYA_REQUEST_TIMEOUT_SECS", "soon"),
            ("LAN_PYA_USER_ID", "me"),
        ]));
        assert_eq!(cfg.api.request_timeout_secs, 15);
        assert!(cfg.session.user_id.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = AppConfig::from_lookup(|_| None);
        cfg.api.request_timeout_secs = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTimeout));

        let mut cfg = AppConfig::from_lookup(|_| None);
        cfg.search.radius_km = -1.0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidRadius(-1.0)));

        let mut cfg = AppConfig::from_lookup(|_| None);
        cfg.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidApiUrl { .. })));

        let mut cfg = AppConfig::from_lookup(|_| None);
        cfg.api.base_url = "not a url".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidApiUrl { .. })));
    }
}
