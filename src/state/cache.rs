use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::data::Review;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cannot create cache directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("cached review is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The ReviewCache keeps the last successfully fetched review list in SQLite.
///
/// It lets the app show something (and filter locally) before the first
/// fetch completes or while the store is unreachable. The list is only ever
/// replaced as a whole.
pub struct ReviewCache {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl ReviewCache {
    /// Open (or create) the cache database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, CacheError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        log::info!("📁 Review cache at: {}", db_path.display());

        let cache = ReviewCache {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// A throwaway cache, used when the on-disk one cannot be opened
    pub fn in_memory() -> Result<Self, CacheError> {
        let cache = ReviewCache {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<(), CacheError> {
        // One row per review, `seq` keeps the store's order
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS reviews (
                seq             INTEGER PRIMARY KEY,
                id              TEXT NOT NULL,
                review_json     TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Path of the database file, None for in-memory caches
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Replace the cached list with `reviews`
    pub fn replace_all(&mut self, reviews: &[Review]) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM reviews", [])?;

        {
            let mut stmt =
                tx.prepare("INSERT INTO reviews (seq, id, review_json) VALUES (?1, ?2, ?3)")?;
            for (seq, review) in reviews.iter().enumerate() {
                let json = serde_json::to_string(review)?;
                stmt.execute(params![seq as i64, &review.id, json])?;
            }
        }

        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('fetched_at', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        log::debug!("💾 Cached {} reviews", reviews.len());
        Ok(())
    }

    /// All cached reviews in the order they were fetched
    pub fn load_all(&self) -> Result<Vec<Review>, CacheError> {
        let mut stmt = self
            .conn
            .prepare("SELECT review_json FROM reviews ORDER BY seq ASC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut reviews = Vec::new();
        for json in rows {
            let json = json?;
            match serde_json::from_str::<Review>(&json) {
                Ok(review) => reviews.push(review),
                // An older layout or a corrupted row; the next fetch rewrites it
                Err(e) => log::warn!("⚠️  Skipping unreadable cached review: {}", e),
            }
        }

        Ok(reviews)
    }

    pub fn count(&self) -> Result<i64, CacheError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
        Ok(count)
    }

    /// When the cached list was last replaced
    pub fn fetched_at(&self) -> Result<Option<DateTime<Utc>>, CacheError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM meta WHERE key = 'fetched_at'")?;
        let mut rows = stmt.query([])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let value: String = row.get(0)?;
        Ok(DateTime::parse_from_rfc3339(&value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

impl std::fmt::Debug for ReviewCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewCache")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    #[test]
    fn test_empty_cache() {
        let cache = ReviewCache::in_memory().unwrap();
        assert_eq!(cache.count().unwrap(), 0);
        assert!(cache.load_all().unwrap().is_empty());
        assert!(cache.fetched_at().unwrap().is_none());
        assert!(cache.path().is_none());
    }

    #[test]
    fn test_replace_all_keeps_order() {
        let mut cache = ReviewCache::in_memory().unwrap();
        let reviews = vec![
            Review::at("b", Some(GeoPoint::new(16.8409, 96.1735).unwrap())),
            Review::at("a", None),
            Review::at("c", Some(GeoPoint::new(20.5592, 96.9132).unwrap().with_label("Inle Lake"))),
        ];

        cache.replace_all(&reviews).unwrap();

        assert_eq!(cache.load_all().unwrap(), reviews);
        assert_eq!(cache.count().unwrap(), 3);
        assert!(cache.fetched_at().unwrap().is_some());
    }

    #[test]
    fn test_replace_all_replaces_wholesale() {
        let mut cache = ReviewCache::in_memory().unwrap();
        cache
            .replace_all(&[Review::at("old-1", None), Review::at("old-2", None)])
            .unwrap();
        cache.replace_all(&[Review::at("new", None)]).unwrap();

        let ids: Vec<String> = cache.load_all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = std::env::temp_dir().join(format!("lan_pya_cache_test_{}", std::process::id()));
        let path = dir.join("reviews.db");

        {
            let mut cache = ReviewCache::open(&path).unwrap();
            cache.replace_all(&[Review::at("kept", None)]).unwrap();
        }

        let reopened = ReviewCache::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.load_all().unwrap()[0].id, "kept");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
