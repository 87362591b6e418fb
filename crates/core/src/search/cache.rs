//! Manual-search result cache.
//!
//! Results found by manual searches are written here instead of being
//! snatched; the pick-and-snatch API later materializes one row back into
//! a result. One table per provider, aggregated at query time with a
//! UNION ALL across every provider table.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tracing::debug;

use crate::quality::Quality;
use crate::tv::ShowId;

use super::{DownloadLocator, SearchResult};

/// Error type for cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cached result not found: {provider} rowid {rowid}")]
    NotFound { provider: String, rowid: i64 },
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        CacheError::Database(e.to_string())
    }
}

/// A cached row plus the handle needed to snatch it later.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub provider: String,
    pub rowid: i64,
    pub result: SearchResult,
}

/// SQLite-backed provider result cache.
pub struct ResultCache {
    conn: Mutex<Connection>,
    /// Rows kept per provider table; oldest pruned past this.
    max_rows_per_provider: usize,
}

const DEFAULT_MAX_ROWS: usize = 500;

impl ResultCache {
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_rows_per_provider: DEFAULT_MAX_ROWS,
        })
    }

    /// In-memory cache, for tests.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_rows_per_provider: DEFAULT_MAX_ROWS,
        })
    }

    fn table_name(provider: &str) -> String {
        let sanitized: String = provider
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("results_{}", sanitized.to_lowercase())
    }

    fn ensure_table(conn: &Connection, table: &str) -> Result<(), CacheError> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                fingerprint TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                locator TEXT NOT NULL,
                locator_kind TEXT NOT NULL,
                show INTEGER NOT NULL,
                season INTEGER NOT NULL,
                episodes TEXT NOT NULL,
                quality INTEGER NOT NULL,
                seeders INTEGER NOT NULL,
                leechers INTEGER NOT NULL,
                size INTEGER NOT NULL,
                proper_tags TEXT NOT NULL,
                pubdate TEXT,
                release_group TEXT,
                added TEXT NOT NULL
            );
            "#
        ))?;
        Ok(())
    }

    fn provider_tables(conn: &Connection) -> Result<Vec<String>, CacheError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'results_%'",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Store one provider's results, replacing rows with the same
    /// fingerprint and pruning the oldest rows past the per-table cap.
    pub fn put(&self, provider: &str, results: &[SearchResult]) -> Result<(), CacheError> {
        if results.is_empty() {
            return Ok(());
        }

        let conn = self.conn.lock().unwrap();
        let table = Self::table_name(provider);
        Self::ensure_table(&conn, &table)?;

        for result in results {
            let fingerprint = format!(
                "{:x}",
                md5::compute(format!("{}{}", result.title, result.locator.as_str()))
            );
            let (kind, locator) = match &result.locator {
                DownloadLocator::Url(u) => ("url", u.as_str()),
                DownloadLocator::Magnet(m) => ("magnet", m.as_str()),
            };

            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO {table} (fingerprint, name, locator, locator_kind, show, season, episodes, quality, seeders, leechers, size, proper_tags, pubdate, release_group, added) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                ),
                rusqlite::params![
                    fingerprint,
                    result.title,
                    locator,
                    kind,
                    result.show.0,
                    result.season,
                    encode_episodes(&result.episodes),
                    result.quality.as_bits(),
                    result.seeders,
                    result.leechers,
                    result.size_bytes,
                    result.proper_tags.join("|"),
                    result.publish_date.map(|d| d.to_rfc3339()),
                    result.release_group,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }

        // Bounded table: drop oldest rows past the cap.
        conn.execute(
            &format!(
                "DELETE FROM {table} WHERE fingerprint NOT IN (SELECT fingerprint FROM {table} ORDER BY added DESC LIMIT ?)"
            ),
            rusqlite::params![self.max_rows_per_provider],
        )?;

        debug!(provider, rows = results.len(), "cached manual search results");
        Ok(())
    }

    /// Aggregate query across all provider tables, best rows first.
    pub fn query(
        &self,
        show: ShowId,
        season: i32,
        episode: Option<i32>,
    ) -> Result<Vec<CachedResult>, CacheError> {
        let conn = self.conn.lock().unwrap();
        let tables = Self::provider_tables(&conn)?;
        if tables.is_empty() {
            return Ok(Vec::new());
        }

        let mut selects = Vec::with_capacity(tables.len());
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        for table in &tables {
            let provider = table.trim_start_matches("results_");
            let mut select = format!(
                "SELECT '{provider}' AS provider, rowid, name, locator, locator_kind, show, season, episodes, quality, seeders, leechers, size, proper_tags, pubdate, release_group FROM {table} WHERE show = ? AND season = ?"
            );
            params.push(Box::new(show.0));
            params.push(Box::new(season));
            if let Some(ep) = episode {
                select.push_str(" AND episodes LIKE ?");
                params.push(Box::new(format!("%|{}|%", ep)));
            }
            selects.push(select);
        }

        let sql = format!(
            "{} ORDER BY quality DESC, proper_tags DESC, seeders DESC",
            selects.join(" UNION ALL ")
        );

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| Self::row_to_cached(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Materialize one cached row, for pick-and-snatch.
    pub fn get(&self, provider: &str, rowid: i64) -> Result<CachedResult, CacheError> {
        let conn = self.conn.lock().unwrap();
        let table = Self::table_name(provider);
        let provider_key = table.trim_start_matches("results_").to_string();

        let sql = format!(
            "SELECT '{provider_key}' AS provider, rowid, name, locator, locator_kind, show, season, episodes, quality, seeders, leechers, size, proper_tags, pubdate, release_group FROM {table} WHERE rowid = ?"
        );
        match conn.query_row(&sql, rusqlite::params![rowid], |row| Self::row_to_cached(row)) {
            Ok(cached) => Ok(cached),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(CacheError::NotFound {
                provider: provider.to_string(),
                rowid,
            }),
            Err(rusqlite::Error::SqliteFailure(_, _)) => Err(CacheError::NotFound {
                provider: provider.to_string(),
                rowid,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_cached(row: &rusqlite::Row) -> rusqlite::Result<CachedResult> {
        let provider: String = row.get(0)?;
        let rowid: i64 = row.get(1)?;
        let name: String = row.get(2)?;
        let locator: String = row.get(3)?;
        let locator_kind: String = row.get(4)?;
        let show: i64 = row.get(5)?;
        let season: i32 = row.get(6)?;
        let episodes: String = row.get(7)?;
        let quality_bits: u32 = row.get(8)?;
        let seeders: i32 = row.get(9)?;
        let leechers: i32 = row.get(10)?;
        let size: u64 = row.get(11)?;
        let proper_tags: String = row.get(12)?;
        let pubdate: Option<String> = row.get(13)?;
        let release_group: Option<String> = row.get(14)?;

        let locator = if locator_kind == "magnet" {
            DownloadLocator::Magnet(locator)
        } else {
            DownloadLocator::Url(locator)
        };

        let result = SearchResult {
            title: name,
            locator,
            quality: Quality::from_bits(quality_bits).unwrap_or(Quality::Unknown),
            size_bytes: size,
            seeders,
            leechers,
            publish_date: pubdate.and_then(|d| {
                DateTime::parse_from_rfc3339(&d)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
            release_group,
            proper_tags: proper_tags
                .split('|')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            show: ShowId(show),
            season,
            episodes: decode_episodes(&episodes),
            provider: provider.clone(),
        };

        Ok(CachedResult {
            provider,
            rowid,
            result,
        })
    }
}

/// Pipe-wrapped episode list ("|1|2|") so a single episode can be matched
/// with LIKE '%|n|%'. A season pack encodes as "||".
fn encode_episodes(episodes: &[i32]) -> String {
    if episodes.is_empty() {
        return "||".to_string();
    }
    let mut out = String::from("|");
    for ep in episodes {
        out.push_str(&ep.to_string());
        out.push('|');
    }
    out
}

fn decode_episodes(encoded: &str) -> Vec<i32> {
    encoded
        .split('|')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_encode_decode_episodes() {
        assert_eq!(encode_episodes(&[1, 2]), "|1|2|");
        assert_eq!(encode_episodes(&[]), "||");
        assert_eq!(decode_episodes("|1|2|"), vec![1, 2]);
        assert!(decode_episodes("||").is_empty());
    }

    #[test]
    fn test_put_and_query() {
        let cache = ResultCache::in_memory().unwrap();
        let r1 = fixtures::hdtv_result("Show.S01E01.720p.HDTV.x264-A", 1, vec![1]);
        let r2 = fixtures::hdtv_result("Show.S01E02.720p.HDTV.x264-B", 1, vec![2]);
        cache.put("geek", &[r1, r2]).unwrap();

        let all = cache.query(ShowId(1), 1, None).unwrap();
        assert_eq!(all.len(), 2);

        let ep1 = cache.query(ShowId(1), 1, Some(1)).unwrap();
        assert_eq!(ep1.len(), 1);
        assert!(ep1[0].result.title.contains("E01"));

        // Wrong season finds nothing.
        assert!(cache.query(ShowId(1), 2, None).unwrap().is_empty());
    }

    #[test]
    fn test_query_unions_providers_and_orders_by_quality() {
        let cache = ResultCache::in_memory().unwrap();
        let hdtv = fixtures::hdtv_result("Show.S01E01.720p.HDTV.x264-A", 1, vec![1]);
        let mut bluray = fixtures::hdtv_result("Show.S01E01.1080p.BluRay.x264-B", 1, vec![1]);
        bluray.quality = Quality::FullHdBluray;

        cache.put("alpha", &[hdtv]).unwrap();
        cache.put("beta", &[bluray]).unwrap();

        let all = cache.query(ShowId(1), 1, Some(1)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].result.quality, Quality::FullHdBluray);
        assert_eq!(all[0].provider, "beta");
    }

    #[test]
    fn test_get_round_trip() {
        let cache = ResultCache::in_memory().unwrap();
        let result = fixtures::hdtv_result("Show.S01E05.720p.HDTV.x264-A", 1, vec![5]);
        cache.put("geek", &[result.clone()]).unwrap();

        let rows = cache.query(ShowId(1), 1, Some(5)).unwrap();
        let cached = cache.get("geek", rows[0].rowid).unwrap();
        assert_eq!(cached.result.title, result.title);
        assert_eq!(cached.result.locator, result.locator);
        assert_eq!(cached.result.episodes, vec![5]);
    }

    #[test]
    fn test_get_missing_row() {
        let cache = ResultCache::in_memory().unwrap();
        cache
            .put(
                "geek",
                &[fixtures::hdtv_result("Show.S01E01.720p.HDTV-A", 1, vec![1])],
            )
            .unwrap();
        assert!(matches!(
            cache.get("geek", 9999),
            Err(CacheError::NotFound { .. })
        ));
    }

    #[test]
    fn test_put_replaces_same_fingerprint() {
        let cache = ResultCache::in_memory().unwrap();
        let result = fixtures::hdtv_result("Show.S01E01.720p.HDTV-A", 1, vec![1]);
        cache.put("geek", &[result.clone()]).unwrap();
        cache.put("geek", &[result]).unwrap();

        assert_eq!(cache.query(ShowId(1), 1, None).unwrap().len(), 1);
    }
}
