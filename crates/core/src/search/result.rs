//! Search result model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quality::Quality;
use crate::tv::{EpisodeKey, ShowId};

/// How a result is fetched once snatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DownloadLocator {
    /// Direct NZB or .torrent download URL.
    Url(String),
    /// Magnet URI.
    Magnet(String),
}

impl DownloadLocator {
    pub fn as_str(&self) -> &str {
        match self {
            DownloadLocator::Url(s) => s,
            DownloadLocator::Magnet(s) => s,
        }
    }
}

/// Episode coverage shape of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    SeasonPack,
    Single,
    MultiEpisode,
}

/// A single provider hit, owned by the coordinator invocation that
/// created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub locator: DownloadLocator,
    pub quality: Quality,
    pub size_bytes: u64,
    /// -1 when the provider does not report a count.
    pub seeders: i32,
    /// -1 when the provider does not report a count.
    pub leechers: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_group: Option<String>,
    #[serde(default)]
    pub proper_tags: Vec<String>,
    pub show: ShowId,
    pub season: i32,
    /// Episode numbers covered; empty means the whole season.
    #[serde(default)]
    pub episodes: Vec<i32>,
    /// Id of the provider that returned this hit.
    pub provider: String,
}

impl SearchResult {
    pub fn shape(&self) -> ResultShape {
        match self.episodes.len() {
            0 => ResultShape::SeasonPack,
            1 => ResultShape::Single,
            _ => ResultShape::MultiEpisode,
        }
    }

    pub fn is_season_pack(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn is_proper(&self) -> bool {
        !self.proper_tags.is_empty()
    }

    /// Episode keys this result covers. Season packs return an empty list;
    /// the coordinator expands them against the library.
    pub fn episode_keys(&self) -> Vec<EpisodeKey> {
        self.episodes
            .iter()
            .map(|&e| EpisodeKey::new(self.season, e))
            .collect()
    }

    /// Whether this result covers the given episode number.
    pub fn covers(&self, episode: i32) -> bool {
        self.episodes.contains(&episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(episodes: Vec<i32>) -> SearchResult {
        SearchResult {
            title: "Show.S01E01.720p.HDTV.x264-GRP".to_string(),
            locator: DownloadLocator::Url("http://example.test/1".to_string()),
            quality: Quality::Hdtv,
            size_bytes: 500_000_000,
            seeders: 10,
            leechers: 2,
            publish_date: None,
            release_group: Some("GRP".to_string()),
            proper_tags: vec![],
            show: ShowId(1),
            season: 1,
            episodes,
            provider: "prov".to_string(),
        }
    }

    #[test]
    fn test_shape() {
        assert_eq!(result(vec![]).shape(), ResultShape::SeasonPack);
        assert_eq!(result(vec![1]).shape(), ResultShape::Single);
        assert_eq!(result(vec![1, 2]).shape(), ResultShape::MultiEpisode);
    }

    #[test]
    fn test_episode_keys() {
        let keys = result(vec![3, 4]).episode_keys();
        assert_eq!(keys, vec![EpisodeKey::new(1, 3), EpisodeKey::new(1, 4)]);
    }

    #[test]
    fn test_serde_round_trip() {
        let r = result(vec![1]);
        let json = serde_json::to_string(&r).unwrap();
        let parsed: SearchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.title, r.title);
        assert_eq!(parsed.locator, r.locator);
        assert_eq!(parsed.episodes, vec![1]);
    }
}
