//! Shared test fixtures.

use crate::provider::{ProviderSearchRequest, SearchMode};
use crate::quality::{CombinedQuality, Quality};
use crate::queue::{QueueItem, QueueKind};
use crate::search::{naming, DownloadLocator, SearchResult};
use crate::tv::{Episode, EpisodeKey, EpisodeState, EpisodeStatus, MemoryLibrary, Show, ShowId};

/// A result for show 1 at HDTV quality, healthy peer counts.
pub fn hdtv_result(title: &str, season: i32, episodes: Vec<i32>) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        locator: DownloadLocator::Url(format!(
            "http://dl.example.test/{}",
            title.replace(' ', ".")
        )),
        quality: Quality::Hdtv,
        size_bytes: 734_003_200,
        seeders: 10,
        leechers: 5,
        publish_date: None,
        release_group: naming::release_group(title),
        proper_tags: naming::proper_tags(title),
        show: ShowId(1),
        season,
        episodes,
        provider: "mock".to_string(),
    }
}

/// A result whose season/episodes are parsed out of the title, with an
/// explicit quality tag.
pub fn result_with_quality(title: &str, quality: Quality) -> SearchResult {
    let (season, episodes) =
        naming::parse_episode_refs(title).unwrap_or((1, vec![1]));
    let episodes = if episodes.is_empty() { vec![1] } else { episodes };
    let mut result = hdtv_result(title, season, episodes);
    result.quality = quality;
    result
}

/// Episode-mode request against show 1 / "Test Show".
pub fn episode_request(season: i32, episodes: Vec<i32>) -> ProviderSearchRequest {
    ProviderSearchRequest {
        show: ShowId(1),
        show_title: "Test Show".to_string(),
        season,
        episodes,
        episode_names: Vec::new(),
        mode: SearchMode::Episode,
        manual: false,
        forced: false,
    }
}

/// Standard test show: HDTV/WEB-DL allowed, 1080p BluRay preferred.
pub fn test_show(id: i64) -> Show {
    Show {
        id: ShowId(id),
        title: "Test Show".to_string(),
        anime: false,
        release_groups: vec![],
        quality: CombinedQuality::combine(
            &[Quality::Hdtv, Quality::HdWebDl],
            &[Quality::FullHdBluray],
        ),
        ignored_words: vec![],
        required_words: vec![],
        preferred_words: vec![],
        undesired_words: vec![],
    }
}

/// Library holding one show with `count` WANTED episodes in `season`.
pub fn library_with_wanted_show(show_id: i64, season: i32, count: i32) -> MemoryLibrary {
    let library = MemoryLibrary::new();
    let episodes = (1..=count)
        .map(|n| {
            Episode::new(
                ShowId(show_id),
                EpisodeKey::new(season, n),
                format!("Episode {}", n),
                EpisodeState::new(EpisodeStatus::Wanted),
            )
        })
        .collect();
    library.add_show(test_show(show_id), episodes);
    library
}

/// Backlog queue item for one show segment.
pub fn backlog_item(show: i64, season: i32, episodes: &[i32]) -> QueueItem {
    QueueItem::new(
        QueueKind::Backlog,
        ShowId(show),
        episodes
            .iter()
            .map(|&e| EpisodeKey::new(season, e))
            .collect(),
    )
}
