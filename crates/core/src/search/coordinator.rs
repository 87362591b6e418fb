//! Per-invocation search orchestration.
//!
//! One call walks the enabled provider list for a show segment, merges
//! hits into season-pack / multi-episode / single-episode buckets,
//! reconciles overlaps and returns the final ordered result list (or, for
//! manual searches, caches everything it found).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{EngineEvent, EventBus};
use crate::history::HistoryStore;
use crate::metrics;
use crate::provider::{
    search_with_fallback, Provider, ProviderError, ProviderKind, ProviderMode, ProviderRegistry,
    ProviderSearchRequest, SearchMode,
};
use crate::quality::{self, Quality, SearchType};
use crate::tv::{Episode, EpisodeKey, Library, LibraryError, Show};

use super::ranker::{self, FilterContext, SelectContext};
use super::{ResultCache, ResultShape, SearchResult};

/// Error type for a whole coordinator run.
#[derive(Debug, Error)]
pub enum SearchRunError {
    #[error("No providers available for {0:?} search")]
    NoProviders(ProviderMode),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Outcome of one coordinator run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Final chosen results, ordered by season/episode.
    pub results: Vec<SearchResult>,
    /// Manual mode: results were written to the provider cache instead of
    /// being handed to the snatch executor.
    pub cached: bool,
}

/// Dependencies and knobs for coordinator runs.
pub struct SearchCoordinator {
    registry: Arc<ProviderRegistry>,
    library: Arc<dyn Library>,
    history: Arc<dyn HistoryStore>,
    cache: Arc<ResultCache>,
    events: EventBus,
    /// Failed-download tracking toggles the previously-failed filter.
    failed_tracking: bool,
    /// Short sleep between provider queries.
    breather: Duration,
}

impl SearchCoordinator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        library: Arc<dyn Library>,
        history: Arc<dyn HistoryStore>,
        cache: Arc<ResultCache>,
        events: EventBus,
        failed_tracking: bool,
        breather: Duration,
    ) -> Self {
        Self {
            registry,
            library,
            history,
            cache,
            events,
            failed_tracking,
            breather,
        }
    }

    /// Run one search for a show segment.
    pub async fn search(
        &self,
        show: &Show,
        segment: &[EpisodeKey],
        search_type: SearchType,
        manual: bool,
        forced: bool,
    ) -> Result<SearchOutcome, SearchRunError> {
        let mode = provider_mode(search_type, manual);
        let providers = self.registry.enabled(mode);
        if providers.is_empty() {
            return Err(SearchRunError::NoProviders(mode));
        }

        // Group the segment by season; packs and reconciliation are
        // season-scoped.
        let mut seasons: BTreeMap<i32, Vec<EpisodeKey>> = BTreeMap::new();
        for key in segment {
            seasons.entry(key.season).or_default().push(*key);
        }

        let mut results = Vec::new();
        let mut cached = false;
        for (season, keys) in seasons {
            let outcome = self
                .search_season(show, season, &keys, &providers, search_type, manual, forced)
                .await?;
            cached |= outcome.cached;
            results.extend(outcome.results);
        }

        results.sort_by_key(|r| (r.season, r.episodes.first().copied().unwrap_or(0)));
        Ok(SearchOutcome { results, cached })
    }

    #[allow(clippy::too_many_arguments)]
    async fn search_season(
        &self,
        show: &Show,
        season: i32,
        keys: &[EpisodeKey],
        providers: &[Arc<dyn Provider>],
        search_type: SearchType,
        manual: bool,
        forced: bool,
    ) -> Result<SearchOutcome, SearchRunError> {
        let (allowed, preferred) = show.quality.split();

        // Episode-name cache for the season; providers match release
        // titles against these and the reconciliation reuses them.
        let season_episodes = self.library.season_episodes(show.id, season)?;

        let wanted_eps = self.wanted_episodes(show, keys, &allowed, &preferred, manual || forced)?;
        if wanted_eps.is_empty() {
            debug!(show = %show.id, season, "nothing wanted in segment, skipping");
            return Ok(SearchOutcome {
                results: Vec::new(),
                cached: false,
            });
        }
        let wanted_numbers: Vec<i32> = wanted_eps.iter().map(|ep| ep.key.episode).collect();

        // Whole-season segments search in season mode first.
        let whole_season =
            wanted_eps.len() == season_episodes.len() && season_episodes.len() > 1;
        let initial_mode = if whole_season {
            SearchMode::Season
        } else {
            SearchMode::Episode
        };

        let mut season_packs: Vec<SearchResult> = Vec::new();
        let mut multi: Vec<SearchResult> = Vec::new();
        let mut singles: HashMap<i32, Vec<SearchResult>> = HashMap::new();
        let mut all_survivors: Vec<SearchResult> = Vec::new();

        let select_ctx = SelectContext::for_show(show, &allowed, &preferred);

        for (idx, provider) in providers.iter().enumerate() {
            if idx > 0 && !self.breather.is_zero() {
                tokio::time::sleep(self.breather).await;
            }

            let request = ProviderSearchRequest {
                show: show.id,
                show_title: show.title.clone(),
                season,
                episodes: wanted_numbers.clone(),
                episode_names: season_episodes.iter().map(|ep| ep.name.clone()).collect(),
                mode: initial_mode,
                manual,
                forced,
            };

            let hits = match search_with_fallback(provider.as_ref(), &request).await {
                Ok(hits) => hits,
                Err(e) => {
                    self.record_provider_error(provider.as_ref(), &e);
                    continue;
                }
            };

            let config = provider.config();
            let filter_ctx = FilterContext {
                show,
                allowed: &allowed,
                preferred: &preferred,
                min_seeders: config.min_seeders,
                min_leechers: config.min_leechers,
                failed_history: if self.failed_tracking {
                    Some(self.history.as_ref())
                } else {
                    None
                },
            };
            let survivors = ranker::filter_results(hits, &filter_ctx);
            debug!(
                provider = %config.id,
                survivors = survivors.len(),
                "provider results filtered"
            );

            if manual {
                if let Err(e) = self.cache.put(&config.id, &survivors) {
                    warn!(provider = %config.id, error = %e, "failed to cache manual results");
                }
            }

            for result in survivors {
                all_survivors.push(result.clone());
                match result.shape() {
                    ResultShape::SeasonPack => season_packs.push(result),
                    ResultShape::MultiEpisode => multi.push(result),
                    ResultShape::Single => {
                        singles.entry(result.episodes[0]).or_default().push(result)
                    }
                }
            }

            // Automatic searches stop early once every wanted episode has
            // a preferred-tier candidate.
            if !manual
                && wanted_numbers.iter().all(|ep| {
                    singles
                        .get(ep)
                        .and_then(|c| ranker::pick_best(c.iter(), &select_ctx))
                        .map(|best| ranker::is_first_best_match(best, &preferred))
                        .unwrap_or(false)
                })
            {
                info!(show = %show.id, season, "all episodes found at preferred quality, stopping provider loop");
                break;
            }
        }

        if manual {
            return Ok(SearchOutcome {
                results: all_survivors,
                cached: true,
            });
        }

        // --- Season-pack reconciliation ---
        if let Some(best_pack) = ranker::pick_best(season_packs.iter(), &select_ctx).cloned() {
            let pack_quality = best_pack.quality;
            let best_overall = best_quality_seen(
                season_packs
                    .iter()
                    .chain(multi.iter())
                    .chain(singles.values().flatten()),
                &allowed,
                &preferred,
            );

            let all_wanted = !season_episodes.is_empty()
                && season_episodes.iter().all(|ep| {
                    let snap = ep.snapshot();
                    forced
                        || quality::should_search(
                            snap.status,
                            snap.quality,
                            &allowed,
                            &preferred,
                            snap.manually_searched,
                        )
                        .0
                });

            if all_wanted && Some(pack_quality) == best_overall {
                // The pack wins the whole season outright.
                let mut pack = best_pack;
                pack.episodes = season_episodes.iter().map(|ep| ep.key.episode).collect();
                info!(show = %show.id, season, title = %pack.title, "season pack accepted for whole season");
                return Ok(SearchOutcome {
                    results: vec![pack],
                    cached: false,
                });
            }

            // Partial want: NZB packs can be split per episode, torrent
            // packs must be taken whole and compete as multi-episode.
            match self.provider_kind(&best_pack.provider) {
                ProviderKind::Nzb => {
                    for ep in &wanted_numbers {
                        let mut split = best_pack.clone();
                        split.episodes = vec![*ep];
                        singles.entry(*ep).or_default().push(split);
                    }
                    debug!(show = %show.id, season, "season pack split into per-episode results");
                }
                ProviderKind::Torrent => {
                    let mut demoted = best_pack;
                    demoted.episodes = wanted_numbers.clone();
                    multi.push(demoted);
                    debug!(show = %show.id, season, "season pack demoted to multi-episode bucket");
                }
            }
        }

        // --- Single-episode winners (pre-pass for multi reconciliation) ---
        let mut single_winners: BTreeMap<i32, SearchResult> = BTreeMap::new();
        for (ep, candidates) in &singles {
            if let Some(best) = ranker::pick_best(candidates.iter(), &select_ctx) {
                single_winners.insert(*ep, best.clone());
            }
        }

        // --- Multi-episode reconciliation ---
        let mut accepted_multi: Vec<SearchResult> = Vec::new();
        let mut multi_covered: HashSet<i32> = HashSet::new();
        for candidate in &multi {
            let needed: Vec<i32> = candidate
                .episodes
                .iter()
                .copied()
                .filter(|ep| !single_winners.contains_key(ep))
                .collect();
            if needed.is_empty() {
                debug!(title = %candidate.title, "multi-episode result fully covered by singles");
                continue;
            }
            if candidate
                .episodes
                .iter()
                .all(|ep| multi_covered.contains(ep))
            {
                debug!(title = %candidate.title, "multi-episode result fully covered by accepted multi");
                continue;
            }

            multi_covered.extend(candidate.episodes.iter().copied());
            // Overlapping singles yield to the multi-episode result.
            for ep in &candidate.episodes {
                single_winners.remove(ep);
            }
            accepted_multi.push(candidate.clone());
        }

        // --- Final assembly ---
        let mut finals = accepted_multi;
        for (ep, winner) in single_winners {
            if finals.iter().any(|r| r.covers(ep)) {
                continue;
            }
            finals.push(winner);
        }
        finals.sort_by_key(|r| (r.season, r.episodes.first().copied().unwrap_or(0)));

        Ok(SearchOutcome {
            results: finals,
            cached: false,
        })
    }

    /// Episodes of the segment worth searching for.
    fn wanted_episodes(
        &self,
        show: &Show,
        keys: &[EpisodeKey],
        allowed: &[Quality],
        preferred: &[Quality],
        include_all: bool,
    ) -> Result<Vec<Arc<Episode>>, SearchRunError> {
        let mut out = Vec::new();
        for key in keys {
            let episode = match self.library.episode(show.id, *key) {
                Ok(ep) => ep,
                Err(LibraryError::EpisodeNotFound { .. }) => {
                    warn!(show = %show.id, key = %key, "segment episode missing from library");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if include_all {
                out.push(episode);
                continue;
            }

            let snap = episode.snapshot();
            let (search, reason) = quality::should_search(
                snap.status,
                snap.quality,
                allowed,
                preferred,
                snap.manually_searched,
            );
            if search {
                out.push(episode);
            } else {
                debug!(show = %show.id, key = %key, reason = %reason, "episode skipped");
            }
        }
        Ok(out)
    }

    fn provider_kind(&self, provider_id: &str) -> ProviderKind {
        self.registry
            .get(provider_id)
            .map(|p| p.config().kind)
            .unwrap_or(ProviderKind::Nzb)
    }

    fn record_provider_error(&self, provider: &dyn Provider, error: &ProviderError) {
        let id = &provider.config().id;
        let class = match error {
            ProviderError::Auth(_) => "auth",
            ProviderError::RateLimited { .. } => "rate_limited",
            _ => "transient",
        };
        warn!(provider = %id, error = %error, class, "provider search failed, moving on");
        metrics::PROVIDER_ERRORS.with_label_values(&[id, class]).inc();
        self.events.emit(EngineEvent::ProviderError {
            provider: id.clone(),
            error: error.to_string(),
        });
    }
}

fn provider_mode(search_type: SearchType, manual: bool) -> ProviderMode {
    if manual {
        return ProviderMode::Manual;
    }
    match search_type {
        SearchType::Daily => ProviderMode::Daily,
        _ => ProviderMode::Backlog,
    }
}

/// The top quality among candidates, per the lattice ordering.
fn best_quality_seen<'a, I>(
    candidates: I,
    allowed: &[Quality],
    preferred: &[Quality],
) -> Option<Quality>
where
    I: IntoIterator<Item = &'a SearchResult>,
{
    let mut best: Option<Quality> = None;
    for candidate in candidates {
        match best {
            None => best = Some(candidate.quality),
            Some(current) => {
                if quality::is_higher(current, candidate.quality, allowed, preferred) {
                    best = Some(candidate.quality);
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_provider_mode_resolution() {
        assert_eq!(provider_mode(SearchType::Daily, false), ProviderMode::Daily);
        assert_eq!(
            provider_mode(SearchType::Backlog, false),
            ProviderMode::Backlog
        );
        assert_eq!(
            provider_mode(SearchType::FailedRetry, false),
            ProviderMode::Backlog
        );
        // The manual flag always wins.
        assert_eq!(provider_mode(SearchType::Daily, true), ProviderMode::Manual);
    }

    #[test]
    fn test_best_quality_seen() {
        let allowed = [Quality::Hdtv, Quality::HdWebDl];
        let preferred = [Quality::FullHdBluray];

        let hdtv = fixtures::hdtv_result("Show.S01E01.720p.HDTV-A", 1, vec![1]);
        let mut webdl = fixtures::hdtv_result("Show.S01E01.720p.WEB-DL-B", 1, vec![1]);
        webdl.quality = Quality::HdWebDl;
        let mut bluray = fixtures::hdtv_result("Show.S01E01.1080p.BluRay-C", 1, vec![1]);
        bluray.quality = Quality::FullHdBluray;

        let best = best_quality_seen([&hdtv, &webdl, &bluray], &allowed, &preferred);
        assert_eq!(best, Some(Quality::FullHdBluray));

        let best = best_quality_seen([&hdtv, &webdl], &allowed, &preferred);
        assert_eq!(best, Some(Quality::HdWebDl));

        let none: [&SearchResult; 0] = [];
        assert_eq!(best_quality_seen(none, &allowed, &preferred), None);
    }
}
