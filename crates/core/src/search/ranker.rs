//! Result filtering and best-candidate selection.
//!
//! Filtering runs per provider result set (the seeder/leecher floor is a
//! provider setting); selection runs over the merged survivors. The
//! comparator is a total order modulo true ties, so the winner does not
//! depend on the order results arrived in.

use std::fmt;

use tracing::debug;

use crate::history::HistoryStore;
use crate::quality::{self, Quality};
use crate::tv::Show;

use super::naming;
use super::SearchResult;

/// Why a result was discarded by the filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NotInReleaseGroupWhitelist,
    UnwantedQuality(Quality),
    BelowPeerFloor { seeders: i32, leechers: i32 },
    IgnoredWord(String),
    MissingRequiredWord,
    BadRelease,
    PreviouslyFailed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotInReleaseGroupWhitelist => {
                write!(f, "release group not in anime whitelist")
            }
            RejectReason::UnwantedQuality(q) => write!(f, "quality {} not wanted", q.label()),
            RejectReason::BelowPeerFloor { seeders, leechers } => {
                write!(f, "below peer floor ({} seeders, {} leechers)", seeders, leechers)
            }
            RejectReason::IgnoredWord(w) => write!(f, "matches ignored word '{}'", w),
            RejectReason::MissingRequiredWord => write!(f, "missing required word"),
            RejectReason::BadRelease => write!(f, "matches bad release filter"),
            RejectReason::PreviouslyFailed => write!(f, "previously failed download"),
        }
    }
}

/// Everything the filter pipeline needs to judge one provider's results.
pub struct FilterContext<'a> {
    pub show: &'a Show,
    pub allowed: &'a [Quality],
    pub preferred: &'a [Quality],
    /// Provider floors; only enforced when both are set.
    pub min_seeders: Option<u32>,
    pub min_leechers: Option<u32>,
    /// Failed-download tracking, when enabled.
    pub failed_history: Option<&'a dyn HistoryStore>,
}

/// Run a result through the short-circuit filter pipeline.
///
/// Returns the first failing predicate, or `None` for a survivor.
pub fn reject_reason(result: &SearchResult, ctx: &FilterContext<'_>) -> Option<RejectReason> {
    if ctx.show.anime && !ctx.show.release_groups.is_empty() {
        let in_whitelist = result
            .release_group
            .as_deref()
            .map(|g| {
                ctx.show
                    .release_groups
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(g))
            })
            .unwrap_or(false);
        if !in_whitelist {
            return Some(RejectReason::NotInReleaseGroupWhitelist);
        }
    }

    if !quality::wanted(result.quality, ctx.allowed, ctx.preferred) {
        return Some(RejectReason::UnwantedQuality(result.quality));
    }

    if let (Some(min_seeders), Some(min_leechers)) = (ctx.min_seeders, ctx.min_leechers) {
        if result.seeders >= 0
            && result.leechers >= 0
            && ((result.seeders as u32) < min_seeders || (result.leechers as u32) < min_leechers)
        {
            return Some(RejectReason::BelowPeerFloor {
                seeders: result.seeders,
                leechers: result.leechers,
            });
        }
    }

    // A required-word match takes precedence over ignored words.
    let required_match = !ctx.show.required_words.is_empty()
        && naming::contains_any_word(&result.title, &ctx.show.required_words);

    if !required_match {
        if let Some(word) = ctx
            .show
            .ignored_words
            .iter()
            .find(|w| !w.is_empty() && naming::contains_word(&result.title, w))
        {
            return Some(RejectReason::IgnoredWord(word.clone()));
        }
    }

    if !ctx.show.required_words.is_empty() && !required_match {
        return Some(RejectReason::MissingRequiredWord);
    }

    if !naming::is_good_release(&result.title) {
        return Some(RejectReason::BadRelease);
    }

    if let Some(history) = ctx.failed_history {
        match history.has_failed(&result.title, result.size_bytes, &result.provider) {
            Ok(true) => return Some(RejectReason::PreviouslyFailed),
            Ok(false) => {}
            Err(e) => debug!(error = %e, "failed-history lookup error, letting result through"),
        }
    }

    None
}

/// Filter a provider's result set down to the survivors.
pub fn filter_results(results: Vec<SearchResult>, ctx: &FilterContext<'_>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|result| match reject_reason(result, ctx) {
            Some(reason) => {
                debug!(title = %result.title, %reason, "result rejected");
                false
            }
            None => true,
        })
        .collect()
}

/// Word lists consulted by the equal-quality tie-break chain.
pub struct SelectContext<'a> {
    pub allowed: &'a [Quality],
    pub preferred: &'a [Quality],
    pub preferred_words: &'a [String],
    pub undesired_words: &'a [String],
}

impl<'a> SelectContext<'a> {
    pub fn for_show(
        show: &'a Show,
        allowed: &'a [Quality],
        preferred: &'a [Quality],
    ) -> Self {
        Self {
            allowed,
            preferred,
            preferred_words: &show.preferred_words,
            undesired_words: &show.undesired_words,
        }
    }
}

/// Whether `candidate` displaces `best`.
///
/// Each rule is evaluated symmetrically: if exactly one side carries the
/// marker the rule decides, otherwise the next rule runs. True ties keep
/// the existing best (first-seen ordering is stable).
pub fn prefers_candidate(
    best: &SearchResult,
    candidate: &SearchResult,
    ctx: &SelectContext<'_>,
) -> bool {
    if quality::is_higher(best.quality, candidate.quality, ctx.allowed, ctx.preferred) {
        return true;
    }
    if candidate.quality != best.quality {
        // Candidate is lower or incomparable; never displaces.
        return false;
    }

    let best_word = naming::contains_any_word(&best.title, ctx.preferred_words);
    let cand_word = naming::contains_any_word(&candidate.title, ctx.preferred_words);
    if cand_word != best_word {
        return cand_word;
    }

    let best_proper = best.is_proper();
    let cand_proper = candidate.is_proper();
    if cand_proper != best_proper {
        return cand_proper;
    }

    let best_internal = naming::is_internal(&best.title);
    let cand_internal = naming::is_internal(&candidate.title);
    if cand_internal != best_internal {
        return best_internal;
    }

    let best_xvid = naming::uses_xvid(&best.title);
    let cand_modern = naming::uses_modern_codec(&candidate.title);
    let cand_xvid = naming::uses_xvid(&candidate.title);
    let best_modern = naming::uses_modern_codec(&best.title);
    if best_xvid && cand_modern {
        return true;
    }
    if cand_xvid && best_modern {
        return false;
    }

    let best_undesired = naming::contains_any_word(&best.title, ctx.undesired_words);
    let cand_undesired = naming::contains_any_word(&candidate.title, ctx.undesired_words);
    if cand_undesired != best_undesired {
        return best_undesired;
    }

    false
}

/// Pick the single winner among filtered candidates.
pub fn pick_best<'a, I>(candidates: I, ctx: &SelectContext<'_>) -> Option<&'a SearchResult>
where
    I: IntoIterator<Item = &'a SearchResult>,
{
    let mut best: Option<&SearchResult> = None;
    for candidate in candidates {
        match best {
            None => best = Some(candidate),
            Some(current) => {
                if prefers_candidate(current, candidate, ctx) {
                    best = Some(candidate);
                }
            }
        }
    }
    best
}

/// A winner already in the preferred set stops further searching for its
/// segment and snatches as SNATCHED_BEST downstream.
pub fn is_first_best_match(result: &SearchResult, preferred: &[Quality]) -> bool {
    preferred.contains(&result.quality)
}
