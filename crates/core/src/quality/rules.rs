//! Search and replacement decision rules over the quality lattice.
//!
//! Numeric ordering between two qualities is only meaningful inside one
//! tier (allowed vs preferred); every `>` here is evaluated strictly after
//! tier membership has been established for both sides.

use crate::tv::EpisodeStatus;

use super::Quality;

/// The kind of search a decision is being made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Daily,
    Backlog,
    Manual,
    FailedRetry,
    Proper,
}

/// Whether a quality is acceptable at all for a show's quality settings.
pub fn wanted(quality: Quality, allowed: &[Quality], preferred: &[Quality]) -> bool {
    allowed.contains(&quality) || preferred.contains(&quality)
}

/// Whether `candidate` improves on `current`.
///
/// Preferred tiers always beat allowed tiers; within a tier the raw bit
/// value decides. Falls through to `false` when no rule matches.
pub fn is_higher(
    current: Quality,
    candidate: Quality,
    allowed: &[Quality],
    preferred: &[Quality],
) -> bool {
    let current_preferred = preferred.contains(&current);

    if preferred.contains(&candidate) {
        if !current_preferred {
            return true;
        }
        return numeric_gt(candidate, current);
    }

    if allowed.contains(&candidate) {
        if current_preferred {
            return false;
        }
        if !allowed.contains(&current) {
            return true;
        }
        return numeric_gt(candidate, current);
    }

    false
}

/// In-tier numeric comparison. Both sides must already be known to sit in
/// the same tier; the bit ordering is not a total order across tiers.
fn numeric_gt(candidate: Quality, current: Quality) -> bool {
    debug_assert!(
        candidate != Quality::None && current != Quality::None,
        "numeric comparison against the N/A sentinel"
    );
    candidate.as_bits() > current.as_bits()
}

/// Statuses a backlog/daily search will consider re-searching at all.
const SEARCHABLE: [EpisodeStatus; 5] = [
    EpisodeStatus::Wanted,
    EpisodeStatus::Downloaded,
    EpisodeStatus::Snatched,
    EpisodeStatus::SnatchedProper,
    EpisodeStatus::SnatchedBest,
];

/// Decide whether an episode should be searched for (again).
///
/// Returns the decision plus a short human-readable reason for logging.
pub fn should_search(
    status: EpisodeStatus,
    quality: Quality,
    allowed: &[Quality],
    preferred: &[Quality],
    manually_searched: bool,
) -> (bool, String) {
    if manually_searched {
        return (false, "episode was manually searched, result is final".into());
    }

    if !SEARCHABLE.contains(&status) {
        return (false, format!("status {:?} is not searchable", status));
    }

    if status == EpisodeStatus::Wanted {
        return (true, "episode is wanted".into());
    }

    if !wanted(quality, allowed, preferred) {
        return (
            true,
            format!("current quality {} is not wanted anymore", quality.label()),
        );
    }

    if !preferred.is_empty() {
        if preferred.contains(&quality) {
            return (
                false,
                format!("already at preferred quality {}", quality.label()),
            );
        }
        return (
            true,
            format!("looking to upgrade {} to a preferred quality", quality.label()),
        );
    }

    (
        false,
        format!("allowed quality {} is final", quality.label()),
    )
}

/// Decide whether a newly found quality should replace the one an episode
/// already has. Returns the decision plus the rule that produced it.
#[allow(clippy::too_many_arguments)]
pub fn should_replace(
    status: EpisodeStatus,
    old_quality: Quality,
    new_quality: Quality,
    allowed: &[Quality],
    preferred: &[Quality],
    download_current_quality: bool,
    force: bool,
    manually_searched: bool,
    search_type: SearchType,
) -> (bool, String) {
    let replaceable = matches!(
        status,
        EpisodeStatus::Downloaded | EpisodeStatus::Snatched | EpisodeStatus::SnatchedProper
    );
    if !replaceable && !force {
        return (false, format!("status {:?} is not replaceable", status));
    }

    if manually_searched && !force {
        return (false, "manually snatched result is sticky".into());
    }

    if !wanted(new_quality, allowed, preferred) {
        return (
            false,
            format!("quality {} is not wanted", new_quality.label()),
        );
    }

    if search_type == SearchType::Proper {
        if new_quality == old_quality {
            return (true, "proper for the current quality".into());
        }
        return (false, "proper search only replaces the same quality".into());
    }

    if !wanted(old_quality, allowed, preferred) {
        return (
            true,
            format!("current quality {} is no longer wanted", old_quality.label()),
        );
    }

    if download_current_quality && force && new_quality == old_quality {
        return (true, "forced re-download of the current quality".into());
    }

    if !preferred.is_empty() {
        if preferred.contains(&old_quality) {
            return (
                false,
                format!("already at preferred quality {}", old_quality.label()),
            );
        }
        if preferred.contains(&new_quality) {
            return (
                true,
                format!("upgrading to preferred quality {}", new_quality.label()),
            );
        }
        // Both sides are allowed-tier here; in-tier numeric compare is safe.
        if numeric_gt(new_quality, old_quality) {
            return (true, "higher allowed quality while preferring upward".into());
        }
        return (false, "no upgrade over current quality".into());
    }

    (false, "allowed-only qualities are terminal".into())
}
