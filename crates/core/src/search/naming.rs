//! Release-name heuristics.
//!
//! Pure functions over release titles: quality tagging, episode-number
//! extraction, proper/repack tags, release group, and the word matching
//! used by the ranker's filter lists.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::quality::Quality;

static EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})((?:[.\-\s]?E\d{1,3})+)?").unwrap());

static EPISODE_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)E(\d{1,3})").unwrap());

static PROPER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(proper|repack|real|rerip)\b").unwrap());

static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([A-Za-z0-9]+)$").unwrap());

/// Scene junk no automatic search should ever pick up.
static BAD_RELEASE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bsub(bed|pack|s)\b",
        r"(?i)\b(dir|sample|nfo)fix\b",
        r"(?i)\bsample\b",
        r"(?i)\b(dvd)?extras\b",
        r"(?i)\bdub(bed)?\b",
        r"(?i)\bdvdscr\b",
        r"(?i)\bscreener\b",
        r"(?i)\btelesync\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Tag a release name with its quality tier.
pub fn parse_quality(name: &str) -> Quality {
    let lower = name.to_lowercase();
    let has = |needle: &str| lower.contains(needle);
    let web = has("web-dl") || has("webdl") || has("webrip") || has("web.") || has("web ");
    let bluray = has("bluray") || has("blu-ray") || has("bdrip") || has("brrip");

    if has("2160p") || has("4k") {
        return if bluray {
            Quality::Uhd4kBluray
        } else if web {
            Quality::Uhd4kWebDl
        } else {
            Quality::Uhd4kTv
        };
    }
    if has("1080p") {
        return if bluray {
            Quality::FullHdBluray
        } else if web {
            Quality::FullHdWebDl
        } else {
            Quality::FullHdtv
        };
    }
    if has("720p") {
        return if bluray {
            Quality::HdBluray
        } else if web {
            Quality::HdWebDl
        } else {
            Quality::Hdtv
        };
    }
    if has("1080i") && has("mpeg2") {
        return Quality::RawHdtv;
    }
    if bluray || has("dvdrip") || has("dvd") {
        return Quality::SdDvd;
    }
    if has("hdtv") || has("pdtv") || has("sdtv") || has("tvrip") || has("480p") {
        return Quality::Sdtv;
    }
    Quality::Unknown
}

/// Extract (season, episode numbers) from a release name.
///
/// An empty episode list with a matched season means a season pack. `None`
/// when no SxxEyy-style pattern is present at all.
pub fn parse_episode_refs(name: &str) -> Option<(i32, Vec<i32>)> {
    let caps = EPISODE_RE.captures(name)?;
    let season: i32 = caps.get(1)?.as_str().parse().ok()?;

    let episodes = match caps.get(2) {
        Some(tail) => EPISODE_NUM_RE
            .captures_iter(tail.as_str())
            .filter_map(|c| c.get(1)?.as_str().parse().ok())
            .collect(),
        None => Vec::new(),
    };

    Some((season, episodes))
}

/// Proper/repack/real/rerip tags present in the name, lowercased, in order.
pub fn proper_tags(name: &str) -> Vec<String> {
    PROPER_RE
        .captures_iter(name)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_lowercase()))
        .collect()
}

/// The trailing scene group of a release name, if any.
pub fn release_group(name: &str) -> Option<String> {
    GROUP_RE
        .captures(name.trim())
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
}

/// Case-insensitive whole-word match.
pub fn contains_word(name: &str, word: &str) -> bool {
    let pattern = format!(r"(?i)\b{}\b", escape(word));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(name),
        Err(_) => name.to_lowercase().contains(&word.to_lowercase()),
    }
}

/// Whether any word of the list matches the name.
pub fn contains_any_word(name: &str, words: &[String]) -> bool {
    words.iter().any(|w| !w.is_empty() && contains_word(name, w))
}

/// General scene-junk filter; false means the release is rejected.
pub fn is_good_release(name: &str) -> bool {
    !BAD_RELEASE_RES.iter().any(|re| re.is_match(name))
}

/// Internal releases lose tie-breaks against plain ones.
pub fn is_internal(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("-internal") || lower.contains(".internal.") || lower.contains(" internal ")
}

/// Legacy xvid encodes lose tie-breaks against modern codecs.
pub fn uses_xvid(name: &str) -> bool {
    name.to_lowercase().contains("xvid")
}

/// x264/x265 family, including the h.26x and hevc spellings.
pub fn uses_modern_codec(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["x264", "x265", "h264", "h265", "h.264", "h.265", "hevc", "av1"]
        .iter()
        .any(|c| lower.contains(c))
}

fn escape(word: &str) -> String {
    let mut out = String::with_capacity(word.len() * 2);
    for ch in word.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}
