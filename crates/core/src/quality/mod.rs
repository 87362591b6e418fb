//! Quality lattice for episode releases.
//!
//! A [`Quality`] is a single canonical resolution+source tier backed by one
//! bit of a 16-bit word. Shows carry a packed [`CombinedQuality`]: the low
//! word is the set of allowed tiers, the high word the set of preferred
//! tiers. The newtype keeps packed values from ever being compared against
//! a single `Quality` without going through [`CombinedQuality::split`].

mod rules;

pub use rules::{is_higher, should_replace, should_search, wanted, SearchType};

use serde::{Deserialize, Serialize};

/// A single canonical release quality tier.
///
/// Discriminants are bit positions in the low word of a combined quality.
/// `None` (an episode with no quality attached) and `Unknown` (a release
/// whose name parsed to nothing recognizable) are the two sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    None = 0,
    Sdtv = 1,
    SdDvd = 1 << 1,
    Hdtv = 1 << 2,
    RawHdtv = 1 << 3,
    FullHdtv = 1 << 4,
    HdWebDl = 1 << 5,
    FullHdWebDl = 1 << 6,
    HdBluray = 1 << 7,
    FullHdBluray = 1 << 8,
    Uhd4kTv = 1 << 9,
    Uhd4kWebDl = 1 << 10,
    Uhd4kBluray = 1 << 11,
    Unknown = 1 << 15,
}

impl Quality {
    /// Every quality a combined value may contain, in ascending bit order.
    pub const ALL: [Quality; 13] = [
        Quality::Sdtv,
        Quality::SdDvd,
        Quality::Hdtv,
        Quality::RawHdtv,
        Quality::FullHdtv,
        Quality::HdWebDl,
        Quality::FullHdWebDl,
        Quality::HdBluray,
        Quality::FullHdBluray,
        Quality::Uhd4kTv,
        Quality::Uhd4kWebDl,
        Quality::Uhd4kBluray,
        Quality::Unknown,
    ];

    /// Raw bit value of this quality.
    pub fn as_bits(self) -> u32 {
        self as u32
    }

    /// Look up a quality from its exact bit value.
    pub fn from_bits(bits: u32) -> Option<Quality> {
        if bits == 0 {
            return Some(Quality::None);
        }
        Quality::ALL.iter().copied().find(|q| q.as_bits() == bits)
    }

    /// Human-readable tier label.
    pub fn label(self) -> &'static str {
        match self {
            Quality::None => "N/A",
            Quality::Sdtv => "SDTV",
            Quality::SdDvd => "SD DVD",
            Quality::Hdtv => "720p HDTV",
            Quality::RawHdtv => "RawHD",
            Quality::FullHdtv => "1080p HDTV",
            Quality::HdWebDl => "720p WEB-DL",
            Quality::FullHdWebDl => "1080p WEB-DL",
            Quality::HdBluray => "720p BluRay",
            Quality::FullHdBluray => "1080p BluRay",
            Quality::Uhd4kTv => "4K UHD TV",
            Quality::Uhd4kWebDl => "4K UHD WEB-DL",
            Quality::Uhd4kBluray => "4K UHD BluRay",
            Quality::Unknown => "Unknown",
        }
    }
}

/// A packed allowed+preferred quality pair as stored on a show.
///
/// Low 16 bits: allowed bitmask. High 16 bits: preferred bitmask. Always
/// unpack with [`split`](Self::split) before comparing against episode
/// qualities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedQuality(u32);

impl CombinedQuality {
    /// Pack allowed and preferred quality lists into one value.
    pub fn combine(allowed: &[Quality], preferred: &[Quality]) -> Self {
        let mut packed = 0u32;
        for q in allowed {
            packed |= q.as_bits();
        }
        for q in preferred {
            packed |= q.as_bits() << 16;
        }
        CombinedQuality(packed)
    }

    /// Unpack into (allowed, preferred) lists sorted by ascending bit value.
    pub fn split(self) -> (Vec<Quality>, Vec<Quality>) {
        let mut allowed = Vec::new();
        let mut preferred = Vec::new();
        for q in Quality::ALL {
            if self.0 & q.as_bits() != 0 {
                allowed.push(q);
            }
            if self.0 & (q.as_bits() << 16) != 0 {
                preferred.push(q);
            }
        }
        (allowed, preferred)
    }

    /// A combined value is valid iff every set bit maps onto a canonical
    /// quality in either word.
    pub fn is_valid(self) -> bool {
        let mut remainder = self.0;
        for q in Quality::ALL {
            remainder &= !q.as_bits();
            remainder &= !(q.as_bits() << 16);
        }
        remainder == 0
    }

    /// Raw packed value, for persistence.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Rehydrate a persisted packed value without validation.
    pub fn from_raw(raw: u32) -> Self {
        CombinedQuality(raw)
    }
}
