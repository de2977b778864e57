//! Per-term word flags and per-document HTML feature bits

use serde::{Deserialize, Serialize};

/// Where a term occurred in its document; one bit each of the term meta byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WordFlag {
    Title = 0,
    Subjects = 1,
    NamesWords = 2,
    UrlDomain = 3,
    UrlPath = 4,
    Site = 5,
    SiteAdjacent = 6,
    ExternalLink = 7,
}

impl WordFlag {
    pub const ALL: [WordFlag; 8] = [
        WordFlag::Title,
        WordFlag::Subjects,
        WordFlag::NamesWords,
        WordFlag::UrlDomain,
        WordFlag::UrlPath,
        WordFlag::Site,
        WordFlag::SiteAdjacent,
        WordFlag::ExternalLink,
    ];

    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    #[inline]
    pub const fn is_present(self, meta: u8) -> bool {
        meta & self.bit() != 0
    }
}

pub fn encode_word_flags(flags: &[WordFlag]) -> u8 {
    flags.iter().fold(0, |acc, f| acc | f.bit())
}

/// True when a posting carries any relevance signal and belongs in the
/// priority index
#[inline]
pub fn is_priority_term(meta: u8) -> bool {
    meta != 0
}

/// Number of signal flags set; the term frequency used by priority BM25
#[inline]
pub fn signal_count(meta: u8) -> u32 {
    meta.count_ones()
}

/// Detected HTML features, one bit each of the 32-bit features word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HtmlFeature {
    Media = 0,
    Js = 1,
    Affiliate = 2,
    Tracking = 3,
    TrackingAdtech = 4,
    KebabCaseUrl = 5,
    LongUrl = 6,
    Cookies = 7,
    Ads = 8,
    Viewport = 9,
    Cdn = 10,
    ShortDocument = 11,
    Unknown = 31,
}

impl HtmlFeature {
    #[inline]
    pub const fn bit(self) -> u32 {
        1 << self as u8
    }

    #[inline]
    pub const fn is_present(self, features: u32) -> bool {
        features & self.bit() != 0
    }
}

pub fn encode_features(features: &[HtmlFeature]) -> u32 {
    features.iter().fold(0, |acc, f| acc | f.bit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_flags() {
        let meta = encode_word_flags(&[WordFlag::Title, WordFlag::UrlPath]);
        assert_eq!(meta, 0b1_0001);
        assert!(is_priority_term(meta));
        assert!(!is_priority_term(0));
        assert_eq!(signal_count(meta), 2);
        assert!(WordFlag::ALL.iter().all(|f| f.is_present(0xFF)));
    }

    #[test]
    fn test_features() {
        let f = encode_features(&[HtmlFeature::Tracking, HtmlFeature::Ads]);
        assert!(HtmlFeature::Tracking.is_present(f));
        assert!(HtmlFeature::Ads.is_present(f));
        assert!(!HtmlFeature::Cookies.is_present(f));
        assert_eq!(HtmlFeature::Unknown.bit(), 1 << 31);
    }
}
