//! Per-site extraction settings.
//!
//! Every supported site is described by a [`SourceProfile`]: target pages,
//! selectors, keyword tables and fallbacks. The generic
//! [`SiteExtractor`](super::SiteExtractor) interprets a profile; nothing
//! site-specific lives in code paths.

use std::fmt;
use std::str::FromStr;

use crate::error::ScrapeError;
use crate::models::{PropertyStatus, KANTO_PREFECTURES};

/// A page to fetch, with tags added to every record found on it
#[derive(Debug)]
pub struct TargetPage {
    /// Absolute page URL
    pub url: &'static str,
    /// Feature tags appended to records from this page
    pub features: &'static [&'static str],
}

/// Where a listing title may come from, tried in order
#[derive(Debug, Clone, Copy)]
pub enum TitleSource {
    /// Text of the first non-empty element matching the selector
    Selector(&'static str),
    /// `alt` attribute of the first image
    ImageAlt,
    /// `title` attribute of the candidate element
    AnchorTitle,
    /// First non-empty line of the listing text
    FirstTextLine,
}

/// How the free-text address is located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressStrategy {
    /// Token starting at a prefecture name
    PrefectureToken,
    /// Text after a `所在地` label, else a prefecture token
    LabelledThenToken,
}

/// What to do when a detail URL has no usable path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFallback {
    /// Drop the candidate
    Skip,
    /// Generate a random token
    RandomToken,
}

/// Tag appended when the listing text contains a keyword
#[derive(Debug)]
pub struct KeywordFeature {
    /// Substring searched for
    pub keyword: &'static str,
    /// Tag appended on match
    pub feature: &'static str,
}

/// Keyword-to-status table for one site
#[derive(Debug)]
pub struct StatusRules {
    /// Any of these forces `Occupied`
    pub occupied_keywords: &'static [&'static str],
    /// Any of these implies `Available`
    pub available_keywords: &'static [&'static str],
    /// Status when no keyword matched and no positive rent was parsed
    pub without_rent: PropertyStatus,
}

impl StatusRules {
    /// Infer status from listing text and parsed rent
    #[must_use]
    pub fn infer(&self, text: &str, rent: Option<i64>) -> PropertyStatus {
        if self.occupied_keywords.iter().any(|k| text.contains(k)) {
            PropertyStatus::Occupied
        } else if self.available_keywords.iter().any(|k| text.contains(k)) || rent.is_some_and(|r| r > 0) {
            PropertyStatus::Available
        } else {
            self.without_rent
        }
    }
}

/// Everything needed to extract listings from one site
#[derive(Debug)]
pub struct SourceProfile {
    /// Stable source key stored with every record
    pub source: &'static str,
    /// Site root
    pub base_url: &'static str,
    /// Pages fetched in order
    pub targets: &'static [TargetPage],
    /// Candidate selectors; the first one matching anything is used
    pub candidate_selectors: &'static [&'static str],
    /// Closest ancestor used as the listing container
    pub container_selector: Option<&'static str>,
    /// Detail URL must contain one of these (empty accepts all)
    pub detail_url_markers: &'static [&'static str],
    /// Title sources in priority order
    pub title_sources: &'static [TitleSource],
    /// Title used when every source is empty; `None` skips the candidate
    pub title_placeholder: Option<&'static str>,
    /// Titles longer than this are cut
    pub title_max_chars: Option<usize>,
    /// Image selectors in priority order
    pub image_selectors: &'static [&'static str],
    /// Image attributes in priority order (lazy-load first)
    pub image_attributes: &'static [&'static str],
    /// Candidates whose image URL contains this are navigation, not listings
    pub image_skip_marker: Option<&'static str>,
    /// Address location strategy
    pub address: AddressStrategy,
    /// Prefecture names the address token may start with
    pub address_prefectures: &'static [&'static str],
    /// Status inference table
    pub status_rules: StatusRules,
    /// Text-triggered feature tags
    pub keyword_features: &'static [KeywordFeature],
    /// Identifier fallback policy
    pub id_fallback: IdFallback,
}

const LAZY_THEN_SRC: &[&str] = &["data-src", "src"];

/// tokyo-garage.jp: two category listings, bike category tagged
pub static TOKYO_GARAGE: SourceProfile = SourceProfile {
    source: "tokyo-garage",
    base_url: "https://tokyo-garage.jp",
    targets: &[
        TargetPage {
            url: "https://tokyo-garage.jp/category/chintai/",
            features: &[],
        },
        TargetPage {
            url: "https://tokyo-garage.jp/category/chintai/bike/",
            features: &["バイク推奨"],
        },
    ],
    candidate_selectors: &[
        ".property-list a.property-list__item",
        ".pg-top-newproperty__inner article, .pg-top-newproperty__inner .entry",
        "article",
    ],
    container_selector: None,
    detail_url_markers: &["/rent/", "/indoor-parking/"],
    title_sources: &[
        TitleSource::Selector(".property-list__item__title, h2, h3, .title"),
        TitleSource::ImageAlt,
    ],
    title_placeholder: Some("Tokyo Garage Property"),
    title_max_chars: None,
    image_selectors: &[".property-list__item__figure img", "img"],
    image_attributes: LAZY_THEN_SRC,
    image_skip_marker: Some("nav/property_"),
    address: AddressStrategy::LabelledThenToken,
    address_prefectures: &KANTO_PREFECTURES,
    status_rules: StatusRules {
        occupied_keywords: &["満室", "成約", "終了"],
        available_keywords: &[],
        without_rent: PropertyStatus::Occupied,
    },
    keyword_features: &[KeywordFeature {
        keyword: "ガレージ",
        feature: "ガレージ",
    }],
    id_fallback: IdFallback::Skip,
};

/// garagehouse-biz.jp: cards are anchors into `/list/`
pub static GARAGEHOUSE_BIZ: SourceProfile = SourceProfile {
    source: "garagehouse-biz",
    base_url: "https://garagehouse-biz.jp",
    targets: &[TargetPage {
        url: "https://garagehouse-biz.jp/",
        features: &[],
    }],
    candidate_selectors: &["a[href*=\"/list/\"]"],
    container_selector: None,
    detail_url_markers: &["/list/"],
    title_sources: &[TitleSource::Selector("h3, h4, .title"), TitleSource::FirstTextLine],
    title_placeholder: None,
    title_max_chars: Some(100),
    image_selectors: &["img"],
    image_attributes: LAZY_THEN_SRC,
    image_skip_marker: None,
    address: AddressStrategy::PrefectureToken,
    address_prefectures: &KANTO_PREFECTURES,
    status_rules: StatusRules {
        occupied_keywords: &["満室", "空室待ち"],
        available_keywords: &["募集中"],
        without_rent: PropertyStatus::Unknown,
    },
    keyword_features: &[KeywordFeature {
        keyword: "車",
        feature: "駐車場あり",
    }],
    id_fallback: IdFallback::Skip,
};

/// garage110.com: blog-style articles
pub static GARAGE110: SourceProfile = SourceProfile {
    source: "garage110",
    base_url: "https://garage110.com",
    targets: &[TargetPage {
        url: "https://garage110.com/",
        features: &[],
    }],
    candidate_selectors: &["article, .post, .entry"],
    container_selector: None,
    detail_url_markers: &[],
    title_sources: &[TitleSource::Selector("h2, h3")],
    title_placeholder: None,
    title_max_chars: None,
    image_selectors: &["img"],
    image_attributes: LAZY_THEN_SRC,
    image_skip_marker: None,
    address: AddressStrategy::PrefectureToken,
    address_prefectures: &KANTO_PREFECTURES,
    status_rules: StatusRules {
        occupied_keywords: &["満室", "空待"],
        available_keywords: &[],
        without_rent: PropertyStatus::Unknown,
    },
    keyword_features: &[],
    id_fallback: IdFallback::RandomToken,
};

/// garrozze.com: `.article.item` cards, eager images only
pub static GARROZZE: SourceProfile = SourceProfile {
    source: "garrozze",
    base_url: "https://garrozze.com",
    targets: &[TargetPage {
        url: "https://garrozze.com/",
        features: &[],
    }],
    candidate_selectors: &[".article.item a"],
    container_selector: Some(".article.item"),
    detail_url_markers: &[],
    title_sources: &[TitleSource::Selector("h3"), TitleSource::AnchorTitle],
    title_placeholder: Some("Garage House"),
    title_max_chars: None,
    image_selectors: &["img"],
    image_attributes: &["src"],
    image_skip_marker: None,
    address: AddressStrategy::PrefectureToken,
    address_prefectures: &["東京都", "神奈川県", "千葉県", "埼玉県"],
    status_rules: StatusRules {
        occupied_keywords: &["満室"],
        available_keywords: &[],
        without_rent: PropertyStatus::Unknown,
    },
    keyword_features: &[],
    id_fallback: IdFallback::Skip,
};

/// Supported sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// tokyo-garage.jp
    TokyoGarage,
    /// garagehouse-biz.jp
    GarageHouseBiz,
    /// garage110.com
    Garage110,
    /// garrozze.com
    Garrozze,
}

impl Source {
    /// Every supported site, in session order
    pub const ALL: [Self; 4] = [Self::TokyoGarage, Self::GarageHouseBiz, Self::Garage110, Self::Garrozze];

    /// Profile driving extraction for this site
    #[must_use]
    pub fn profile(self) -> &'static SourceProfile {
        match self {
            Self::TokyoGarage => &TOKYO_GARAGE,
            Self::GarageHouseBiz => &GARAGEHOUSE_BIZ,
            Self::Garage110 => &GARAGE110,
            Self::Garrozze => &GARROZZE,
        }
    }

    /// Stable source key
    #[must_use]
    pub fn key(self) -> &'static str {
        self.profile().source
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.key())
    }
}

impl FromStr for Source {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.key() == s)
            .ok_or_else(|| ScrapeError::UnknownSource(s.to_string()))
    }
}
