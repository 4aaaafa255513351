//! Generic extractor driven by a [`SourceProfile`]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use super::profile::{AddressStrategy, IdFallback, SourceProfile, TargetPage, TitleSource};
use super::text;
use super::{Extraction, Extractor, TargetFailure};
use crate::error::{Result, ScrapeError};
use crate::fetcher::PageFetcher;
use crate::models::{PropertyType, ScrapedProperty};

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

enum CompiledTitle {
    Selector(Selector),
    ImageAlt,
    AnchorTitle,
    FirstTextLine,
}

/// Extractor executing one [`SourceProfile`] against live or stubbed pages
pub struct SiteExtractor {
    profile: &'static SourceProfile,
    fetcher: Arc<dyn PageFetcher>,
    candidates: Vec<Selector>,
    container: Option<Selector>,
    titles: Vec<CompiledTitle>,
    images: Vec<Selector>,
    anchor: Selector,
    img: Selector,
    address: Regex,
}

impl SiteExtractor {
    /// Compile the profile's selectors and address pattern
    pub fn new(profile: &'static SourceProfile, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        let candidates = profile
            .candidate_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>>>()?;
        let container = profile.container_selector.map(compile).transpose()?;
        let titles = profile
            .title_sources
            .iter()
            .map(|source| {
                Ok(match source {
                    TitleSource::Selector(s) => CompiledTitle::Selector(compile(s)?),
                    TitleSource::ImageAlt => CompiledTitle::ImageAlt,
                    TitleSource::AnchorTitle => CompiledTitle::AnchorTitle,
                    TitleSource::FirstTextLine => CompiledTitle::FirstTextLine,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let images = profile
            .image_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            profile,
            fetcher,
            candidates,
            container,
            titles,
            images,
            anchor: compile("a[href]")?,
            img: compile("img")?,
            address: text::address_pattern(profile.address_prefectures)?,
        })
    }

    /// Profile this extractor runs
    #[must_use]
    pub fn profile(&self) -> &'static SourceProfile {
        self.profile
    }

    /// Parse one fetched page into records, deduplicated within the page
    #[must_use]
    pub fn parse_page(&self, html: &str, page_url: &Url, target: &TargetPage) -> Vec<ScrapedProperty> {
        let document = Html::parse_document(html);

        let Some(candidates) = self
            .candidates
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
        else {
            debug!(source = self.profile.source, url = %page_url, "No listing candidates on page");
            return Vec::new();
        };

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter_map(|element| self.extract_candidate(element, page_url, target))
            .filter(|record| seen.insert(record.source_id.clone()))
            .collect()
    }

    fn extract_candidate(
        &self,
        element: ElementRef<'_>,
        page_url: &Url,
        target: &TargetPage,
    ) -> Option<ScrapedProperty> {
        let profile = self.profile;
        let container = self.container_of(element);

        let detail_url = self.detail_url(element, page_url)?;
        if !profile.detail_url_markers.is_empty()
            && !profile.detail_url_markers.iter().any(|m| detail_url.as_str().contains(m))
        {
            return None;
        }

        let image_url = self.image_url(container, page_url);
        if let (Some(marker), Some(image)) = (profile.image_skip_marker, image_url.as_deref()) {
            if image.contains(marker) {
                return None;
            }
        }

        let raw_text: String = container.text().collect();
        let name = self.title(element, container, &raw_text)?;
        let content = text::normalize_text(&raw_text);

        let rent = text::parse_rent(&content);
        let address = match profile.address {
            AddressStrategy::LabelledThenToken => text::labelled_address(&content),
            AddressStrategy::PrefectureToken => None,
        }
        .or_else(|| text::find_address(&self.address, &content))
        .unwrap_or_default();
        let prefecture = text::classify_prefecture(&address).to_string();
        let status = profile.status_rules.infer(&content, rent);

        let mut features: Vec<String> = target.features.iter().map(ToString::to_string).collect();
        features.extend(
            profile
                .keyword_features
                .iter()
                .filter(|kf| content.contains(kf.keyword))
                .map(|kf| kf.feature.to_string()),
        );

        let source_id = match text::source_id_from_url(&detail_url) {
            Some(id) => id,
            None => match profile.id_fallback {
                IdFallback::RandomToken => text::random_token(),
                IdFallback::Skip => return None,
            },
        };

        Some(ScrapedProperty {
            source_id,
            source: profile.source.to_string(),
            name,
            address,
            prefecture,
            rent,
            status,
            property_type: PropertyType::GarageHouse,
            image_url,
            detail_url: detail_url.into(),
            features,
        })
    }

    fn container_of<'a>(&self, element: ElementRef<'a>) -> ElementRef<'a> {
        let Some(selector) = &self.container else {
            return element;
        };
        if selector.matches(&element) {
            return element;
        }
        element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| selector.matches(ancestor))
            .unwrap_or(element)
    }

    fn detail_url(&self, element: ElementRef<'_>, page_url: &Url) -> Option<Url> {
        let href = if element.value().name() == "a" {
            element.attr("href")
        } else {
            element.select(&self.anchor).next().and_then(|a| a.attr("href"))
        }
        .map(str::trim)
        .filter(|href| !href.is_empty())?;

        let url = page_url.join(href).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    fn title(&self, element: ElementRef<'_>, container: ElementRef<'_>, raw_text: &str) -> Option<String> {
        let found = self.titles.iter().find_map(|source| {
            let candidate = match source {
                CompiledTitle::Selector(selector) => container
                    .select(selector)
                    .map(|e| text::collapse_whitespace(&e.text().collect::<String>()))
                    .find(|t| !t.is_empty()),
                CompiledTitle::ImageAlt => container
                    .select(&self.img)
                    .next()
                    .and_then(|img| img.attr("alt"))
                    .map(text::collapse_whitespace),
                CompiledTitle::AnchorTitle => element.attr("title").map(text::collapse_whitespace),
                CompiledTitle::FirstTextLine => raw_text
                    .lines()
                    .map(text::collapse_whitespace)
                    .find(|line| !line.is_empty()),
            };
            candidate.filter(|t| !t.is_empty())
        });

        let title = found.or_else(|| self.profile.title_placeholder.map(ToString::to_string))?;
        Some(match self.profile.title_max_chars {
            Some(max) => text::truncate_chars(&title, max),
            None => title,
        })
    }

    fn image_url(&self, container: ElementRef<'_>, page_url: &Url) -> Option<String> {
        let image = self
            .images
            .iter()
            .find_map(|selector| container.select(selector).next())?;
        let raw = self
            .profile
            .image_attributes
            .iter()
            .filter_map(|attribute| image.attr(attribute))
            .map(str::trim)
            .find(|value| !value.is_empty())?;
        page_url.join(raw).ok().map(String::from)
    }
}

#[async_trait]
impl Extractor for SiteExtractor {
    fn source(&self) -> &'static str {
        self.profile.source
    }

    async fn scrape(&self) -> Result<Extraction> {
        let mut extraction = Extraction::new(self.profile.source);
        let mut seen = HashSet::new();

        for target in self.profile.targets {
            extraction.targets_attempted += 1;

            let page_url = match Url::parse(target.url) {
                Ok(url) => url,
                Err(e) => {
                    warn!(source = self.profile.source, url = target.url, error = %e, "Invalid target URL");
                    extraction.failed_targets.push(TargetFailure::new(target.url, e.to_string()));
                    continue;
                }
            };

            let html = match self.fetcher.fetch(target.url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(source = self.profile.source, url = target.url, error = %e, "Failed to fetch target page");
                    extraction.failed_targets.push(TargetFailure::new(target.url, e.to_string()));
                    continue;
                }
            };

            let records = self.parse_page(&html, &page_url, target);
            let found = records.len();
            extraction
                .records
                .extend(records.into_iter().filter(|r| seen.insert(r.source_id.clone())));
            debug!(source = self.profile.source, url = target.url, found, "Parsed target page");
        }

        info!(
            source = self.profile.source,
            records = extraction.records.len(),
            failed_targets = extraction.failed_targets.len(),
            "Extraction finished"
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::profile::{GARAGE110, GARROZZE, TOKYO_GARAGE};
    use crate::fetcher::MockPageFetcher;
    use crate::models::PropertyStatus;

    fn extractor(profile: &'static SourceProfile) -> SiteExtractor {
        SiteExtractor::new(profile, Arc::new(MockPageFetcher::new())).unwrap()
    }

    fn page(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_all_profiles_compile() {
        for source in crate::extract::Source::ALL {
            assert!(SiteExtractor::new(source.profile(), Arc::new(MockPageFetcher::new())).is_ok());
        }
    }

    #[test]
    fn test_relative_links_resolve_against_page() {
        let html = r#"<div class="article item"><a href="/house/a12/"><h3>Loft</h3><img src="img/a12.jpg"></a></div>"#;
        let records = extractor(&GARROZZE).parse_page(html, &page("https://garrozze.com/"), &GARROZZE.targets[0]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].detail_url, "https://garrozze.com/house/a12/");
        assert_eq!(records[0].image_url.as_deref(), Some("https://garrozze.com/img/a12.jpg"));
        assert_eq!(records[0].source_id, "a12");
    }

    #[test]
    fn test_candidate_without_link_is_skipped() {
        let html = "<article><h2>No link here</h2><p>98,000円</p></article>";
        let records = extractor(&GARAGE110).parse_page(html, &page("https://garage110.com/"), &GARAGE110.targets[0]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_random_token_when_link_has_no_segment() {
        let html = r#"<article><a href="https://garage110.com/"><h2>Top</h2></a></article>"#;
        let records = extractor(&GARAGE110).parse_page(html, &page("https://garage110.com/"), &GARAGE110.targets[0]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_id.len(), 6);
    }

    #[test]
    fn test_candidate_chain_falls_through_to_article() {
        let html = r#"
            <article>
              <a href="https://tokyo-garage.jp/rent/t-100/">
                <h2>世田谷 ガレージハウス</h2>
              </a>
              <p>賃料 150,000円</p>
            </article>"#;
        let url = page(TOKYO_GARAGE.targets[0].url);
        let records = extractor(&TOKYO_GARAGE).parse_page(html, &url, &TOKYO_GARAGE.targets[0]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PropertyStatus::Available);
        assert_eq!(records[0].features, vec!["ガレージ".to_string()]);
    }
}
