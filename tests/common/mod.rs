//! Shared helpers for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use garage_house_scraper::error::{Result, ScrapeError};
use garage_house_scraper::models::{PropertyStatus, PropertyType, ScrapedProperty};
use garage_house_scraper::{Database, PageFetcher};
use tempfile::TempDir;

pub const TOKYO_GARAGE_CHINTAI: &str = include_str!("../fixtures/tokyo_garage_chintai.html");
pub const TOKYO_GARAGE_BIKE: &str = include_str!("../fixtures/tokyo_garage_bike.html");
pub const GARAGEHOUSE_BIZ: &str = include_str!("../fixtures/garagehouse_biz.html");
pub const GARAGE110: &str = include_str!("../fixtures/garage110.html");
pub const GARROZZE: &str = include_str!("../fixtures/garrozze.html");

/// Serves canned pages; any other URL fails with HTTP 404
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages.get(url).cloned().ok_or_else(|| ScrapeError::HttpStatus {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Fresh database in a temporary directory; keep the `TempDir` alive
pub fn temp_database() -> (TempDir, Database) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let url = format!("sqlite://{}", dir.path().join("garage_houses.db").display());
    let database = Database::new(&url).expect("Failed to create database");
    (dir, database)
}

/// Minimal available listing for persistence tests
pub fn property(source: &str, source_id: &str) -> ScrapedProperty {
    ScrapedProperty {
        source_id: source_id.to_string(),
        source: source.to_string(),
        name: format!("Listing {source_id}"),
        address: "東京都世田谷区砧".to_string(),
        prefecture: "東京都".to_string(),
        rent: Some(150_000),
        status: PropertyStatus::Available,
        property_type: PropertyType::GarageHouse,
        image_url: Some(format!("https://example.jp/img/{source_id}.jpg")),
        detail_url: format!("https://example.jp/rent/{source_id}/"),
        features: vec!["ガレージ".to_string()],
    }
}
