//! Filtered, paginated reads of stored properties
//!
//! Queries arrive as `minRent`, `maxRent`, `prefecture`, `status` and `page`
//! pairs. Unparseable numbers are ignored rather than rejected; the page is
//! clamped to at least 1.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, ScrapeError};
use crate::models::{ListingPage, ListingQuery, PersistedProperty, PropertyStatus};

/// Shown in place of a price when rent is unpublished
pub const UNPUBLISHED_RENT: &str = "価格未公開";

impl ListingQuery {
    /// Build a query from key/value pairs, ignoring unknown keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "minRent" => query.min_rent = parse_amount(value),
                "maxRent" => query.max_rent = parse_amount(value),
                "prefecture" if !value.is_empty() => query.prefecture = Some(value.to_string()),
                "status" => query.available_only = value == PropertyStatus::Available.as_str(),
                "page" => query.page = value.parse::<usize>().map_or(1, |page| page.max(1)),
                _ => {}
            }
        }
        query
    }

    /// Parse a URL query string such as `minRent=80000&status=available`
    pub fn from_query_string(query: &str) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()))
    }

    /// True when any rent bound is set
    #[must_use]
    pub const fn has_rent_bounds(&self) -> bool {
        self.min_rent.is_some() || self.max_rent.is_some()
    }
}

fn parse_amount(value: &str) -> Option<i64> {
    value.replace(',', "").parse().ok()
}

/// Rent as displayed to users, e.g. `¥98,000`
#[must_use]
pub fn format_rent(rent: Option<i64>) -> String {
    match rent {
        Some(rent) if rent > 0 => {
            let digits = rent.to_string();
            let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
            for (i, c) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(c);
            }
            format!("¥{grouped}")
        }
        _ => UNPUBLISHED_RENT.to_string(),
    }
}

/// Flat row used for table and CSV output
#[derive(Debug, Serialize)]
pub struct ListingRow<'a> {
    pub source: &'a str,
    pub name: &'a str,
    pub prefecture: &'a str,
    pub address: &'a str,
    pub rent: String,
    pub status: &'static str,
    pub new: bool,
    pub detail_url: &'a str,
    pub last_seen_at: String,
}

impl<'a> ListingRow<'a> {
    pub fn new(property: &'a PersistedProperty, now: DateTime<Utc>) -> Self {
        Self {
            source: &property.source,
            name: &property.name,
            prefecture: &property.prefecture,
            address: &property.address,
            rent: format_rent(property.rent),
            status: property.status.as_str(),
            new: property.is_new(now),
            detail_url: &property.detail_url,
            last_seen_at: property.last_seen_at.to_rfc3339(),
        }
    }
}

/// Write the page's items as CSV with a header row
pub fn write_csv<W: Write>(page: &ListingPage, now: DateTime<Utc>, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for property in &page.items {
        csv_writer
            .serialize(ListingRow::new(property, now))
            .map_err(|e| ScrapeError::Other(format!("CSV write failed: {e}")))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render the page as a plain-text table
#[must_use]
pub fn render_table(page: &ListingPage, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    for property in &page.items {
        let row = ListingRow::new(property, now);
        let badge = if row.new { " [新着]" } else { "" };
        out.push_str(&format!(
            "{:<16} {:<10} {:>12} {:<9} {}{}\n    {} {}\n    {}\n",
            row.source, row.prefecture, row.rent, row.status, row.name, badge, row.prefecture, row.address, row.detail_url
        ));
    }
    out.push_str(&format!(
        "page {}/{} ({} properties)\n",
        page.page,
        page.total_pages.max(1),
        page.total
    ));
    out
}
