mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{property, temp_database};
use garage_house_scraper::listing::{render_table, write_csv};
use garage_house_scraper::models::{ListingQuery, PropertyStatus};
use garage_house_scraper::Database;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
}

/// Five listings seen an hour apart; `p5` is the most recent
fn seeded() -> (tempfile::TempDir, Database) {
    let (dir, db) = temp_database();
    let rows = [
        ("p1", Some(80_000), "東京都", PropertyStatus::Available),
        ("p2", Some(120_000), "神奈川県", PropertyStatus::Occupied),
        ("p3", None, "東京都", PropertyStatus::Unknown),
        ("p4", Some(150_000), "千葉県", PropertyStatus::Available),
        ("p5", Some(98_000), "東京都", PropertyStatus::Occupied),
    ];
    for (i, (id, rent, prefecture, status)) in rows.into_iter().enumerate() {
        let mut record = property("tokyo-garage", id);
        record.rent = rent;
        record.prefecture = prefecture.to_string();
        record.status = status;
        let hours = i64::try_from(i).unwrap();
        db.upsert_property(&record, base_time() + Duration::hours(hours)).unwrap();
    }
    (dir, db)
}

fn ids(db: &Database, query: &ListingQuery, page_size: usize) -> Vec<String> {
    db.list_properties(query, page_size)
        .unwrap()
        .items
        .into_iter()
        .map(|p| p.source_id)
        .collect()
}

#[test]
fn test_unfiltered_listing_is_most_recent_first() {
    let (_dir, db) = seeded();
    assert_eq!(ids(&db, &ListingQuery::default(), 12), vec!["p5", "p4", "p3", "p2", "p1"]);
}

#[test]
fn test_rent_bounds_are_inclusive_and_skip_unknown_rent() {
    let (_dir, db) = seeded();
    let query = ListingQuery {
        min_rent: Some(98_000),
        max_rent: Some(150_000),
        ..ListingQuery::default()
    };
    assert_eq!(ids(&db, &query, 12), vec!["p5", "p4", "p2"]);

    let only_min = ListingQuery {
        min_rent: Some(0),
        ..ListingQuery::default()
    };
    assert!(!ids(&db, &only_min, 12).contains(&"p3".to_string()));
}

#[test]
fn test_prefecture_is_exact_match() {
    let (_dir, db) = seeded();
    let query = ListingQuery {
        prefecture: Some("東京都".to_string()),
        ..ListingQuery::default()
    };
    assert_eq!(ids(&db, &query, 12), vec!["p5", "p3", "p1"]);
}

#[test]
fn test_available_filter_only_excludes_occupied() {
    let (_dir, db) = seeded();
    let query = ListingQuery::from_pairs([("status", "available")]);
    assert_eq!(ids(&db, &query, 12), vec!["p4", "p3", "p1"]);
}

#[test]
fn test_filters_combine() {
    let (_dir, db) = seeded();
    let query = ListingQuery::from_query_string("prefecture=%E6%9D%B1%E4%BA%AC%E9%83%BD&status=available&maxRent=100000");
    assert_eq!(ids(&db, &query, 12), vec!["p1"]);
}

#[test]
fn test_pagination() {
    let (_dir, db) = seeded();

    let first = db.list_properties(&ListingQuery::default(), 2).unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.page, 1);
    assert_eq!(first.items.len(), 2);

    let last = db
        .list_properties(&ListingQuery::from_pairs([("page", "3")]), 2)
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].source_id, "p1");

    let beyond = db
        .list_properties(&ListingQuery::from_pairs([("page", "9")]), 2)
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 5);
}

#[test]
fn test_update_moves_listing_to_front() {
    let (_dir, db) = seeded();
    db.upsert_property(&property("tokyo-garage", "p1"), base_time() + Duration::days(1))
        .unwrap();
    assert_eq!(ids(&db, &ListingQuery::default(), 1), vec!["p1"]);
}

#[test]
fn test_new_badge_window() {
    let (_dir, db) = seeded();
    let listing = db.get_property("tokyo-garage", "p1").unwrap().unwrap();

    assert!(listing.is_new(base_time() + Duration::days(2)));
    assert!(!listing.is_new(base_time() + Duration::days(4)));
}

#[test]
fn test_csv_output() {
    let (_dir, db) = seeded();
    let page = db.list_properties(&ListingQuery::default(), 12).unwrap();

    let mut buffer = Vec::new();
    write_csv(&page, base_time() + Duration::days(30), &mut buffer).unwrap();
    let csv = String::from_utf8(buffer).unwrap();

    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("source,name,prefecture,address,rent,status,new,detail_url,last_seen_at")
    );
    assert_eq!(lines.count(), 5);
    assert!(csv.contains("¥98,000"));
    assert!(csv.contains("価格未公開"));
}

#[test]
fn test_table_output_mentions_paging() {
    let (_dir, db) = seeded();
    let page = db.list_properties(&ListingQuery::default(), 2).unwrap();
    let table = render_table(&page, base_time());

    assert!(table.contains("Listing p5"));
    assert!(table.ends_with("page 1/3 (5 properties)\n"));
}
