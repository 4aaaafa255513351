mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{property, temp_database};
use garage_house_scraper::models::{NewScrapeLog, PropertyStatus, ScrapeLogStatus, UpsertOutcome, UpsertSummary};
use garage_house_scraper::{PropertyRepository, SqlitePropertyRepository};

#[test]
fn test_database_creation_and_initialization() {
    let (_dir, db) = temp_database();
    let _conn = db.get_connection().expect("Failed to get database connection");
    assert_eq!(db.count_properties().unwrap(), 0);
}

#[test]
fn test_reopening_existing_database() {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("nested/dir/store.db").display());

    let first = garage_house_scraper::Database::new(&url).unwrap();
    first.upsert_property(&property("garrozze", "gz-1"), Utc::now()).unwrap();
    drop(first);

    let second = garage_house_scraper::Database::new(&url).unwrap();
    assert_eq!(second.count_properties().unwrap(), 1);
}

#[test]
fn test_insert_sets_both_timestamps() {
    let (_dir, db) = temp_database();
    let seen_at = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();

    let outcome = db.upsert_property(&property("tokyo-garage", "tg-1"), seen_at).unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);

    let stored = db.get_property("tokyo-garage", "tg-1").unwrap().expect("row exists");
    assert_eq!(stored.first_seen_at, seen_at);
    assert_eq!(stored.last_seen_at, seen_at);
    assert_eq!(stored.features, vec!["ガレージ"]);
    assert!(!stored.id.is_empty());
}

#[test]
fn test_upsert_is_idempotent() {
    let (_dir, db) = temp_database();
    let first_seen = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
    let second_seen = first_seen + Duration::hours(6);
    let record = property("garrozze", "gz-801");

    assert_eq!(db.upsert_property(&record, first_seen).unwrap(), UpsertOutcome::Inserted);
    let inserted = db.get_property("garrozze", "gz-801").unwrap().unwrap();

    assert_eq!(db.upsert_property(&record, second_seen).unwrap(), UpsertOutcome::Updated);
    let updated = db.get_property("garrozze", "gz-801").unwrap().unwrap();

    assert_eq!(db.count_properties().unwrap(), 1);
    assert_eq!(updated.id, inserted.id);
    assert_eq!(updated.first_seen_at, first_seen);
    assert_eq!(updated.last_seen_at, second_seen);
}

#[test]
fn test_write_once_fields_survive_updates() {
    let (_dir, db) = temp_database();
    let first_seen = Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap();
    db.upsert_property(&property("tokyo-garage", "tg-7"), first_seen).unwrap();

    let mut changed = property("tokyo-garage", "tg-7");
    changed.name = "世田谷 ガレージハウス (改装済)".to_string();
    changed.rent = Some(162_000);
    changed.status = PropertyStatus::Occupied;
    changed.image_url = None;
    changed.address = "神奈川県横浜市".to_string();
    changed.prefecture = "神奈川県".to_string();
    changed.detail_url = "https://example.jp/rent/tg-7-renamed/".to_string();
    changed.features = vec!["バイク推奨".to_string()];
    db.upsert_property(&changed, first_seen + Duration::days(1)).unwrap();

    let stored = db.get_property("tokyo-garage", "tg-7").unwrap().unwrap();
    // Refreshed fields
    assert_eq!(stored.name, "世田谷 ガレージハウス (改装済)");
    assert_eq!(stored.rent, Some(162_000));
    assert_eq!(stored.status, PropertyStatus::Occupied);
    assert_eq!(stored.image_url, None);
    // Write-once fields
    assert_eq!(stored.address, "東京都世田谷区砧");
    assert_eq!(stored.prefecture, "東京都");
    assert_eq!(stored.detail_url, "https://example.jp/rent/tg-7/");
    assert_eq!(stored.features, vec!["ガレージ"]);
    assert_eq!(stored.first_seen_at, first_seen);
}

#[test]
fn test_same_source_id_in_different_sources() {
    let (_dir, db) = temp_database();
    let now = Utc::now();
    assert_eq!(db.upsert_property(&property("garrozze", "101"), now).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(db.upsert_property(&property("garage110", "101"), now).unwrap(), UpsertOutcome::Inserted);
    assert_eq!(db.count_properties().unwrap(), 2);
}

#[test]
fn test_unknown_rent_round_trips_as_none() {
    let (_dir, db) = temp_database();
    let mut record = property("garage110", "g-1");
    record.rent = None;
    record.status = PropertyStatus::Unknown;
    db.upsert_property(&record, Utc::now()).unwrap();

    let stored = db.get_property("garage110", "g-1").unwrap().unwrap();
    assert_eq!(stored.rent, None);
    assert_eq!(stored.status, PropertyStatus::Unknown);
}

#[test]
fn test_missing_property_is_none() {
    let (_dir, db) = temp_database();
    assert!(db.get_property("garrozze", "nope").unwrap().is_none());
}

#[test]
fn test_scrape_logs_are_append_only_newest_first() {
    let (_dir, db) = temp_database();
    let now = Utc::now();
    db.add_scrape_log(&NewScrapeLog::success("tokyo-garage", 4), now).unwrap();
    db.add_scrape_log(&NewScrapeLog::error("garagehouse-biz"), now).unwrap();
    db.add_scrape_log(&NewScrapeLog::success("garrozze", 2), now).unwrap();

    let logs = db.recent_scrape_logs(10).unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].source, "garrozze");
    assert_eq!(logs[1].status, ScrapeLogStatus::Error);
    assert_eq!(logs[1].count, 0);
    assert_eq!(logs[2].count, 4);

    assert_eq!(db.recent_scrape_logs(1).unwrap().len(), 1);
}

#[tokio::test]
async fn test_repository_batch_summary() {
    let (_dir, db) = temp_database();
    db.upsert_property(&property("garrozze", "gz-1"), Utc::now() - Duration::days(2))
        .unwrap();
    let repository = SqlitePropertyRepository::new(db.clone());

    let summary = repository
        .upsert_batch(&[property("garrozze", "gz-1"), property("garrozze", "gz-2")])
        .await
        .unwrap();
    assert_eq!(summary, UpsertSummary { inserted: 1, updated: 1 });

    let refreshed = db.get_property("garrozze", "gz-1").unwrap().unwrap();
    assert!(refreshed.last_seen_at > refreshed.first_seen_at);
}

#[tokio::test]
async fn test_repository_records_scrape_log() {
    let (_dir, db) = temp_database();
    let repository = SqlitePropertyRepository::new(db.clone());

    repository
        .record_scrape_log(NewScrapeLog::success("garrozze", 2))
        .await
        .unwrap();

    let logs = db.recent_scrape_logs(5).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ScrapeLogStatus::Success);
    assert_eq!(logs[0].count, 2);
}
