//! CSV 导出集成测试

use chrono::{Duration, TimeZone, Utc};
use clinic_audit::{
    models::{LogFilters, SortField, SortOrder, SortSpec},
    repository::{MemoryAuditStore, StaticRoleLookup},
    services::{export::EXPORT_HEADERS, AuditService, FallbackLog},
};
use std::sync::Arc;

mod common;
use common::*;

const PSY: (&str, &str, &str) = (PSYCHOMETRICIAN_ID, PSYCHOMETRICIAN_EMAIL, "psychometrician");

fn read_csv(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_export_rows_parse_back() {
    let harness = create_harness();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    let mut event = stored_event(PSY, "print", "success", at);
    event.resource_kind = Some("report".to_string());
    event.resource_id = Some("r-7".to_string());
    event.description = "Printed \"Final\" report, page 1\nsecond line".to_string();
    event.ip_address = Some("203.0.113.7".to_string());
    harness.store.push_raw(event).await;

    let csv = harness
        .service
        .export_csv(&LogFilters::default(), SortSpec::default())
        .await
        .unwrap();
    let (headers, rows) = read_csv(&csv);

    assert_eq!(headers, EXPORT_HEADERS.to_vec());
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        [
            at.to_rfc3339().as_str(),
            PSYCHOMETRICIAN_EMAIL,
            "psychometrician",
            "print",
            "report",
            "r-7",
            "Printed \"Final\" report, page 1\nsecond line",
            "success",
            "203.0.113.7",
        ]
    );
}

#[tokio::test]
async fn test_export_applies_filters() {
    let harness = create_harness();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    harness.store.push_raw(stored_event(PSY, "print", "success", at)).await;
    harness.store.push_raw(stored_event(PSY, "login", "success", at)).await;

    let csv = harness
        .service
        .export_csv(
            &LogFilters {
                action_kind: Some("login".to_string()),
                ..Default::default()
            },
            SortSpec::default(),
        )
        .await
        .unwrap();

    let (_, rows) = read_csv(&csv);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][3], "login");
}

#[tokio::test]
async fn test_export_respects_sort() {
    let harness = create_harness();
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    for (i, action) in ["login", "view", "print"].into_iter().enumerate() {
        harness
            .store
            .push_raw(stored_event(PSY, action, "success", base + Duration::minutes(i as i64)))
            .await;
    }

    let newest_first = harness
        .service
        .export_csv(&LogFilters::default(), SortSpec::default())
        .await
        .unwrap();
    let actions: Vec<_> = read_csv(&newest_first).1.into_iter().map(|r| r[3].clone()).collect();
    assert_eq!(actions, ["print", "view", "login"]);

    let by_action = harness
        .service
        .export_csv(
            &LogFilters::default(),
            SortSpec {
                field: SortField::ActionKind,
                order: SortOrder::Asc,
            },
        )
        .await
        .unwrap();
    let actions: Vec<_> = read_csv(&by_action).1.into_iter().map(|r| r[3].clone()).collect();
    assert_eq!(actions, ["login", "print", "view"]);
}

#[tokio::test]
async fn test_export_row_cap() {
    let store = Arc::new(MemoryAuditStore::new());
    let service = AuditService::new(
        store.clone(),
        Arc::new(StaticRoleLookup::new()),
        Arc::new(FallbackLog::new(10)),
    )
    .with_export_limit(2);

    let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    for i in 0..3 {
        store
            .push_raw(stored_event(PSY, "view", "success", base + Duration::minutes(i)))
            .await;
    }

    let csv = service
        .export_csv(&LogFilters::default(), SortSpec::default())
        .await
        .unwrap();
    let (_, rows) = read_csv(&csv);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], (base + Duration::minutes(2)).to_rfc3339());
}

#[tokio::test]
async fn test_export_empty_has_header_only() {
    let harness = create_harness();

    let csv = harness
        .service
        .export_csv(&LogFilters::default(), SortSpec::default())
        .await
        .unwrap();

    assert_eq!(csv, format!("{}\n", EXPORT_HEADERS.join(",")));
}

#[tokio::test]
async fn test_export_store_failure() {
    let harness = create_harness();
    harness.store.set_offline(true);

    assert!(harness
        .service
        .export_csv(&LogFilters::default(), SortSpec::default())
        .await
        .is_err());
}
