//! 事件记录集成测试

use clinic_audit::models::*;
use serde_json::json;

mod common;
use common::*;

#[tokio::test]
async fn test_record_with_session_stores_event() {
    let harness = create_harness();

    let input = EventInput::new(ActionKind::View, "Viewed MMPI results")
        .resource(ResourceKind::PsychologicalTest, Some("t-42"))
        .details(json!({"test_type": "MMPI"}));

    assert!(harness.service.record(input, &psychometrician_ctx()).await);

    let page = harness.service.query(&QueryOptions::default()).await;
    assert_eq!(page.total_count, 1);

    let event = &page.items[0];
    assert_eq!(event.actor_id, PSYCHOMETRICIAN_ID);
    assert_eq!(event.actor_email, PSYCHOMETRICIAN_EMAIL);
    assert_eq!(event.actor_role, "psychometrician");
    assert_eq!(event.action_kind, "view");
    assert_eq!(event.resource_kind.as_deref(), Some("psychological_test"));
    assert_eq!(event.resource_id.as_deref(), Some("t-42"));
    assert_eq!(event.status, "success");
    assert_eq!(event.severity, "low");
    assert_eq!(event.details["test_type"], "MMPI");
    assert!(event.session_id_hash.is_some());
}

#[tokio::test]
async fn test_record_without_session_returns_false() {
    let harness = create_harness();

    let recorded = harness
        .service
        .record(
            EventInput::new(ActionKind::Print, "Printed report"),
            &RecordContext::default(),
        )
        .await;

    assert!(!recorded);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_actor_override_used_without_session() {
    let harness = create_harness();

    let input = EventInput::new(ActionKind::Update, "Nightly maintenance")
        .resource(ResourceKind::System, None)
        .actor_override(Actor::new(ADMIN_ID, ADMIN_EMAIL));

    assert!(harness.service.record(input, &RecordContext::default()).await);

    let page = harness.service.query(&QueryOptions::default()).await;
    assert_eq!(page.items[0].actor_email, ADMIN_EMAIL);
    assert_eq!(page.items[0].actor_role, "admin");
    assert!(page.items[0].session_id_hash.is_none());
}

#[tokio::test]
async fn test_unknown_role_when_lookup_fails() {
    let harness = create_harness();
    let ctx = RecordContext::with_session(Actor::new("no-profile", "new.hire@clinic.ph"), None);

    assert!(harness
        .service
        .record(EventInput::new(ActionKind::Login, "Signed in"), &ctx)
        .await);

    let page = harness.service.query(&QueryOptions::default()).await;
    assert_eq!(page.items[0].actor_role, Role::unknown().as_str());
}

#[tokio::test]
async fn test_details_carry_timestamp_and_client_info() {
    let harness = create_harness();

    let mut ctx = psychometrician_ctx();
    ctx.client = ClientInfo {
        user_agent: Some("Mozilla/5.0".to_string()),
        platform: Some("Windows".to_string()),
        language: Some("en-PH".to_string()),
        screen_resolution: Some("1920x1080".to_string()),
        timezone: Some("Asia/Manila".to_string()),
    };

    let input = EventInput::new(ActionKind::Download, "Downloaded report")
        .details(json!({"file": "report.pdf", "timestamp": "spoofed"}));
    assert!(harness.service.record(input, &ctx).await);

    let page = harness.service.query(&QueryOptions::default()).await;
    let details = &page.items[0].details;

    assert_eq!(details["file"], "report.pdf");
    assert_ne!(details["timestamp"], "spoofed");
    let timestamp = details["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    assert_eq!(details["client_info"]["timezone"], "Asia/Manila");
    assert_eq!(details["client_info"]["screen_resolution"], "1920x1080");
    assert_eq!(page.items[0].user_agent.as_deref(), Some("Mozilla/5.0"));
}

#[tokio::test]
async fn test_unparseable_details_stored_as_empty_object() {
    let harness = create_harness();

    let input =
        EventInput::new(ActionKind::Update, "Edited patient").details(json!("{not valid json"));
    assert!(harness.service.record(input, &psychometrician_ctx()).await);

    let page = harness.service.query(&QueryOptions::default()).await;
    let details = page.items[0].details.as_object().unwrap();
    assert!(details.contains_key("timestamp"));
    assert!(details.contains_key("client_info"));
    assert_eq!(details.len(), 2);
}

#[tokio::test]
async fn test_store_failure_returns_false() {
    let harness = create_harness();
    harness.store.set_offline(true);

    let recorded = harness
        .service
        .record(
            EventInput::new(ActionKind::Delete, "Deleted appointment")
                .severity(Severity::High),
            &psychometrician_ctx(),
        )
        .await;

    assert!(!recorded);
}

#[tokio::test]
async fn test_error_report_recorded_as_failed_high() {
    let harness = create_harness();

    let report = ErrorReport {
        message: "TypeError: x is undefined".to_string(),
        stack: Some("at render (app.js:10)".to_string()),
        context: Some(json!({"route": "/patients"})),
    };
    assert!(harness.service.report_error(report, &admin_ctx()).await);

    let page = harness.service.query(&QueryOptions::default()).await;
    let event = &page.items[0];
    assert_eq!(event.action_kind, "error");
    assert_eq!(event.resource_kind.as_deref(), Some("system"));
    assert_eq!(event.status, "failed");
    assert_eq!(event.severity, "high");
    assert_eq!(event.details["context"]["route"], "/patients");
    assert!(harness.service.fallback_entries().await.is_empty());
}

#[tokio::test]
async fn test_fallback_keeps_last_ten_reports() {
    let harness = create_harness();
    harness.store.set_offline(true);

    for i in 0..12 {
        let report = ErrorReport {
            message: format!("error {}", i),
            stack: None,
            context: None,
        };
        assert!(!harness.service.report_error(report, &admin_ctx()).await);
    }

    let entries = harness.service.fallback_entries().await;
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[0].message, "error 2");
    assert_eq!(entries[9].message, "error 11");
    assert_eq!(entries[9].context, json!({}));
}

#[tokio::test]
async fn test_unauthenticated_error_report_goes_to_fallback() {
    let harness = create_harness();

    let report = ErrorReport {
        message: "crash before sign-in".to_string(),
        stack: None,
        context: None,
    };
    assert!(!harness.service.report_error(report, &RecordContext::default()).await);

    let entries = harness.service.fallback_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "crash before sign-in");
}
