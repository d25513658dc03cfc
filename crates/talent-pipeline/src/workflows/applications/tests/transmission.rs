use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::workflows::applications::domain::ApplicationId;
use crate::workflows::applications::memory::InMemoryTransmissionLog;
use crate::workflows::applications::transmission::{
    export_csv, NewTransmission, RecipientCategory, TransmissionLog, TransmissionMethod,
};

fn delivery(application: &str, document: &str, recipient: &str) -> NewTransmission {
    NewTransmission {
        application_id: ApplicationId(application.to_string()),
        document_id: document.to_string(),
        recipient_email: recipient.to_string(),
        recipient_category: RecipientCategory::Client,
        method: TransmissionMethod::Email,
        watermarked: true,
        caption: Some("Transmitted by Talent Pipeline - 03/02/2025 - Confidential".to_string()),
        metadata: json!({ "match_score": 85.0, "processing_type": "AUTO" }),
    }
}

#[test]
fn listings_are_newest_first() {
    let log = InMemoryTransmissionLog::default();
    let first = log
        .log(delivery("app-1", "doc-1", "hiring@acme.test"))
        .expect("logged");
    let second = log
        .log(delivery("app-1", "doc-1", "cto@acme.test"))
        .expect("logged");
    log.log(delivery("app-2", "doc-2", "hiring@acme.test"))
        .expect("logged");

    let entries = log
        .list_for_application(&ApplicationId("app-1".to_string()))
        .expect("listing");
    let ids: Vec<_> = entries.iter().map(|entry| entry.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let by_document = log.list_for_document("doc-2").expect("listing");
    assert_eq!(by_document.len(), 1);
    assert_eq!(by_document[0].application_id.0, "app-2");
}

#[test]
fn delivery_lookup_ignores_recipient_case() {
    let log = InMemoryTransmissionLog::default();
    log.log(delivery("app-1", "doc-1", "Hiring@Acme.test"))
        .expect("logged");

    assert!(log
        .has_been_sent_to("doc-1", "hiring@acme.TEST")
        .expect("lookup"));
    assert!(log
        .has_been_sent_to("doc-1", "  hiring@acme.test ")
        .expect("lookup"));
    assert!(!log
        .has_been_sent_to("doc-2", "hiring@acme.test")
        .expect("lookup"));
    assert!(!log
        .has_been_sent_to("doc-1", "other@acme.test")
        .expect("lookup"));
}

#[test]
fn conditional_log_keeps_the_first_delivery_only() {
    let log = InMemoryTransmissionLog::default();
    let first = log
        .log_if_absent(delivery("app-1", "doc-1", "hiring@acme.test"))
        .expect("logged")
        .expect("first delivery recorded");
    let repeat = log
        .log_if_absent(delivery("app-1", "doc-1", "HIRING@acme.test"))
        .expect("logged");
    assert!(repeat.is_none());

    let other_recipient = log
        .log_if_absent(delivery("app-1", "doc-1", "cto@acme.test"))
        .expect("logged");
    assert!(other_recipient.is_some());

    let entries = log.list_for_document("doc-1").expect("listing");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].id, first.id);
}

#[test]
fn csv_export_has_one_row_per_entry() {
    let sent_at = Utc.with_ymd_and_hms(2025, 2, 3, 9, 30, 0).unwrap();
    let entry = delivery("app-1", "doc-1", "hiring@acme.test").into_entry(sent_at);

    let csv = export_csv(std::slice::from_ref(&entry)).expect("export");
    let mut reader = csv::Reader::from_reader(csv.as_bytes());

    let headers = reader.headers().expect("headers").clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec![
            "id",
            "application_id",
            "document_id",
            "recipient_email",
            "recipient_category",
            "method",
            "watermarked",
            "caption",
            "metadata",
            "sent_at",
        ]
    );

    let rows: Vec<_> = reader.records().collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(&row[0], entry.id.to_string());
    assert_eq!(&row[4], "CLIENT");
    assert_eq!(&row[5], "EMAIL");
    assert_eq!(&row[6], "true");
    let metadata: serde_json::Value = serde_json::from_str(&row[8]).expect("metadata json");
    assert_eq!(metadata["processing_type"], "AUTO");
    assert_eq!(&row[9], "2025-02-03T09:30:00+00:00");
}

#[test]
fn empty_export_still_has_a_header() {
    let csv = export_csv(&[]).expect("export");
    assert_eq!(csv.lines().count(), 1);
    assert!(csv.starts_with("id,application_id,"));
}
