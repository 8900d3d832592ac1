mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar};

#[test]
fn overdue_fee_event_is_warning_email_digest() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "notify.classify",
        json!({ "eventType": "fee.assignment.overdue" }),
    );
    assert_eq!(result["severity"], json!("warning"));
    assert_eq!(result["emailEligible"], json!(true));
    assert_eq!(result["digestible"], json!(true));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn classification_covers_every_severity_level() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    for (id, event, severity) in [
        ("1", "student.created", "info"),
        ("2", "library.book_overdue", "warning"),
        ("3", "system.backup_failed", "critical"),
    ] {
        let result = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "notify.classify",
            json!({ "eventType": event }),
        );
        assert_eq!(result["severity"], json!(severity), "{event}");
    }

    // Absence from the email table is false, not an error.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "notify.classify",
        json!({ "eventType": "student.updated" }),
    );
    assert_eq!(result["emailEligible"], json!(false));
    assert_eq!(result["digestible"], json!(false));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unregistered_event_type_is_a_config_error() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "notify.classify",
        json!({ "eventType": "unregistered.event" }),
    );
    assert_eq!(code, "unknown_event_type");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "notify.deliveryPlan",
        json!({ "eventType": "unregistered.event" }),
    );
    assert_eq!(code, "unknown_event_type");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn delivery_plan_suppresses_email_for_digestible_events() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Digestible + email-eligible: batched, no immediate email.
    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "notify.deliveryPlan",
        json!({ "eventType": "fee.assignment.overdue" }),
    );
    assert_eq!(plan["inApp"], json!(true));
    assert_eq!(plan["immediateEmail"], json!(false));
    assert_eq!(plan["digest"], json!(true));

    // Email-eligible only: immediate email.
    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "notify.deliveryPlan",
        json!({ "eventType": "system.backup_failed" }),
    );
    assert_eq!(plan["immediateEmail"], json!(true));
    assert_eq!(plan["digest"], json!(false));

    // Neither: in-app only.
    let plan = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "notify.deliveryPlan",
        json!({ "eventType": "exam.created" }),
    );
    assert_eq!(plan["inApp"], json!(true));
    assert_eq!(plan["immediateEmail"], json!(false));
    assert_eq!(plan["digest"], json!(false));

    drop(stdin);
    let _ = child.wait();
}
