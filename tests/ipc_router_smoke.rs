mod test_support;

use serde_json::json;
use test_support::{request, request_ok, select_workspace, spawn_sidecar};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("rulesSource").and_then(|v| v.as_str()),
        Some("embedded")
    );

    // Feature and notify methods work before any workspace is selected;
    // they run over static configuration only.
    let plans = request_ok(&mut stdin, &mut reader, "2", "plans.list", json!({}));
    assert_eq!(
        plans["plans"],
        json!(["starter", "pro", "complete", "enterprise"])
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "features.resolve",
        json!({ "plan": "starter" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "notify.classify",
        json!({ "eventType": "student.created" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.percentage",
        json!({ "obtained": 45, "total": 50 }),
    );

    let workspace = select_workspace(&mut stdin, &mut reader, "nazim-router-smoke");
    assert!(workspace.join("nazim.sqlite3").is_file());
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.list",
        json!({ "organizationId": "org-1" }),
    );

    let unknown = request(&mut stdin, &mut reader, "7", "no.such.method", json!({}));
    assert_eq!(unknown["ok"], json!(false));
    assert_eq!(unknown["error"]["code"], json!("not_implemented"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn grade_band_methods_require_a_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "grades.list",
        json!({ "organizationId": "org-1" }),
    );
    assert_eq!(resp["ok"], json!(false));
    assert_eq!(resp["error"]["code"], json!("no_workspace"));

    drop(stdin);
    let _ = child.wait();
}
