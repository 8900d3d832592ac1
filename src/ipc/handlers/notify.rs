use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::notify;
use serde_json::json;

fn event_type<'a>(req: &'a Request) -> Result<&'a str, serde_json::Value> {
    req.params
        .get("eventType")
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", "missing params.eventType", None))
}

fn handle_classify(req: &Request) -> serde_json::Value {
    let event = match event_type(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match notify::classify(event) {
        Ok(c) => ok(
            &req.id,
            json!({
                "eventType": event,
                "severity": c.severity,
                "emailEligible": c.email_eligible,
                "digestible": c.digestible,
            }),
        ),
        Err(e) => err(&req.id, "unknown_event_type", e.to_string(), None),
    }
}

fn handle_delivery_plan(req: &Request) -> serde_json::Value {
    let event = match event_type(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match notify::delivery_plan(event) {
        Ok(p) => ok(
            &req.id,
            json!({
                "eventType": event,
                "inApp": p.in_app,
                "immediateEmail": p.immediate_email,
                "digest": p.digest,
            }),
        ),
        Err(e) => err(&req.id, "unknown_event_type", e.to_string(), None),
    }
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notify.classify" => Some(handle_classify(req)),
        "notify.deliveryPlan" => Some(handle_delivery_plan(req)),
        _ => None,
    }
}
