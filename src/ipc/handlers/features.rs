use crate::catalog::CatalogError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn catalog_err(id: &str, e: CatalogError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

fn handle_plans_list(state: &AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "plans": state.catalog.plan_order() }))
}

fn handle_features_resolve(state: &AppState, req: &Request) -> serde_json::Value {
    let Some(plan) = req.params.get("plan").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.plan", None);
    };

    match state.catalog.resolve_features_for_plan(plan) {
        // BTreeSet keeps the wire order stable.
        Ok(features) => ok(
            &req.id,
            json!({
                "plan": plan,
                "features": features.iter().collect::<Vec<_>>(),
            }),
        ),
        Err(e) => catalog_err(&req.id, e),
    }
}

fn handle_features_check(state: &AppState, req: &Request) -> serde_json::Value {
    let Some(plan) = req.params.get("plan").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.plan", None);
    };
    let Some(feature) = req.params.get("feature").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.feature", None);
    };

    match state.catalog.has_feature(plan, feature) {
        Ok(enabled) => ok(
            &req.id,
            json!({ "plan": plan, "feature": feature, "enabled": enabled }),
        ),
        Err(e) => catalog_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "plans.list" => Some(handle_plans_list(state, req)),
        "features.resolve" => Some(handle_features_resolve(state, req)),
        "features.check" => Some(handle_features_check(state, req)),
        _ => None,
    }
}
