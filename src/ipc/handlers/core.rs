use crate::catalog::Catalog;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "rulesSource": if state.rules_from_workspace { "workspace" } else { "embedded" },
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    // A broken rules file must fail the select: silently degrading to the
    // embedded catalog would hide a deployment bug.
    let (catalog, from_workspace) = match Catalog::load_for_workspace(&path) {
        Ok(loaded) => loaded,
        Err(e) => return err(&req.id, "config_invalid", format!("{e:#}"), None),
    };

    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.catalog = catalog;
    state.rules_from_workspace = from_workspace;

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "rulesSource": if from_workspace { "workspace" } else { "embedded" },
        }),
    )
}

/// Re-read the workspace rules file (or fall back to the embedded default if
/// it was removed). This is the explicit cache-invalidation hook for the
/// otherwise-immutable catalog.
fn handle_rules_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(workspace) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match Catalog::load_for_workspace(&workspace) {
        Ok((catalog, from_workspace)) => {
            state.catalog = catalog;
            state.rules_from_workspace = from_workspace;
            ok(
                &req.id,
                json!({
                    "rulesSource": if from_workspace { "workspace" } else { "embedded" },
                    "plans": state.catalog.plan_order(),
                }),
            )
        }
        Err(e) => err(&req.id, "config_invalid", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "rules.reload" => Some(handle_rules_reload(state, req)),
        _ => None,
    }
}
