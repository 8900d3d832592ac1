use crate::db;
use crate::grading::{self, GradeBand, Locale};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "no workspace selected"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BandFields {
    name_en: String,
    name_ar: String,
    name_ps: String,
    name_fa: String,
    min_percentage: f64,
    max_percentage: f64,
    order: i64,
    is_pass: bool,
}

fn validate_fields(f: &BandFields) -> Result<(), HandlerErr> {
    for (label, name) in [
        ("nameEn", &f.name_en),
        ("nameAr", &f.name_ar),
        ("namePs", &f.name_ps),
        ("nameFa", &f.name_fa),
    ] {
        if name.trim().is_empty() {
            return Err(HandlerErr::new(
                "bad_params",
                format!("{} must not be empty", label),
            ));
        }
    }
    if !(0.0..=100.0).contains(&f.min_percentage) || !(0.0..=100.0).contains(&f.max_percentage) {
        return Err(HandlerErr {
            code: "bad_params",
            message: "percentages must be between 0 and 100".to_string(),
            details: Some(json!({
                "minPercentage": f.min_percentage,
                "maxPercentage": f.max_percentage,
            })),
        });
    }
    if f.min_percentage > f.max_percentage {
        return Err(HandlerErr::new(
            "bad_params",
            "minPercentage must not exceed maxPercentage",
        ));
    }
    if f.order < 1 {
        return Err(HandlerErr::new("bad_params", "order must be >= 1"));
    }
    Ok(())
}

/// Reject a new range that intersects an existing live band of the same
/// organization. `exclude_id` skips the row being updated.
fn check_overlap(
    conn: &Connection,
    organization_id: &str,
    min: f64,
    max: f64,
    exclude_id: Option<&str>,
) -> Result<(), HandlerErr> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM grade_bands
              WHERE organization_id = ?1 AND deleted_at IS NULL
                AND min_percentage <= ?2 AND max_percentage >= ?3
                AND id != COALESCE(?4, '')
              LIMIT 1",
            rusqlite::params![organization_id, max, min, exclude_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;

    match existing {
        Some(id) => Err(HandlerErr {
            code: "range_overlap",
            message: "percentage range overlaps an existing grade band".to_string(),
            details: Some(json!({ "conflictingBandId": id })),
        }),
        None => Ok(()),
    }
}

fn parse_locale(params: &serde_json::Value) -> Result<Locale, HandlerErr> {
    match params.get("locale").and_then(|v| v.as_str()) {
        None => Ok(Locale::default()),
        Some(s) => Locale::parse(s).ok_or_else(|| {
            HandlerErr::new("bad_params", format!("unknown locale: {}", s))
        }),
    }
}

fn fetch_live_band(conn: &Connection, id: &str) -> Result<GradeBand, HandlerErr> {
    conn.query_row(
        "SELECT id, organization_id, name_en, name_ar, name_ps, name_fa,
                min_percentage, max_percentage, band_order, is_pass
           FROM grade_bands
          WHERE id = ? AND deleted_at IS NULL",
        [id],
        db::band_from_row,
    )
    .optional()
    .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
    .ok_or_else(|| HandlerErr {
        code: "not_found",
        message: "grade band not found".to_string(),
        details: Some(json!({ "id": id })),
    })
}

fn band_json(band: &GradeBand) -> serde_json::Value {
    serde_json::to_value(band).unwrap_or_else(|_| json!({}))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let organization_id = req
        .params
        .get("organizationId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing params.organizationId"))?
        .to_string();
    let fields: BandFields = serde_json::from_value(req.params.clone())
        .map_err(|e| HandlerErr::new("bad_params", e.to_string()))?;
    validate_fields(&fields)?;
    check_overlap(
        conn,
        &organization_id,
        fields.min_percentage,
        fields.max_percentage,
        None,
    )?;

    let band = GradeBand {
        id: Uuid::new_v4().to_string(),
        organization_id,
        name_en: fields.name_en,
        name_ar: fields.name_ar,
        name_ps: fields.name_ps,
        name_fa: fields.name_fa,
        min_percentage: fields.min_percentage,
        max_percentage: fields.max_percentage,
        order: fields.order,
        is_pass: fields.is_pass,
    };
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO grade_bands(
            id, organization_id, name_en, name_ar, name_ps, name_fa,
            min_percentage, max_percentage, band_order, is_pass,
            created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        rusqlite::params![
            band.id,
            band.organization_id,
            band.name_en,
            band.name_ar,
            band.name_ps,
            band.name_fa,
            band.min_percentage,
            band.max_percentage,
            band.order,
            band.is_pass as i64,
            now,
        ],
    )
    .map_err(|e| HandlerErr::new("db_write_failed", e.to_string()))?;

    Ok(json!({ "band": band_json(&band) }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = req
        .params
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing params.id"))?
        .to_string();
    let fields: BandFields = serde_json::from_value(req.params.clone())
        .map_err(|e| HandlerErr::new("bad_params", e.to_string()))?;
    validate_fields(&fields)?;

    let existing = fetch_live_band(conn, &id)?;
    check_overlap(
        conn,
        &existing.organization_id,
        fields.min_percentage,
        fields.max_percentage,
        Some(&id),
    )?;

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE grade_bands
            SET name_en = ?1, name_ar = ?2, name_ps = ?3, name_fa = ?4,
                min_percentage = ?5, max_percentage = ?6, band_order = ?7,
                is_pass = ?8, updated_at = ?9
          WHERE id = ?10 AND deleted_at IS NULL",
        rusqlite::params![
            fields.name_en,
            fields.name_ar,
            fields.name_ps,
            fields.name_fa,
            fields.min_percentage,
            fields.max_percentage,
            fields.order,
            fields.is_pass as i64,
            now,
            id,
        ],
    )
    .map_err(|e| HandlerErr::new("db_write_failed", e.to_string()))?;

    let band = fetch_live_band(conn, &id)?;
    Ok(json!({ "band": band_json(&band) }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = req
        .params
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing params.id"))?;

    // Soft delete only; references elsewhere keep resolving.
    let now = Utc::now().to_rfc3339();
    let affected = conn
        .execute(
            "UPDATE grade_bands SET deleted_at = ?1, updated_at = ?1
              WHERE id = ?2 AND deleted_at IS NULL",
            rusqlite::params![now, id],
        )
        .map_err(|e| HandlerErr::new("db_write_failed", e.to_string()))?;

    if affected == 0 {
        return Err(HandlerErr {
            code: "not_found",
            message: "grade band not found".to_string(),
            details: Some(json!({ "id": id })),
        });
    }
    Ok(json!({ "deleted": true }))
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = require_db(state)?;
    let organization_id = req
        .params
        .get("organizationId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing params.organizationId"))?;

    let bands = db::active_bands(conn, organization_id)
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok(json!({
        "bands": bands.iter().map(band_json).collect::<Vec<_>>()
    }))
}

/// Shared setup for the percentage-lookup methods: organization scope plus an
/// optional percentage (absent or null both mean "no lookup").
fn lookup_bands(
    state: &AppState,
    req: &Request,
) -> Result<(Vec<GradeBand>, Option<f64>), HandlerErr> {
    let conn = require_db(state)?;
    let organization_id = req
        .params
        .get("organizationId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing params.organizationId"))?;
    let percentage = req.params.get("percentage").and_then(|v| v.as_f64());

    let bands = db::active_bands(conn, organization_id)
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok((bands, percentage))
}

fn handle_match(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (bands, percentage) = lookup_bands(state, req)?;
    let matched = grading::match_grade(percentage, &bands).map(band_json);
    Ok(json!({ "grade": matched }))
}

fn handle_details(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let locale = parse_locale(&req.params)?;
    let (bands, percentage) = lookup_bands(state, req)?;
    Ok(json!({ "grade": grading::grade_details(percentage, &bands, locale) }))
}

fn handle_name(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let locale = parse_locale(&req.params)?;
    let (bands, percentage) = lookup_bands(state, req)?;
    Ok(json!({ "name": grading::grade_name(percentage, &bands, locale) }))
}

fn handle_is_pass(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let (bands, percentage) = lookup_bands(state, req)?;
    Ok(json!({ "isPass": grading::is_pass_at(percentage, &bands) }))
}

fn handle_percentage(req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let obtained = req.params.get("obtained").and_then(|v| v.as_f64());
    let total = req.params.get("total").and_then(|v| v.as_f64());
    Ok(json!({ "percentage": grading::calculate_percentage(obtained, total) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "grades.create" => handle_create(state, req),
        "grades.update" => handle_update(state, req),
        "grades.delete" => handle_delete(state, req),
        "grades.list" => handle_list(state, req),
        "grades.match" => handle_match(state, req),
        "grades.details" => handle_details(state, req),
        "grades.name" => handle_name(state, req),
        "grades.isPass" => handle_is_pass(state, req),
        "grades.percentage" => handle_percentage(req),
        _ => return None,
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
