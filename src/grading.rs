use serde::Serialize;
use serde_json::json;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ar,
    Ps,
    Fa,
}

impl Locale {
    pub fn parse(s: &str) -> Option<Locale> {
        match s {
            "en" => Some(Locale::En),
            "ar" => Some(Locale::Ar),
            "ps" => Some(Locale::Ps),
            "fa" => Some(Locale::Fa),
            _ => None,
        }
    }
}

/// One grade tier of an organization's grade table. `order` is the tie-break
/// rank (higher wins when ranges overlap). Soft-deleted rows never reach this
/// struct; callers materialize only live rows.
#[derive(Debug, Clone, Serialize)]
pub struct GradeBand {
    pub id: String,
    pub organization_id: String,
    pub name_en: String,
    pub name_ar: String,
    pub name_ps: String,
    pub name_fa: String,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub order: i64,
    pub is_pass: bool,
}

impl GradeBand {
    pub fn name(&self, locale: Locale) -> &str {
        match locale {
            Locale::En => &self.name_en,
            Locale::Ar => &self.name_ar,
            Locale::Ps => &self.name_ps,
            Locale::Fa => &self.name_fa,
        }
    }
}

/// Both bounds are inclusive: a score exactly at a boundary is classified.
/// Among overlapping matches the highest `order` wins; equal orders fall back
/// to the lexicographically smallest id, so the answer is deterministic.
pub fn match_grade<'a>(percentage: Option<f64>, bands: &'a [GradeBand]) -> Option<&'a GradeBand> {
    let p = percentage?;
    bands
        .iter()
        .filter(|b| b.min_percentage <= p && p <= b.max_percentage)
        .max_by(|a, b| match a.order.cmp(&b.order) {
            Ordering::Equal => b.id.cmp(&a.id),
            other => other,
        })
}

pub fn grade_name<'a>(
    percentage: Option<f64>,
    bands: &'a [GradeBand],
    locale: Locale,
) -> Option<&'a str> {
    match_grade(percentage, bands).map(|b| b.name(locale))
}

pub fn is_pass_at(percentage: Option<f64>, bands: &[GradeBand]) -> Option<bool> {
    match_grade(percentage, bands).map(|b| b.is_pass)
}

/// Wire shape consumed by the reporting layer. Field set is a contract;
/// `name` carries the locale-selected label alongside the four raw variants.
pub fn grade_details(
    percentage: Option<f64>,
    bands: &[GradeBand],
    locale: Locale,
) -> Option<serde_json::Value> {
    match_grade(percentage, bands).map(|b| {
        json!({
            "id": b.id,
            "name": b.name(locale),
            "name_en": b.name_en,
            "name_ar": b.name_ar,
            "name_ps": b.name_ps,
            "name_fa": b.name_fa,
            "min_percentage": b.min_percentage,
            "max_percentage": b.max_percentage,
            "order": b.order,
            "is_pass": b.is_pass,
        })
    })
}

/// 2-decimal rounding is part of the contract: results are compared against
/// band boundaries that are themselves stored to 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn calculate_percentage(obtained: Option<f64>, total: Option<f64>) -> Option<f64> {
    let obtained = obtained?;
    let total = total?;
    if total == 0.0 {
        return None;
    }
    Some(round2(obtained / total * 100.0))
}
