use serde_json::json;

use crate::ids;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::{Gradebook, Selection};

pub fn store_ref<'a>(state: &'a AppState, req: &Request) -> Result<&'a Gradebook, serde_json::Value> {
    state
        .store
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn store_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Gradebook, serde_json::Value> {
    state
        .store
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

/// Trimmed, non-empty text parameter (names entered in dialogs).
pub fn required_name(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    let raw = required_str(req, key)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(trimmed.to_string())
}

/// `key` may be a string id, `null`, or absent (both mean "unset").
pub fn nullable_id(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be a string or null", key),
                None,
            )),
        },
    }
}

/// Whole grade on the 1 (best) to 6 scale. Stored documents may still hold
/// fractional values written by other tools.
pub fn grade_value(req: &Request) -> Result<f64, serde_json::Value> {
    let Some(raw) = req.params.get("value") else {
        return Err(err(&req.id, "bad_params", "missing value", None));
    };
    match raw.as_f64() {
        Some(v) if v.fract() == 0.0 && (1.0..=6.0).contains(&v) => Ok(v),
        _ => Err(err(
            &req.id,
            "bad_params",
            "value must be an integer from 1 to 6",
            Some(json!({ "value": raw })),
        )),
    }
}

/// `YYYY-MM-DD`, defaulting to today when absent.
pub fn grade_date(req: &Request) -> Result<String, serde_json::Value> {
    let Some(raw) = optional_str(req, "date") else {
        return Ok(ids::today());
    };
    match ids::parse_date(&raw) {
        Some(d) => Ok(d.format(ids::DATE_FORMAT).to_string()),
        None => Err(err(
            &req.id,
            "bad_params",
            "date must be YYYY-MM-DD",
            Some(json!({ "date": raw })),
        )),
    }
}

pub fn selection_json(selection: &Selection) -> serde_json::Value {
    json!({
        "schoolYearId": selection.school_year,
        "classId": selection.class,
        "subjectId": selection.subject,
    })
}
