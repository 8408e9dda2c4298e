use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{nullable_id, required_name, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::model::{number, GradeColumnKind};
use crate::views;
use serde_json::json;

fn parse_kind(req: &Request) -> Result<GradeColumnKind, serde_json::Value> {
    let raw = required_str(req, "kind")?;
    GradeColumnKind::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "kind must be one of schulaufgabe|stegreifaufgabe|muendlich|sonstiges",
            Some(json!({ "kind": raw })),
        )
    })
}

fn handle_grade_columns_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let subject_id = match nullable_id(req, "subjectId") {
        Ok(Some(id)) => Some(id),
        Ok(None) => store.current_subject().map(str::to_string),
        Err(e) => return e,
    };
    let Some(subject_id) = subject_id else {
        return ok(&req.id, json!({ "subjectId": null, "columns": [] }));
    };

    let columns: Vec<serde_json::Value> = views::columns_of(store.document(), &subject_id)
        .into_iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "kind": c.kind.as_str(),
                "kindLabel": c.kind.label(),
                "weight": number::to_json(c.weight),
                "createdAt": c.created_at,
            })
        })
        .collect();
    ok(&req.id, json!({ "subjectId": subject_id, "columns": columns }))
}

fn handle_grade_columns_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_name(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind = match parse_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Any number is accepted here; the store coerces it to a positive integer.
    let weight = match req.params.get("weight") {
        None => 1.0,
        Some(v) if v.is_null() => 1.0,
        Some(v) => match v.as_f64() {
            Some(w) => w,
            None => return err(&req.id, "bad_params", "weight must be a number", None),
        },
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let column_id = store.add_grade_column(&name, kind, weight);
    let stored_weight = column_id
        .as_deref()
        .and_then(|id| views::find_column(store.document(), id))
        .map(|c| number::to_json(c.weight));
    ok(
        &req.id,
        json!({ "columnId": column_id, "weight": stored_weight }),
    )
}

fn handle_grade_columns_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let column_id = match required_str(req, "columnId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_name(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let kind = match parse_kind(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Stored as given, without the coercion applied on create.
    let Some(weight) = req.params.get("weight").and_then(|v| v.as_f64()) else {
        return err(&req.id, "bad_params", "weight must be a number", None);
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let updated = store.update_grade_column(&column_id, &name, kind, weight);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_grade_columns_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let column_id = match required_str(req, "columnId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.delete_grade_column(&column_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradeColumns.list" => Some(handle_grade_columns_list(state, req)),
        "gradeColumns.create" => Some(handle_grade_columns_create(state, req)),
        "gradeColumns.update" => Some(handle_grade_columns_update(state, req)),
        "gradeColumns.delete" => Some(handle_grade_columns_delete(state, req)),
        _ => None,
    }
}
