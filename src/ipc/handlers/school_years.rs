use crate::ipc::error::ok;
use crate::ipc::helpers::{required_name, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::views;
use serde_json::json;

fn handle_school_years_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let doc = store.document();
    let current = store.current_school_year();
    let years: Vec<serde_json::Value> = doc
        .school_years
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "active": s.active,
                "current": current == Some(s.id.as_str()),
                "createdAt": s.created_at,
                "classCount": views::count_classes(doc, &s.id),
            })
        })
        .collect();
    ok(&req.id, json!({ "schoolYears": years }))
}

fn handle_school_years_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_name(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let id = store.add_school_year(&name);
    let active = views::find_school_year(store.document(), &id)
        .map(|s| s.active)
        .unwrap_or(false);
    ok(&req.id, json!({ "schoolYearId": id, "active": active }))
}

fn handle_school_years_set_active(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.set_active_school_year(&id);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_school_years_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "schoolYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.delete_school_year(&id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schoolYears.list" => Some(handle_school_years_list(state, req)),
        "schoolYears.create" => Some(handle_school_years_create(state, req)),
        "schoolYears.setActive" => Some(handle_school_years_set_active(state, req)),
        "schoolYears.delete" => Some(handle_school_years_delete(state, req)),
        _ => None,
    }
}
