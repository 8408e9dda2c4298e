use crate::ipc::error::ok;
use crate::ipc::helpers::{nullable_id, required_name, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::views;
use serde_json::json;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let class_id = match nullable_id(req, "classId") {
        Ok(Some(id)) => Some(id),
        Ok(None) => store.current_class().map(str::to_string),
        Err(e) => return e,
    };
    let Some(class_id) = class_id else {
        return ok(&req.id, json!({ "classId": null, "subjects": [] }));
    };

    let doc = store.document();
    let current = store.current_subject();
    let subjects: Vec<serde_json::Value> = views::subjects_of(doc, &class_id)
        .into_iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "current": current == Some(s.id.as_str()),
                "createdAt": s.created_at,
                "studentCount": views::count_students(doc, &s.id),
                "columnCount": views::count_columns(doc, &s.id),
            })
        })
        .collect();
    ok(&req.id, json!({ "classId": class_id, "subjects": subjects }))
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_name(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let subject_id = store.add_subject(&name);
    ok(&req.id, json!({ "subjectId": subject_id, "name": name }))
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_name(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let updated = store.update_subject(&subject_id, &name);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.delete_subject(&subject_id);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_subjects_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = match nullable_id(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.set_current_subject(subject_id.as_deref());
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.update" => Some(handle_subjects_update(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        "subjects.select" => Some(handle_subjects_select(state, req)),
        _ => None,
    }
}
