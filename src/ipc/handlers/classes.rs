use crate::ipc::error::ok;
use crate::ipc::helpers::{nullable_id, required_name, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::views;
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let school_year_id = match nullable_id(req, "schoolYearId") {
        Ok(Some(id)) => Some(id),
        Ok(None) => store.current_school_year().map(str::to_string),
        Err(e) => return e,
    };
    let Some(school_year_id) = school_year_id else {
        return ok(&req.id, json!({ "schoolYearId": null, "classes": [] }));
    };

    let doc = store.document();
    let current = store.current_class();
    let classes: Vec<serde_json::Value> = views::classes_of(doc, &school_year_id)
        .into_iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "current": current == Some(c.id.as_str()),
                "createdAt": c.created_at,
                "subjectCount": views::count_subjects(doc, &c.id),
            })
        })
        .collect();
    ok(
        &req.id,
        json!({ "schoolYearId": school_year_id, "classes": classes }),
    )
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_name(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    // Without a current school year this is a no-op and classId is null.
    let class_id = store.add_class(&name);
    ok(&req.id, json!({ "classId": class_id, "name": name }))
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
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
    let updated = store.update_class(&class_id, &name);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.delete_class(&class_id);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_classes_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match nullable_id(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.set_current_class(class_id.as_deref());
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        "classes.select" => Some(handle_classes_select(state, req)),
        _ => None,
    }
}
