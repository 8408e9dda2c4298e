use crate::calc::GradeBand;
use crate::ipc::error::ok;
use crate::ipc::helpers::{nullable_id, required_name, required_str, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::views;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
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
        return ok(&req.id, json!({ "subjectId": null, "students": [] }));
    };

    let students: Vec<serde_json::Value> = views::students_of(store.document(), &subject_id)
        .into_iter()
        .map(|s| {
            let average = store.compute_student_average(&s.id);
            json!({
                "id": s.id,
                "firstName": s.first_name,
                "lastName": s.last_name,
                "displayName": s.display_name(),
                "createdAt": s.created_at,
                "average": average,
                "averageBand": average.map(GradeBand::of),
            })
        })
        .collect();
    ok(
        &req.id,
        json!({ "subjectId": subject_id, "students": students }),
    )
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let first_name = match required_name(req, "firstName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let last_name = match required_name(req, "lastName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let student_id = store.add_student(&first_name, &last_name);
    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let first_name = match required_name(req, "firstName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let last_name = match required_name(req, "lastName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let updated = store.update_student(&student_id, &first_name, &last_name);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.delete_student(&student_id);
    ok(&req.id, json!({ "ok": true }))
}

fn handle_students_average(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let average = store.compute_student_average(&student_id);
    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "average": average,
            "band": average.map(GradeBand::of),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.average" => Some(handle_students_average(state, req)),
        _ => None,
    }
}
