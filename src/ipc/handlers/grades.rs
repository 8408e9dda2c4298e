use crate::calc::GradeBand;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    grade_date, grade_value, nullable_id, optional_str, required_str, store_mut, store_ref,
};
use crate::ipc::types::{AppState, Request};
use crate::model::number;
use crate::views;
use serde_json::json;

struct GradeInput {
    value: f64,
    date: String,
    comment: String,
}

fn parse_grade_input(req: &Request) -> Result<GradeInput, serde_json::Value> {
    Ok(GradeInput {
        value: grade_value(req)?,
        date: grade_date(req)?,
        comment: optional_str(req, "comment").unwrap_or_default(),
    })
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
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
        return ok(&req.id, json!({ "subjectId": null, "grades": [] }));
    };

    let grades: Vec<serde_json::Value> = views::entries_of_subject(store.document(), &subject_id)
        .into_iter()
        .map(|n| {
            json!({
                "id": n.id,
                "studentId": n.student_id,
                "columnId": n.column_id,
                "value": number::to_json(n.value),
                "band": GradeBand::of(n.value),
                "date": n.date,
                "comment": n.comment,
                "createdAt": n.created_at,
            })
        })
        .collect();
    ok(&req.id, json!({ "subjectId": subject_id, "grades": grades }))
}

fn handle_grades_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let column_id = match required_str(req, "columnId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let input = match parse_grade_input(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let grade_id = store.add_grade_entry(
        &student_id,
        &column_id,
        input.value,
        &input.date,
        &input.comment,
    );
    ok(&req.id, json!({ "gradeId": grade_id }))
}

fn handle_grades_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade_id = match required_str(req, "gradeId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let input = match parse_grade_input(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let updated = store.update_grade_entry(&grade_id, input.value, &input.date, &input.comment);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_grades_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let column_id = match required_str(req, "columnId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let input = match parse_grade_input(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let (grade_id, created) = store.set_grade(
        &student_id,
        &column_id,
        input.value,
        &input.date,
        &input.comment,
    );
    ok(&req.id, json!({ "gradeId": grade_id, "created": created }))
}

fn handle_grades_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let grade_id = match required_str(req, "gradeId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.delete_grade_entry(&grade_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_grades_list(state, req)),
        "grades.create" => Some(handle_grades_create(state, req)),
        "grades.update" => Some(handle_grades_update(state, req)),
        "grades.set" => Some(handle_grades_set(state, req)),
        "grades.delete" => Some(handle_grades_delete(state, req)),
        _ => None,
    }
}
