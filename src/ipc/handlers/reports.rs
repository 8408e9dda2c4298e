use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, store_ref};
use crate::ipc::types::{AppState, Request};
use crate::report;
use serde_json::json;
use std::path::PathBuf;

fn handle_reports_subject_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match report::subject_report(store) {
        Some(model) => match serde_json::to_value(&model) {
            Ok(v) => ok(&req.id, v),
            Err(e) => err(&req.id, "io_failed", e.to_string(), None),
        },
        None => ok(&req.id, serde_json::Value::Null),
    }
}

fn handle_reports_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let Some(model) = report::subject_report(store) else {
        return err(&req.id, "bad_params", "select a subject first", None);
    };
    match model.write_csv(&out_path) {
        Ok(row_count) => ok(
            &req.id,
            json!({
                "path": out_path.to_string_lossy(),
                "rowCount": row_count,
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path.to_string_lossy() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.subjectModel" => Some(handle_reports_subject_model(state, req)),
        "reports.exportCsv" => Some(handle_reports_export_csv(state, req)),
        _ => None,
    }
}
