use crate::backup;
use crate::ids;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_str, selection_json, store_mut, store_ref};
use crate::ipc::types::{AppState, Request};
use log::{info, warn};
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_suggest_file_name(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({ "fileName": backup::suggested_file_name(&ids::today()) }),
    )
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let store = match store_ref(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    store.flush();

    match backup::export_document(store.document(), &out_path) {
        Ok(summary) => {
            info!(
                "event=backup_export module=backup status=ok path={}",
                summary.path.to_string_lossy()
            );
            ok(
                &req.id,
                json!({
                    "path": summary.path.to_string_lossy(),
                    "counts": summary.counts,
                }),
            )
        }
        Err(e) => {
            warn!(
                "event=backup_export module=backup status=error path={} error={:#}",
                out_path.to_string_lossy(),
                e
            );
            err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path.to_string_lossy() })),
            )
        }
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match required_str(req, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let store = match store_mut(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let doc = match backup::read_import_file(&in_path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                "event=backup_import module=backup status=rejected path={} error={}",
                in_path.to_string_lossy(),
                e
            );
            return err(
                &req.id,
                e.code(),
                e.to_string(),
                Some(json!({ "path": in_path.to_string_lossy() })),
            );
        }
    };

    store.replace_document(doc);
    info!(
        "event=backup_import module=backup status=ok path={}",
        in_path.to_string_lossy()
    );
    ok(
        &req.id,
        json!({
            "counts": store.document().counts(),
            "selection": selection_json(&store.selection()),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.suggestFileName" => Some(handle_backup_suggest_file_name(state, req)),
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
