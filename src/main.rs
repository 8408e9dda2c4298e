mod backup;
mod calc;
mod config;
mod ids;
mod ipc;
mod logging;
mod model;
mod persist;
mod report;
mod store;
mod views;

use log::{error, info};
use serde_json::json;
use std::io::{self, BufRead, Write};

fn main() {
    let config = config::AppConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_deref() {
        if let Err(e) = logging::start(&config.log_level, log_dir) {
            eprintln!("notenmeisterd: logging disabled: {e}");
        }
    }

    let data_dir = config.data_dir.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(dir) = data_dir {
        if let Err(e) = state.open_workspace(&dir) {
            // The front end can still pick another directory via workspace.select.
            error!(
                "event=workspace_open module=sidecar status=error path={} error={:#}",
                dir.to_string_lossy(),
                e
            );
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    info!("event=stdin_closed module=sidecar status=ok");
    state.shutdown();
}
