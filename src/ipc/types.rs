use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::logging;
use crate::persist::JsonFileGateway;
use crate::store::Gradebook;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: AppConfig,
    pub workspace: Option<PathBuf>,
    pub store: Option<Gradebook>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            workspace: None,
            store: None,
        }
    }

    /// Opens (or re-opens) the gradebook stored in `path`. The previous store
    /// is flushed first and stays selected if the new one cannot be opened.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path)?;
        self.ensure_logging(path);

        if let Some(previous) = &self.store {
            previous.flush();
        }
        let gateway = JsonFileGateway::in_dir(path);
        let data_file = gateway.path().to_path_buf();
        let store = Gradebook::open(Arc::new(gateway))?;
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        info!(
            "event=workspace_open module=ipc status=ok data_file={}",
            data_file.to_string_lossy()
        );
        Ok(())
    }

    fn ensure_logging(&self, data_dir: &Path) {
        if logging::active_dir().is_some() {
            return;
        }
        let Some(log_dir) = self.config.log_dir_for(Some(data_dir)) else {
            return;
        };
        if let Err(e) = logging::start(&self.config.log_level, &log_dir) {
            eprintln!("notenmeisterd: logging disabled: {e}");
        }
    }

    /// Drains pending writes; called once stdin closes.
    pub fn shutdown(&mut self) {
        if let Some(store) = self.store.take() {
            store.flush();
        }
        info!("event=app_shutdown module=ipc status=ok");
    }
}
