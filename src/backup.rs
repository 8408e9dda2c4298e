use anyhow::Context;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{Document, DocumentCounts, COLLECTION_KEYS};

pub const BACKUP_FILE_PREFIX: &str = "notenmeister-backup";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub counts: DocumentCounts,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read backup {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("backup is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("backup must be a JSON object")]
    NotAnObject,
    #[error("backup is missing collections: {}", .0.join(", "))]
    MissingCollections(Vec<&'static str>),
    #[error("backup collections have an unexpected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::Read { .. } => "io_failed",
            _ => "bad_backup",
        }
    }
}

/// `notenmeister-backup-YYYY-MM-DD.json`
pub fn suggested_file_name(date: &str) -> String {
    format!("{BACKUP_FILE_PREFIX}-{date}.json")
}

pub fn export_document(doc: &Document, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let body = serde_json::to_string_pretty(doc).context("failed to serialize document")?;
    let mut out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    out_file
        .write_all(body.as_bytes())
        .context("failed to write backup")?;
    out_file.flush().context("failed to flush backup")?;

    Ok(ExportSummary {
        path: out_path.to_path_buf(),
        counts: doc.counts(),
    })
}

/// Reads a backup file. Only the presence of the six collections is checked;
/// entity contents are taken as they are.
pub fn read_import_file(in_path: &Path) -> Result<Document, ImportError> {
    let text = std::fs::read_to_string(in_path).map_err(|source| ImportError::Read {
        path: in_path.to_string_lossy().to_string(),
        source,
    })?;
    parse_import(&text)
}

pub fn parse_import(text: &str) -> Result<Document, ImportError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let Some(obj) = value.as_object() else {
        return Err(ImportError::NotAnObject);
    };
    let missing: Vec<&'static str> = COLLECTION_KEYS
        .iter()
        .copied()
        .filter(|key| obj.get(*key).map(|v| v.is_null()).unwrap_or(true))
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingCollections(missing));
    }
    serde_json::from_value(value).map_err(ImportError::Shape)
}
