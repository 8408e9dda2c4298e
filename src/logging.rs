//! File logging for the sidecar.
//!
//! stdout carries the IPC replies, so log lines only go to rotating files in
//! the configured directory. The logger is process-wide: the first successful
//! `start` wins and later calls must ask for the same directory and level.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const FILE_BASENAME: &str = "notenmeisterd";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_FILES: usize = 5;
const PANIC_MESSAGE_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLog> = OnceCell::new();

#[derive(Debug, Error)]
pub enum LogError {
    #[error("unknown log level `{0}` (use trace, debug, info, warn or error)")]
    Level(String),
    #[error("log directory must be an absolute path: {}", .0.display())]
    RelativeDir(PathBuf),
    #[error("cannot create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("logger did not start: {0}")]
    Start(#[from] flexi_logger::FlexiLoggerError),
    #[error("already logging to {} at level {level}", dir.display())]
    AlreadyActive { dir: PathBuf, level: LevelFilter },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: LevelFilter,
    dir: PathBuf,
}

struct ActiveLog {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Starts logging into `dir`. Repeating the call with the same arguments is
/// a no-op; a different directory or level is refused.
pub fn start(level: &str, dir: &Path) -> Result<(), LogError> {
    let wanted = LogSettings {
        level: parse_level(level)?,
        dir: absolute_dir(dir)?,
    };
    let active = ACTIVE.get_or_try_init(|| open_log(&wanted))?;
    if active.settings != wanted {
        return Err(LogError::AlreadyActive {
            dir: active.settings.dir.clone(),
            level: active.settings.level,
        });
    }
    Ok(())
}

pub fn active_dir() -> Option<&'static Path> {
    ACTIVE.get().map(|active| active.settings.dir.as_path())
}

fn parse_level(raw: &str) -> Result<LevelFilter, LogError> {
    let lowered = raw.trim().to_ascii_lowercase();
    let name = match lowered.as_str() {
        "warning" => "warn",
        other => other,
    };
    match LevelFilter::from_str(name) {
        Ok(LevelFilter::Off) | Err(_) => Err(LogError::Level(raw.trim().to_string())),
        Ok(level) => Ok(level),
    }
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, LogError> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Err(LogError::RelativeDir(dir.to_path_buf()))
    }
}

fn open_log(settings: &LogSettings) -> Result<ActiveLog, LogError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LogError::CreateDir {
        path: settings.dir.clone(),
        source,
    })?;

    let filter = LogSpecification::builder().default(settings.level).build();
    let handle = Logger::with(filter)
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.clone())
                .basename(FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_FILES),
        )
        .write_mode(WriteMode::Direct)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    log_panics();
    info!(
        "event=app_start module=sidecar status=ok version={} os={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        settings.level,
        settings.dir.to_string_lossy()
    );

    Ok(ActiveLog {
        settings: settings.clone(),
        _handle: handle,
    })
}

/// Chains a hook that records the panic location and message before the
/// default hook prints to stderr. Runs once, from `open_log`.
fn log_panics() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let at = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic module=sidecar status=error at={} message={}",
            at,
            one_line(panic_text(info.payload()), PANIC_MESSAGE_LIMIT)
        );
        previous(info);
    }));
}

fn panic_text(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn one_line(text: &str, limit: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(limit)
        .collect();
    if text.chars().count() > limit {
        format!("{flat}...")
    } else {
        flat
    }
}
