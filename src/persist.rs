//! Whole-document persistence.
//!
//! # Responsibility
//! - Read and write the complete dataset as one JSON file.
//! - Run writes off the request loop on a dedicated worker thread.
//!
//! # Invariants
//! - A write replaces the file atomically (temp file + rename); readers never
//!   observe a half-written document.
//! - Queued snapshots are coalesced: only the newest one is written.
//! - Write failures are logged and dropped. They are never retried.

use anyhow::Context;
use log::{debug, error};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::model::Document;

pub const DATA_FILE_NAME: &str = "notenmeister-data.json";

pub trait DocumentGateway: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> anyhow::Result<Option<Document>>;
    fn save(&self, doc: &Document) -> anyhow::Result<()>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(DATA_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentGateway for JsonFileGateway {
    fn load(&self) -> anyhow::Result<Option<Document>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.to_string_lossy()))?;
        let doc: Document = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid document", self.path.to_string_lossy()))?;
        Ok(Some(doc))
    }

    fn save(&self, doc: &Document) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        let body = serde_json::to_string_pretty(doc).context("failed to serialize document")?;

        let tmp = self.path.with_extension("json.saving");
        fs::write(&tmp, body.as_bytes())
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "failed to move {} to {}",
                tmp.to_string_lossy(),
                self.path.to_string_lossy()
            )
        })?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Saves through the gateway, logging instead of returning the failure.
pub fn save_logged(gateway: &dyn DocumentGateway, doc: &Document) -> bool {
    match gateway.save(doc) {
        Ok(()) => {
            debug!(
                "event=document_save module=persist status=ok target={} entries={}",
                gateway.describe(),
                doc.grade_entries.len()
            );
            true
        }
        Err(e) => {
            error!(
                "event=document_save module=persist status=error target={} error={:#}",
                gateway.describe(),
                e
            );
            false
        }
    }
}

enum Job {
    Save(Box<Document>),
    Flush(Sender<()>),
}

/// Background writer. Dropping it drains the queue and joins the thread.
pub struct Persister {
    tx: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Persister {
    pub fn spawn(gateway: Arc<dyn DocumentGateway>) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("notenmeister-persist".to_string())
            .spawn(move || run_worker(gateway, rx))
            .context("failed to spawn persist worker")?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queues a snapshot and returns immediately.
    pub fn submit(&self, doc: Document) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        if tx.send(Job::Save(Box::new(doc))).is_err() {
            error!("event=document_save module=persist status=error error=worker_gone");
        }
    }

    /// Blocks until every snapshot submitted before this call is written.
    pub fn flush(&self) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(Job::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=persist_worker_join module=persist status=error");
            }
        }
    }
}

fn run_worker(gateway: Arc<dyn DocumentGateway>, rx: Receiver<Job>) {
    while let Ok(first) = rx.recv() {
        let mut latest: Option<Box<Document>> = None;
        let mut acks: Vec<Sender<()>> = Vec::new();
        let mut next = Some(first);
        while let Some(job) = next {
            match job {
                Job::Save(doc) => latest = Some(doc),
                Job::Flush(ack) => acks.push(ack),
            }
            next = rx.try_recv().ok();
        }
        if let Some(doc) = latest {
            save_logged(gateway.as_ref(), &doc);
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory gateway recording every write.
    #[derive(Default)]
    pub struct MemoryGateway {
        pub stored: Mutex<Option<Document>>,
        pub saves: Mutex<usize>,
        pub fail_saves: bool,
        pub fail_loads: bool,
    }

    impl MemoryGateway {
        pub fn with_document(doc: Document) -> Self {
            Self {
                stored: Mutex::new(Some(doc)),
                ..Self::default()
            }
        }

        pub fn stored(&self) -> Option<Document> {
            self.stored.lock().expect("lock").clone()
        }

        pub fn save_count(&self) -> usize {
            *self.saves.lock().expect("lock")
        }
    }

    impl DocumentGateway for MemoryGateway {
        fn load(&self) -> anyhow::Result<Option<Document>> {
            if self.fail_loads {
                anyhow::bail!("simulated read failure");
            }
            Ok(self.stored())
        }

        fn save(&self, doc: &Document) -> anyhow::Result<()> {
            *self.saves.lock().expect("lock") += 1;
            if self.fail_saves {
                anyhow::bail!("simulated write failure");
            }
            *self.stored.lock().expect("lock") = Some(doc.clone());
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}
