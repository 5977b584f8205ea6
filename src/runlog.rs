use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;

/// Timestamped per-run log written next to the report.
///
/// The log is an output product, not a diagnostic channel: every line also
/// goes to the tracing subscriber, and a write failure downgrades to a warning
/// rather than aborting a run that is otherwise producing results.
pub struct RunLog {
    file: File,
    path: PathBuf,
}

impl RunLog {
    pub fn create(folder: &Path, filename: &str) -> Result<RunLog> {
        let path = folder.join(filename);
        let file = File::create(&path)?;
        Ok(RunLog { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn message(&mut self, text: &str) {
        info!("{text}");
        if let Err(err) = writeln!(self.file, "{text}") {
            warn!(path = %self.path.display(), %err, "run log write failed");
        }
    }

    pub fn stage_started(&mut self, stage: &str) {
        self.message(&format!("{stage} started at {}", timestamp()));
    }

    pub fn stage_succeeded(&mut self, stage: &str) {
        self.message(&format!("Success! {stage} finished at {}", timestamp()));
    }

    pub fn stage_failed(&mut self, stage: &str, detail: &str) {
        self.message(&format!("Fail! {stage} failed at {}: {detail}", timestamp()));
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%m-%d %X").to_string()
}
