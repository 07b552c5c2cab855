use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::models::message::Message;

pub const SESSION_FILE: &str = "session.jsonl";

/// Append-only mirror of the transcript: one JSON object per line.
///
/// Writes are best effort. The conversation engine logs failures and moves
/// on; the session log never blocks or fails a turn.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SessionLog { path: path.into() }
    }

    /// The fixed-name log in the working directory
    pub fn in_current_dir() -> Self {
        SessionLog::new(SESSION_FILE)
    }

    pub fn append(&self, message: &Message) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, message)?;
        writeln!(file)?;
        Ok(())
    }
}
