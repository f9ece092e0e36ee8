use crate::fields::SanitizedFields;
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Minute precision, matching what site owners read in a spreadsheet.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to encode audit record: {0}")]
    Encode(#[from] csv::Error),
    #[error("Failed to write audit log {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Audit log lock poisoned")]
    Poisoned,
}

/// Append-only CSV log of submissions that reached the delivery stage.
pub struct AuditLog {
    path: PathBuf,
    // Serialises appends from concurrent requests in this process
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, fields: &SanitizedFields) -> Result<(), AuditError> {
        self.append_at(Local::now(), fields)
    }

    /// Write one row as a single `write_all` on a file opened for appending,
    /// so a row is never split even if another process shares the file.
    pub fn append_at(
        &self,
        timestamp: DateTime<Local>,
        fields: &SanitizedFields,
    ) -> Result<(), AuditError> {
        let row = encode_row(&timestamp.format(TIMESTAMP_FORMAT).to_string(), fields)?;

        let _guard = self.lock.lock().map_err(|_| AuditError::Poisoned)?;
        let io_error = |source| AuditError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        file.write_all(&row).map_err(io_error)?;
        file.flush().map_err(io_error)?;
        Ok(())
    }
}

fn encode_row(timestamp: &str, fields: &SanitizedFields) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record([
        timestamp,
        fields.username.as_str(),
        fields.email.as_str(),
        fields.subject.as_str(),
        fields.message.as_str(),
    ])?;
    writer
        .into_inner()
        .map_err(|e| AuditError::Encode(csv::Error::from(e.into_error())))
}
