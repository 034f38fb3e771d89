use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::audit::AuditRecord;
use crate::error::SessionInitError;

/// Read a JSON-lines audit log. Blank lines are skipped.
pub fn read_log(path: &Path) -> Result<Vec<AuditRecord>, SessionInitError> {
    let io_err = |source| SessionInitError::Io { path: path.to_path_buf(), source };
    let file = File::open(path).map_err(io_err)?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|source| SessionInitError::MalformedLog { line: idx + 1, source })?;
        records.push(record);
    }
    Ok(records)
}

/// Append handle on a JSON-lines audit log.
#[derive(Debug)]
pub struct AuditSink {
    path: PathBuf,
    file: File,
}

impl AuditSink {
    pub fn open(path: &Path) -> Result<Self, SessionInitError> {
        let io_err = |source| SessionInitError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).map_err(io_err)?;
        Ok(Self { path: path.to_path_buf(), file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one JSON line. On failure a partially written line is cut off
    /// again, so the file never ends in a torn record.
    pub fn write(&mut self, record: &AuditRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let start = self.file.metadata()?.len();
        let written = self.file.write_all(line.as_bytes()).and_then(|()| self.file.flush());
        if written.is_err() && self.file.metadata()?.is_file() {
            self.file.set_len(start)?;
        }
        written
    }
}
