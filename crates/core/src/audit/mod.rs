//! Hash-chained audit trail.
//!
//! Every processed statement yields exactly one [`AuditRecord`]. A record's
//! `self_hash` covers its predecessor's hash, the statement digest, the outcome
//! and the timestamp; `detail` rides along unhashed.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{ErrorKind, SessionInitError};
use crate::syntax::Statement;

mod chain;
mod log;

pub use chain::{chain_hash, sha256_hex, statement_digest, verify_chain, ChainError};
pub use log::{read_log, AuditSink};

/// `prev_hash` of the first record in every chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Failed => "failed",
        }
    }
}

/// Unhashed metadata describing how a statement ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Voice handle the dispatch went to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    /// Containment replaced the requested persona.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub substituted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub sequence: u64,
    /// `family.verb` of the audited statement.
    pub keyword: String,
    pub statement_digest: String,
    pub prev_hash: String,
    pub self_hash: String,
    pub timestamp: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub detail: OutcomeDetail,
}

impl AuditRecord {
    /// Short display form: `sha256:<first 16 hex>.../ts:<timestamp>`.
    pub fn hashbrown(&self) -> String {
        let prefix: String = self.self_hash.chars().take(16).collect();
        format!("sha256:{prefix}.../ts:{}", self.timestamp)
    }
}

/// Append-only chain for one session, optionally mirrored to a JSON-lines file.
///
/// The first failed write detaches the file, so it always holds a verifiable
/// prefix of the chain; later records stay in memory only.
#[derive(Debug, Default)]
pub struct AuditLogger {
    records: Vec<AuditRecord>,
    sink: Option<AuditSink>,
    persist_error: Option<String>,
}

impl AuditLogger {
    /// In-memory chain starting at genesis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue the chain persisted at `path`, creating the file if needed.
    ///
    /// An existing log file is read and verified first; a broken chain is fatal.
    pub fn open(path: &Path) -> Result<Self, SessionInitError> {
        let records = if path.is_file() { read_log(path)? } else { Vec::new() };
        verify_chain(&records).map_err(|err| SessionInitError::ChainCorrupted {
            sequence: err.sequence,
            reason: err.reason,
        })?;
        let sink = AuditSink::open(path)?;
        info!(path = %path.display(), existing = records.len(), "audit log opened");
        Ok(Self { records, sink: Some(sink), persist_error: None })
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&AuditRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True while records are still being written to the log file.
    pub fn is_persisting(&self) -> bool {
        self.sink.is_some()
    }

    /// The write error that detached the log file, if one occurred.
    pub fn persistence_failure(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    /// Append one record. The in-memory chain always advances; a persistence
    /// failure is logged and stops further writes to the log file.
    pub fn append(
        &mut self,
        statement: &Statement,
        outcome: Outcome,
        detail: OutcomeDetail,
    ) -> AuditRecord {
        let sequence = self.records.len() as u64;
        let prev_hash =
            self.records.last().map(|r| r.self_hash.clone()).unwrap_or_else(|| GENESIS_HASH.into());
        let digest = statement_digest(statement);
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let self_hash = chain_hash(&prev_hash, &digest, outcome, &timestamp);

        let record = AuditRecord {
            sequence,
            keyword: statement.keyword(),
            statement_digest: digest,
            prev_hash,
            self_hash,
            timestamp,
            outcome,
            detail,
        };
        debug!(sequence, outcome = outcome.as_str(), keyword = %record.keyword, "audit record");

        let mut detach = false;
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.write(&record) {
                error!(
                    sequence,
                    path = %sink.path().display(),
                    error = %err,
                    "failed to persist audit record; log file detached"
                );
                self.persist_error = Some(format!(
                    "audit record {sequence} could not be written to {}: {err}",
                    sink.path().display()
                ));
                detach = true;
            }
        }
        if detach {
            self.sink = None;
        }
        self.records.push(record.clone());
        record
    }
}
