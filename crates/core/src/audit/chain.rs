use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::audit::{AuditRecord, Outcome, GENESIS_HASH};
use crate::syntax::{serialize, Statement};

/// First broken link found by [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audit chain broken at sequence {sequence}: {reason}")]
pub struct ChainError {
    pub sequence: u64,
    pub reason: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Digest of the statement's canonical text form.
pub fn statement_digest(statement: &Statement) -> String {
    sha256_hex(serialize(statement).as_bytes())
}

/// `H(prev_hash || statement_digest || outcome || timestamp)` over the textual fields.
pub fn chain_hash(
    prev_hash: &str,
    statement_digest: &str,
    outcome: Outcome,
    timestamp: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(statement_digest.as_bytes());
    hasher.update(outcome.as_str().as_bytes());
    hasher.update(timestamp.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a full chain from genesis: contiguous sequences starting at 0, every
/// `prev_hash` linking to its predecessor, and every `self_hash` recomputing.
pub fn verify_chain(records: &[AuditRecord]) -> Result<(), ChainError> {
    let mut expected_prev = GENESIS_HASH.to_string();
    for (idx, record) in records.iter().enumerate() {
        let expected_seq = idx as u64;
        let broken = |reason: String| ChainError { sequence: record.sequence, reason };
        if record.sequence != expected_seq {
            return Err(broken(format!("expected sequence {expected_seq}")));
        }
        if record.prev_hash != expected_prev {
            return Err(broken("prev_hash does not match the preceding record".to_string()));
        }
        let recomputed = chain_hash(
            &record.prev_hash,
            &record.statement_digest,
            record.outcome,
            &record.timestamp,
        );
        if record.self_hash != recomputed {
            return Err(broken("self_hash does not match record contents".to_string()));
        }
        expected_prev = record.self_hash.clone();
    }
    Ok(())
}
