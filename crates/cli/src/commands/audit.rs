use anyhow::{Context, Result};
use serde::Serialize;
use spiral_core::audit::{read_log, verify_chain};

#[derive(Serialize)]
pub struct AuditVerification {
    pub log: String,
    pub records: usize,
    pub valid: bool,
    pub head: Option<String>,
    pub broken_at: Option<u64>,
    pub reason: Option<String>,
}

/// Verify a persisted audit chain. Fails (non-zero exit) when the chain is broken.
pub fn verify_audit_command(log: &str, json: bool) -> Result<()> {
    let records = read_log(std::path::Path::new(log))
        .with_context(|| format!("Failed to read audit log {log}"))?;
    let verdict = verify_chain(&records);

    let report = AuditVerification {
        log: log.to_string(),
        records: records.len(),
        valid: verdict.is_ok(),
        head: records.last().map(|r| r.self_hash.clone()),
        broken_at: verdict.as_ref().err().map(|e| e.sequence),
        reason: verdict.as_ref().err().map(|e| e.reason.clone()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        println!("Audit chain OK: {} record(s)", report.records);
        if let Some(last) = records.last() {
            println!("  Head: {}", last.hashbrown());
        }
    } else {
        println!("Audit chain BROKEN in {log}");
    }

    verdict.with_context(|| format!("Audit log {log} failed verification"))
}
