use serde::Serialize;

use crate::archive::ResolvedCard;
use crate::audit::{AuditRecord, Outcome};
use crate::error::{ErrorKind, RitualError};
use crate::syntax::StatementAst;
use crate::voice::VoiceHandle;

/// Everything the caller learns about one processed statement.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub accepted: bool,
    pub outcome: Outcome,
    pub audit_record: AuditRecord,
    /// Whether the record reached the audit log file. Always false without one.
    pub persisted: bool,
    pub error: Option<RitualError>,
    /// Handle the voice dispatch went to, when there was one.
    pub handle: Option<VoiceHandle>,
    /// Responder text, passed through untouched.
    pub response: Option<String>,
    pub cards: Vec<ResolvedCard>,
    pub ast: StatementAst,
}

impl ExecutionResult {
    pub fn report(&self) -> ExecutionReport {
        ExecutionReport {
            accepted: self.accepted,
            outcome: self.outcome,
            sequence: self.audit_record.sequence,
            persisted: self.persisted,
            error_kind: self.error.as_ref().map(RitualError::kind),
            error: self.error.as_ref().map(ToString::to_string),
            handle: self.handle.as_ref().map(|h| h.name.clone()),
            substituted: self.handle.as_ref().is_some_and(|h| h.substituted),
            response: self.response.clone(),
            cards: self.cards.iter().map(|c| c.card.id.clone()).collect(),
            ast: self.ast.clone(),
        }
    }
}

/// Serializable summary of an [`ExecutionResult`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub accepted: bool,
    pub outcome: Outcome,
    pub sequence: u64,
    pub persisted: bool,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
    pub handle: Option<String>,
    pub substituted: bool,
    pub response: Option<String>,
    pub cards: Vec<String>,
    pub ast: StatementAst,
}
