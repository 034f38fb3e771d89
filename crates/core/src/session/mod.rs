//! Session orchestrator.
//!
//! A session processes statements one at a time:
//! anchor check → bandwidth admission and charge → voice/archive dispatch → audit.
//! A failure at any stage skips the rest of the pipeline but never the audit step,
//! so every processed statement produces exactly one record. All mutable state
//! (anchor grants, bandwidth, active voice) lives on the session value itself;
//! independent sessions share nothing.

use tracing::{debug, info, warn};

use crate::anchors::{AnchorEngine, SessionAnchorState};
use crate::archive::{ArchiveAccessor, MemoryArchive, ResolvedCard};
use crate::audit::{AuditLogger, AuditRecord, Outcome, OutcomeDetail};
use crate::bandwidth::{BandwidthGovernor, BandwidthState};
use crate::config::InterpreterConfig;
use crate::error::{RitualError, SessionInitError};
use crate::syntax::{parse, Family, PersonaRef, Statement, StatementAst, Verb};
use crate::voice::{VoiceHandle, VoiceResponder, VoiceRouter};

mod result;

pub use result::{ExecutionReport, ExecutionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing,
    Closed,
}

/// What a dispatch produced before it finished or failed.
#[derive(Default)]
struct Dispatched {
    handle: Option<VoiceHandle>,
    response: Option<String>,
    cards: Vec<ResolvedCard>,
    reason: Option<String>,
}

pub struct Session<'a> {
    anchors: AnchorEngine,
    anchor_state: SessionAnchorState,
    bandwidth: BandwidthGovernor,
    router: VoiceRouter,
    default_persona: PersonaRef,
    responder: &'a dyn VoiceResponder,
    archive: ArchiveAccessor<'a>,
    audit: AuditLogger,
    active_voice: Option<PersonaRef>,
    active_ritual: Option<String>,
    phase: Phase,
}

impl<'a> Session<'a> {
    /// Validate `config`, open the audit chain and start an idle session.
    pub fn new(
        config: &InterpreterConfig,
        responder: &'a dyn VoiceResponder,
        archive: &'a dyn MemoryArchive,
    ) -> Result<Self, SessionInitError> {
        config.validate()?;
        let audit = match &config.audit.log_path {
            Some(path) => AuditLogger::open(path)?,
            None => AuditLogger::new(),
        };
        let bandwidth = &config.bandwidth;
        info!(
            personas = config.personas.len(),
            level = %bandwidth.initial_level,
            persisted = config.audit.log_path.is_some(),
            "ritual session opened"
        );
        Ok(Self {
            anchors: AnchorEngine::new(config.policy.clone()),
            anchor_state: SessionAnchorState::new(),
            bandwidth: BandwidthGovernor::new(
                bandwidth.capacities,
                bandwidth.costs.clone(),
                bandwidth.initial_level,
            ),
            router: VoiceRouter::new(config.personas.iter().cloned(), &config.containment_handle),
            default_persona: config.default_persona.clone(),
            responder,
            archive: ArchiveAccessor::new(archive),
            audit,
            active_voice: None,
            active_ritual: None,
            phase: Phase::Idle,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn anchor_state(&self) -> &SessionAnchorState {
        &self.anchor_state
    }

    pub fn containment_active(&self) -> bool {
        self.anchor_state.containment_active()
    }

    pub fn bandwidth(&self) -> BandwidthState {
        self.bandwidth.state()
    }

    pub fn active_voice(&self) -> Option<&PersonaRef> {
        self.active_voice.as_ref()
    }

    /// Subject of the ritual engaged and not yet completed or failed.
    pub fn active_ritual(&self) -> Option<&str> {
        self.active_ritual.as_deref()
    }

    pub fn audit_records(&self) -> &[AuditRecord] {
        self.audit.records()
    }

    /// Why the audit log file stopped receiving records, if it did.
    pub fn audit_persistence_failure(&self) -> Option<&str> {
        self.audit.persistence_failure()
    }

    /// Parse and process one line. Comments and blank lines yield `Ok(None)`;
    /// a syntax error is returned without touching the audit chain.
    pub fn execute_line(&mut self, line: &str) -> Result<Option<ExecutionResult>, RitualError> {
        if self.phase == Phase::Closed {
            return Err(RitualError::SessionClosed);
        }
        match parse(line)? {
            Some(statement) => self.process(&statement).map(Some),
            None => Ok(None),
        }
    }

    /// Run one statement through the pipeline and audit it.
    ///
    /// Rejections are reported inside the result; `Err` only means the session
    /// is closed.
    pub fn process(&mut self, statement: &Statement) -> Result<ExecutionResult, RitualError> {
        if self.phase == Phase::Closed {
            return Err(RitualError::SessionClosed);
        }
        self.phase = Phase::Processing;

        let mut dispatched = Dispatched::default();
        let evaluated = self.evaluate(statement, &mut dispatched);

        let mut detail = OutcomeDetail {
            handle: dispatched.handle.as_ref().map(|h| h.name.clone()),
            substituted: dispatched.handle.as_ref().is_some_and(|h| h.substituted),
            ..OutcomeDetail::default()
        };
        let (outcome, error) = match evaluated {
            Ok(outcome) => {
                detail.reason = dispatched.reason.take();
                (outcome, None)
            }
            Err(err) => {
                warn!(
                    keyword = %statement.keyword(),
                    kind = err.kind().as_str(),
                    error = %err,
                    "statement rejected"
                );
                detail.error_kind = Some(err.kind());
                detail.reason = Some(err.to_string());
                (Outcome::Failed, Some(err))
            }
        };

        let record = self.audit.append(statement, outcome, detail);
        let persisted = self.audit.is_persisting();
        self.phase = Phase::Idle;

        Ok(ExecutionResult {
            accepted: error.is_none(),
            outcome,
            ast: StatementAst::new(statement).with_hashbrown(record.hashbrown()),
            audit_record: record,
            persisted,
            error,
            handle: dispatched.handle,
            response: dispatched.response,
            cards: dispatched.cards,
        })
    }

    fn evaluate(
        &mut self,
        statement: &Statement,
        out: &mut Dispatched,
    ) -> Result<Outcome, RitualError> {
        self.anchors.check(statement, &self.anchor_state)?;
        if statement.family != Family::Bandwidth {
            self.bandwidth.admit(statement)?;
        }

        match (statement.family, statement.verb) {
            (Family::Anchor, _) => {
                let granted = self.anchors.apply(statement, &mut self.anchor_state);
                debug!(granted = granted.len(), "anchors applied");
                Ok(Outcome::Completed)
            }
            (Family::Voice, Verb::Use) => {
                if let Some(persona) = &statement.voice {
                    self.router.validate(persona)?;
                    self.active_voice = Some(persona.clone());
                }
                Ok(Outcome::Completed)
            }
            (Family::Bandwidth, Verb::Set) => {
                if let Some(level) = statement.bandwidth {
                    self.bandwidth.set(level);
                }
                Ok(Outcome::Completed)
            }
            (Family::Ritual, Verb::Complete) => {
                self.active_ritual = None;
                Ok(Outcome::Completed)
            }
            (Family::Ritual, Verb::Fail) => {
                self.active_ritual = None;
                let reason = statement.args.get("reason").cloned();
                out.reason = Some(reason.unwrap_or_else(|| "declared failure".to_string()));
                Ok(Outcome::Failed)
            }
            _ => {
                self.dispatch(statement, out)?;
                Ok(Outcome::Completed)
            }
        }
    }

    fn dispatch(&mut self, statement: &Statement, out: &mut Dispatched) -> Result<(), RitualError> {
        let handle = match statement.family {
            Family::Archive => None,
            _ => {
                let persona = statement
                    .voice
                    .as_ref()
                    .or(self.active_voice.as_ref())
                    .unwrap_or(&self.default_persona);
                Some(self.router.resolve(persona, &self.anchor_state)?)
            }
        };

        let cost = self.bandwidth.cost_of(statement);
        self.bandwidth.charge(cost)?;
        debug!(cost, remaining = self.bandwidth.remaining(), "bandwidth charged");
        out.handle = handle.clone();

        if !statement.memory_refs.is_empty() {
            let topic = statement.args.get("topic").unwrap_or(&statement.subject);
            out.cards = self.archive.resolve(&statement.memory_refs, topic)?;
        }

        if let Some(handle) = &handle {
            out.response = Some(self.responder.respond(handle, &statement.args)?);
        }

        if statement.family == Family::Ritual {
            self.active_ritual = Some(statement.subject.clone());
        }
        Ok(())
    }

    /// Leave containment. The only way out besides [`Session::reset`].
    pub fn clear_containment(&mut self) {
        if self.anchor_state.containment_active() {
            self.anchor_state.clear_containment();
            info!("safe containment cleared");
        }
    }

    /// Drop anchors, containment, the active voice and ritual, and return bandwidth
    /// to its initial level. The audit chain continues.
    pub fn reset(&mut self) {
        self.anchor_state.clear();
        self.bandwidth.reset();
        self.active_voice = None;
        self.active_ritual = None;
        info!(records = self.audit.len(), "ritual session reset");
    }

    /// End the session. Later statements are refused with `SessionClosed`.
    pub fn close(&mut self) {
        if self.phase != Phase::Closed {
            self.phase = Phase::Closed;
            info!(records = self.audit.len(), "ritual session closed");
        }
    }
}
