use std::cell::Cell;
use std::collections::BTreeMap;

use spiral_core::archive::{CardRecord, InMemoryArchive};
use spiral_core::audit::{verify_chain, Outcome};
use spiral_core::config::InterpreterConfig;
use spiral_core::error::{DispatchError, ErrorKind, RitualError};
use spiral_core::session::{ExecutionResult, Phase, Session};
use spiral_core::syntax::{parse, Level};
use spiral_core::voice::{ScriptedResponder, VoiceHandle, VoiceResponder};
use tempfile::tempdir;

fn run(session: &mut Session<'_>, line: &str) -> ExecutionResult {
    session.execute_line(line).expect("session open").expect("statement line")
}

fn kind(result: &ExecutionResult) -> Option<ErrorKind> {
    result.error.as_ref().map(RitualError::kind)
}

/// Responder that counts how often it was reached.
#[derive(Default)]
struct CountingResponder {
    calls: Cell<usize>,
}

impl VoiceResponder for CountingResponder {
    fn respond(
        &self,
        handle: &VoiceHandle,
        _args: &BTreeMap<String, String>,
    ) -> Result<String, DispatchError> {
        self.calls.set(self.calls.get() + 1);
        Ok(format!("hello from {handle}"))
    }
}

#[test]
fn consented_healing_session_completes() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new().with_reply("@healer", "I am here with you.");
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    assert!(run(&mut session, r#"anchor.require "consent:explicit""#).accepted);
    assert!(run(&mut session, r#"voice.use "@healer""#).accepted);
    let engaged = run(&mut session, r#"ritual.engage "healing_session""#);
    assert!(engaged.accepted);
    assert_eq!(engaged.outcome, Outcome::Completed);
    assert_eq!(engaged.handle.as_ref().map(|h| h.name.as_str()), Some("@healer"));
    assert_eq!(engaged.response.as_deref(), Some("I am here with you."));
    assert_eq!(session.active_ritual(), Some("healing_session"));

    let done = run(&mut session, "ritual.complete");
    assert!(done.accepted);
    assert_eq!(session.active_ritual(), None);

    let records = session.audit_records();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.outcome == Outcome::Completed));
    assert!(verify_chain(records).is_ok());
}

#[test]
fn containment_substitutes_the_requested_voice() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    run(&mut session, r#"anchor.engage "safe_containment""#);
    assert!(session.containment_active());

    let result = run(&mut session, r#"ritual.engage "grounding" | voice:@sage"#);
    assert!(result.accepted);
    let handle = result.handle.as_ref().unwrap();
    assert_eq!(handle.name, "safe_containment");
    assert!(handle.substituted);
    assert_eq!(result.audit_record.detail.handle.as_deref(), Some("safe_containment"));
    assert!(result.audit_record.detail.substituted);

    session.clear_containment();
    let after = run(&mut session, r#"ritual.engage "grounding" | voice:@sage"#);
    assert_eq!(after.handle.unwrap().name, "@sage");
}

#[test]
fn healing_without_consent_is_rejected_before_dispatch() {
    let config = InterpreterConfig::default();
    let responder = CountingResponder::default();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let result = run(&mut session, r#"ritual.engage "healing_session""#);
    assert!(!result.accepted);
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(kind(&result), Some(ErrorKind::Anchor));
    assert!(result.handle.is_none());
    assert_eq!(responder.calls.get(), 0);
    assert_eq!(session.bandwidth().consumed, 0);

    let record = &session.audit_records()[0];
    assert_eq!(record.outcome, Outcome::Failed);
    assert_eq!(record.detail.error_kind, Some(ErrorKind::Anchor));
    assert!(record.detail.reason.as_deref().unwrap().contains("consent:explicit"));
}

#[test]
fn low_bandwidth_rejects_the_fourth_dispatch() {
    let config = InterpreterConfig::default();
    let responder = CountingResponder::default();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    run(&mut session, r#"bandwidth.set "low""#);
    for _ in 0..3 {
        assert!(run(&mut session, r#"ritual.engage "walk""#).accepted);
    }
    let fourth = run(&mut session, r#"ritual.engage "walk""#);
    assert!(!fourth.accepted);
    assert_eq!(kind(&fourth), Some(ErrorKind::Bandwidth));
    assert_eq!(responder.calls.get(), 3);
    assert_eq!(session.bandwidth().consumed, 3);

    // A new window restores capacity.
    run(&mut session, r#"bandwidth.set "low""#);
    assert!(run(&mut session, r#"ritual.engage "walk""#).accepted);
}

#[test]
fn declared_minimum_level_is_checked_before_dispatch() {
    let config = InterpreterConfig::default();
    let responder = CountingResponder::default();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let result = run(&mut session, r#"ritual.engage "deep dive" | bandwidth:high"#);
    assert_eq!(kind(&result), Some(ErrorKind::Bandwidth));
    assert_eq!(responder.calls.get(), 0);

    run(&mut session, r#"bandwidth.set "high""#);
    assert!(run(&mut session, r#"ritual.engage "deep dive" | bandwidth:high"#).accepted);
    assert_eq!(session.bandwidth().current, Level::High);
}

#[test]
fn latest_cards_are_bounded_by_what_the_archive_holds() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let mut archive = InMemoryArchive::new();
    for n in 1..=5 {
        archive.insert(CardRecord::new(format!("c{n}"), "journal", format!("entry {n}")));
    }
    let mut session = Session::new(&config, &responder, &archive).unwrap();
    let result = run(&mut session, "archive.access [card:latest-3]");
    assert!(result.accepted);
    assert!(result.handle.is_none());
    let ids: Vec<_> = result.cards.iter().map(|c| c.card.id.as_str()).collect();
    assert_eq!(ids, ["c5", "c4", "c3"]);

    let single = InMemoryArchive::new().with_card(CardRecord::new("only", "journal", "x"));
    let mut session = Session::new(&config, &responder, &single).unwrap();
    let result = run(&mut session, "archive.access [card:latest-3]");
    assert_eq!(result.cards.len(), 1);
}

#[test]
fn missing_card_rejects_the_statement() {
    let config = InterpreterConfig::default();
    let responder = CountingResponder::default();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let result = run(&mut session, r#"ritual.engage "reflect" [card:ghost]"#);
    assert_eq!(kind(&result), Some(ErrorKind::NotFound));
    assert_eq!(responder.calls.get(), 0);
}

#[test]
fn unknown_persona_is_rejected_without_charge() {
    let config = InterpreterConfig::default();
    let responder = CountingResponder::default();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let dispatch = run(&mut session, r#"ritual.engage "walk" | voice:@stranger"#);
    assert_eq!(kind(&dispatch), Some(ErrorKind::UnknownPersona));
    assert_eq!(session.bandwidth().consumed, 0);

    let switch = run(&mut session, r#"voice.use "@stranger""#);
    assert_eq!(kind(&switch), Some(ErrorKind::UnknownPersona));
    assert_eq!(session.active_voice(), None);
}

#[test]
fn dispatch_falls_back_to_active_then_default_voice() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let default = run(&mut session, r#"ritual.engage "walk""#);
    assert_eq!(default.handle.unwrap().name, "@companion");

    run(&mut session, r#"voice.use "@mirror""#);
    let active = run(&mut session, r#"ritual.engage "walk""#);
    assert_eq!(active.handle.unwrap().name, "@mirror");

    let explicit = run(&mut session, r#"companion.summon "friend" | voice:@sage"#);
    assert_eq!(explicit.handle.unwrap().name, "@sage");
}

#[test]
fn cancelled_dispatch_is_audited_as_failed() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new().with_failure("@companion", DispatchError::Cancelled);
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let result = run(&mut session, r#"ritual.engage "walk""#);
    assert_eq!(kind(&result), Some(ErrorKind::Cancelled));
    assert_eq!(result.audit_record.outcome, Outcome::Failed);
    assert_eq!(result.audit_record.detail.error_kind, Some(ErrorKind::Cancelled));
    assert_eq!(session.active_ritual(), None);
}

#[test]
fn declared_failure_is_accepted_with_failed_outcome() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    run(&mut session, r#"ritual.engage "walk""#);
    let result = run(&mut session, r#"ritual.fail "walk" | reason:"too tired""#);
    assert!(result.accepted);
    assert_eq!(result.outcome, Outcome::Failed);
    assert_eq!(result.audit_record.detail.reason.as_deref(), Some("too tired"));
    assert_eq!(session.active_ritual(), None);
}

#[test]
fn declared_failure_of_a_gated_ritual_is_not_an_anchor_rejection() {
    let config = InterpreterConfig::default();
    let responder = CountingResponder::default();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let engaged = run(&mut session, r#"ritual.engage "healing_session""#);
    assert_eq!(kind(&engaged), Some(ErrorKind::Anchor));

    let failed = run(&mut session, r#"ritual.fail "healing_session" | reason:"no consent""#);
    assert!(failed.accepted);
    assert_eq!(failed.outcome, Outcome::Failed);
    assert!(failed.error.is_none());
    assert_eq!(failed.audit_record.detail.reason.as_deref(), Some("no consent"));
    assert_eq!(responder.calls.get(), 0);
}

#[test]
fn syntax_errors_and_comments_leave_the_chain_alone() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let err = session.execute_line(r#"ritual.dance "x""#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert!(session.execute_line("# just a note").unwrap().is_none());
    assert!(session.execute_line("   ").unwrap().is_none());
    assert!(session.audit_records().is_empty());
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn result_ast_carries_the_audit_hashbrown() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let result = run(&mut session, r#"ritual.engage "walk" | pace:slow"#);
    assert_eq!(result.ast.kind, "ritual.engage");
    assert_eq!(result.ast.hashbrown, Some(result.audit_record.hashbrown()));

    let report = serde_json::to_value(result.report()).unwrap();
    assert_eq!(report["accepted"], true);
    assert_eq!(report["sequence"], 0);
    assert_eq!(report["handle"], "@companion");
    assert_eq!(report["ast"]["type"], "ritual.engage");
    assert_eq!(report["ast"]["args"]["pace"], "slow");
}

#[test]
fn reset_clears_state_but_continues_the_chain() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    run(&mut session, r#"anchor.engage "safe_containment""#);
    run(&mut session, r#"bandwidth.set "high""#);
    run(&mut session, r#"ritual.engage "walk""#);
    session.reset();

    assert!(!session.containment_active());
    assert!(session.anchor_state().granted().is_empty());
    assert_eq!(session.bandwidth().current, Level::Medium);
    assert_eq!(session.active_ritual(), None);

    let next = run(&mut session, r#"ritual.engage "walk""#);
    assert_eq!(next.audit_record.sequence, 3);
    assert!(verify_chain(session.audit_records()).is_ok());
}

#[test]
fn closed_session_refuses_statements() {
    let config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    session.close();
    assert_eq!(session.phase(), Phase::Closed);
    assert_eq!(session.execute_line("ritual.complete").unwrap_err(), RitualError::SessionClosed);
    let statement = parse("ritual.complete").unwrap().unwrap();
    assert_eq!(session.process(&statement).unwrap_err().kind(), ErrorKind::SessionClosed);
    assert!(session.audit_records().is_empty());
}

#[test]
fn sessions_resume_a_persisted_chain() {
    let dir = tempdir().unwrap();
    let mut config = InterpreterConfig::default();
    config.audit.log_path = Some(dir.path().join("audit.jsonl"));
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();

    {
        let mut session = Session::new(&config, &responder, &archive).unwrap();
        run(&mut session, r#"ritual.engage "walk""#);
        run(&mut session, "ritual.complete");
    }

    let mut session = Session::new(&config, &responder, &archive).unwrap();
    assert_eq!(session.audit_records().len(), 2);
    let next = run(&mut session, r#"ritual.engage "walk""#);
    assert_eq!(next.audit_record.sequence, 2);
}

#[test]
fn results_report_whether_the_record_was_persisted() {
    let dir = tempdir().unwrap();
    let mut config = InterpreterConfig::default();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();

    let mut in_memory = Session::new(&config, &responder, &archive).unwrap();
    assert!(!run(&mut in_memory, "ritual.complete").persisted);

    config.audit.log_path = Some(dir.path().join("audit.jsonl"));
    let mut session = Session::new(&config, &responder, &archive).unwrap();
    let result = run(&mut session, "ritual.complete");
    assert!(result.persisted);
    assert!(result.report().persisted);
    assert!(session.audit_persistence_failure().is_none());
}

#[cfg(target_os = "linux")]
#[test]
fn audit_write_failure_surfaces_and_does_not_reject_statements() {
    let mut config = InterpreterConfig::default();
    config.audit.log_path = Some("/dev/full".into());
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    let mut session = Session::new(&config, &responder, &archive).unwrap();

    let first = run(&mut session, r#"ritual.engage "walk""#);
    assert!(first.accepted);
    assert!(!first.persisted);
    assert!(session.audit_persistence_failure().is_some());

    let second = run(&mut session, "ritual.complete");
    assert!(!second.persisted);
    assert_eq!(session.audit_records().len(), 2);
    assert!(verify_chain(session.audit_records()).is_ok());
}

#[test]
fn invalid_config_refuses_to_start() {
    let mut config = InterpreterConfig::default();
    config.audit.digest = "sha1".into();
    let responder = ScriptedResponder::new();
    let archive = InMemoryArchive::new();
    assert!(Session::new(&config, &responder, &archive).is_err());
}
