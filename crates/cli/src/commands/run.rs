use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use spiral_core::archive::{InMemoryArchive, MemoryArchive};
use spiral_core::audit::Outcome;
use spiral_core::config::InterpreterConfig;
use spiral_core::error::ErrorKind;
use spiral_core::session::{ExecutionReport, ExecutionResult, Session};
use spiral_core::syntax::{parse_program, serialize, Statement, StatementAst};
use spiral_core::voice::ScriptedResponder;
use tracing::warn;

use crate::commands::{has_spiral_extension, open_project, read_program};
use crate::sha256_bytes;

/// Options for `spirallogic run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub file: String,
    pub root: Option<String>,
    pub config: Option<String>,
    pub audit_log: Option<String>,
    pub json: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub program: String,
    pub program_sha256: String,
    pub started_at: String,
    pub finished_at: String,
    pub statements: usize,
    pub completed: usize,
    /// Accepted statements that ended `failed` (`ritual.fail`).
    pub failed: usize,
    pub rejected: usize,
    pub syntax_errors: usize,
    pub audit_log: Option<String>,
    pub audit_head: Option<String>,
    /// Set when the audit log file stopped receiving records mid-run.
    pub audit_error: Option<String>,
}

#[derive(Serialize)]
struct StatementLine {
    line: usize,
    #[serde(flatten)]
    report: ExecutionReport,
}

#[derive(Serialize)]
struct SyntaxLine {
    line: usize,
    error_kind: ErrorKind,
    error: String,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a RunSummary,
}

/// Execute a ritual program line by line.
pub fn run_command(opts: &RunOptions) -> Result<()> {
    if !has_spiral_extension(&opts.file) {
        warn!(file = %opts.file, "program does not have a .spiral extension");
    }
    let program = read_program(&opts.file)?;

    let project = opts.root.as_deref().map(open_project).transpose()?;
    let mut config = match (&opts.config, &project) {
        (Some(path), _) => InterpreterConfig::load(Path::new(path))?,
        (None, Some(ctx)) => ctx.interpreter_config(),
        (None, None) => InterpreterConfig::default(),
    };
    if config.audit.log_path.is_none() {
        if let Some(ctx) = &project {
            config.audit.log_path = Some(ctx.layout.resolve(&ctx.config.audit_log));
        }
    }
    if let Some(log) = &opts.audit_log {
        config.audit.log_path = Some(PathBuf::from(log));
    }

    let fallback = InMemoryArchive::new();
    let archive: &dyn MemoryArchive = match &project {
        Some(ctx) => &ctx.archive,
        None => &fallback,
    };
    let responder = ScriptedResponder::new();
    let mut session =
        Session::new(&config, &responder, archive).context("Failed to start ritual session")?;

    let mut summary = RunSummary {
        program: opts.file.clone(),
        program_sha256: sha256_bytes(program.as_bytes()),
        started_at: Utc::now().to_rfc3339(),
        audit_log: config.audit.log_path.as_ref().map(|p| p.display().to_string()),
        ..RunSummary::default()
    };

    for parsed in parse_program(&program) {
        let statement = match parsed.result {
            Ok(statement) => statement,
            Err(err) => {
                summary.syntax_errors += 1;
                if opts.json {
                    let line = SyntaxLine {
                        line: parsed.line,
                        error_kind: ErrorKind::Syntax,
                        error: err.to_string(),
                    };
                    println!("{}", serde_json::to_string(&line)?);
                } else {
                    println!("[line {}] {err}", parsed.line);
                }
                continue;
            }
        };

        let result = session.process(&statement).context("Ritual session refused statement")?;
        summary.statements += 1;
        match (result.accepted, result.outcome) {
            (true, Outcome::Completed) => summary.completed += 1,
            (true, Outcome::Failed) => summary.failed += 1,
            (false, _) => summary.rejected += 1,
        }

        if opts.json {
            let line = StatementLine { line: parsed.line, report: result.report() };
            println!("{}", serde_json::to_string(&line)?);
        } else {
            print_result(parsed.line, &statement, &result);
        }
    }

    session.close();
    summary.finished_at = Utc::now().to_rfc3339();
    summary.audit_head = session.audit_records().last().map(|r| r.hashbrown());
    summary.audit_error = session.audit_persistence_failure().map(str::to_string);

    if opts.json {
        println!("{}", serde_json::to_string(&SummaryLine { summary: &summary })?);
    } else {
        print_summary(&summary);
    }

    if let Some(err) = &summary.audit_error {
        bail!("audit log incomplete: {err}");
    }
    if summary.rejected > 0 || summary.syntax_errors > 0 {
        bail!(
            "{} statement(s) rejected, {} syntax error(s)",
            summary.rejected,
            summary.syntax_errors
        );
    }
    Ok(())
}

fn print_result(line: usize, statement: &Statement, result: &ExecutionResult) {
    let status = match (&result.error, result.outcome) {
        (Some(err), _) => format!("REJECTED ({}): {err}", err.kind().as_str()),
        (None, outcome) => outcome.as_str().to_string(),
    };
    println!("[line {line}] {} -> {status}", serialize(statement));
    if let Some(handle) = &result.handle {
        if handle.substituted {
            println!("    voice: {} (containment, requested {})", handle.name, handle.requested);
        } else {
            println!("    voice: {}", handle.name);
        }
    }
    if let Some(response) = &result.response {
        println!("    response: {response}");
    }
    if !result.cards.is_empty() {
        let ids: Vec<String> = result.cards.iter().map(|c| format!("card:{}", c.card.id)).collect();
        println!("    cards: {}", ids.join(", "));
    }
    println!("    audit: #{} {}", result.audit_record.sequence, result.audit_record.hashbrown());
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Ritual run summary");
    println!("==================");
    println!("Program: {} (sha256 {})", summary.program, summary.program_sha256);
    println!("Statements: {}", summary.statements);
    println!("  Completed: {}", summary.completed);
    println!("  Declared failures: {}", summary.failed);
    println!("  Rejected: {}", summary.rejected);
    println!("Syntax errors: {}", summary.syntax_errors);
    if let Some(log) = &summary.audit_log {
        println!("Audit log: {log}");
    }
    if let Some(head) = &summary.audit_head {
        println!("Audit head: {head}");
    }
    if let Some(err) = &summary.audit_error {
        println!("Audit log write FAILED: {err}");
    }
}

/// Parse a program and print each statement's JSON AST (or canonical text).
pub fn parse_command(file: &str, canonical: bool) -> Result<()> {
    let program = read_program(file)?;
    let mut errors = 0usize;
    for parsed in parse_program(&program) {
        match parsed.result {
            Ok(statement) if canonical => println!("{}", serialize(&statement)),
            Ok(statement) => {
                println!("{}", serde_json::to_string(&StatementAst::new(&statement))?)
            }
            Err(err) => {
                errors += 1;
                eprintln!("{err}");
            }
        }
    }
    if errors > 0 {
        bail!("{errors} line(s) failed to parse");
    }
    Ok(())
}
