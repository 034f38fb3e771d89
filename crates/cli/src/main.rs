use anyhow::Result;
use clap::{Parser, Subcommand};
use spirallogic::commands::{
    add_card_command, create_command, init_project_command, list_cards_command,
    parse_command, project_info_command, run_command, verify_audit_command, Example,
    RunOptions,
};
use spirallogic::init_tracing;

/// SpiralLogic ritual interpreter CLI.
///
/// This CLI is a thin wrapper around `spiral-core` (exposed in code as `spiral_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "spirallogic",
    version,
    about = "SpiralLogic ritual interpreter",
    long_about = None
)]
struct Cli {
    /// Enable debug logging on stderr (otherwise `RUST_LOG`, default `warn`).
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a ritual program line by line.
    ///
    /// Every statement is anchor-checked, charged against bandwidth, dispatched
    /// and audited. Exits non-zero if any line fails to parse or any statement
    /// is rejected.
    Run {
        /// Program file (`*.spiral`), or `-` for stdin.
        file: String,

        /// Project root whose config, memory archive and audit log are used.
        #[arg(long)]
        root: Option<String>,

        /// Interpreter config (YAML or JSON). Overrides the project's embedded config.
        #[arg(long)]
        config: Option<String>,

        /// Persist the audit chain to this JSON-lines file.
        #[arg(long)]
        audit_log: Option<String>,

        /// Emit one JSON object per statement instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Parse a ritual program and print each statement's JSON AST without executing.
    Parse {
        /// Program file, or `-` for stdin.
        file: String,

        /// Print the canonical text form instead of JSON.
        #[arg(long, default_value_t = false)]
        canonical: bool,
    },

    /// Write an example ritual program.
    Create {
        /// Which example to write.
        #[arg(value_enum)]
        example: Example,

        /// Directory to write `<example>.spiral` into.
        #[arg(long, default_value = ".")]
        output: String,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Verify a persisted audit log offline.
    VerifyAudit {
        /// JSON-lines audit log.
        log: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Initialize a new ritual project at the given root.
    ///
    /// This will:
    /// - Create a `.spiral` metadata directory and a `rituals` directory.
    /// - Write a `.spiral/project.json` config file.
    /// - Create the SQLite memory archive.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show basic information about an existing ritual project.
    ProjectInfo {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Store a memory card in the project archive.
    AddCard {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Card identifier (referenced as `card:<id>`).
        #[arg(long)]
        id: String,

        /// Topic used by the relevance selectors.
        #[arg(long)]
        topic: String,

        /// Card content.
        #[arg(long)]
        content: String,
    },

    /// List memory cards in the project archive, oldest first.
    ListCards {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    match cli.command {
        Command::Run { file, root, config, audit_log, json } => {
            run_command(&RunOptions { file, root, config, audit_log, json })?
        }
        Command::Parse { file, canonical } => parse_command(&file, canonical)?,
        Command::Create { example, output, force } => create_command(example, &output, force)?,
        Command::VerifyAudit { log, json } => verify_audit_command(&log, json)?,
        Command::InitProject { root, name } => init_project_command(&root, name)?,
        Command::ProjectInfo { root, json } => project_info_command(&root, json)?,
        Command::AddCard { root, id, topic, content } => {
            add_card_command(&root, &id, &topic, &content)?
        }
        Command::ListCards { root, json } => list_cards_command(&root, json)?,
    }

    Ok(())
}
