use std::fs;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use crate::canonicalize_or_current;

/// Bundled example programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Example {
    Hello,
    Healing,
    Containment,
    Archive,
}

impl Example {
    pub fn name(self) -> &'static str {
        match self {
            Example::Hello => "hello",
            Example::Healing => "healing",
            Example::Containment => "containment",
            Example::Archive => "archive",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Example::Hello => HELLO,
            Example::Healing => HEALING,
            Example::Containment => CONTAINMENT,
            Example::Archive => ARCHIVE,
        }
    }
}

const HELLO: &str = r#"// Hello ritual: the smallest complete program.
voice.use "@companion"
ritual.engage "hello_world" | greeting:"Hello from SpiralLogic"
ritual.complete "hello_world"
"#;

const HEALING: &str = r#"// Healing session: consent first, then a gentle voice.
anchor.require "consent:explicit"
bandwidth.set "medium"
voice.use "@healer"
ritual.engage "healing_session" | pace:gentle
companion.summon "healing_presence" | voice:@healer
ritual.complete "healing_session"
"#;

const CONTAINMENT: &str = r#"// Containment: once engaged, every voice routes to the safe handle.
anchor.engage "safe_containment"
voice.use "@sage"
ritual.engage "grounding" | breath:slow
ritual.complete "grounding"
"#;

const ARCHIVE: &str = r#"// Archive: pull recent and relevant memory cards into a reflection.
bandwidth.set "high"
archive.access "reflection" [card:latest-3, card:top-2-relevant]
ritual.engage "reflection" [card:topic-relevant] | voice:@mirror
ritual.complete "reflection"
"#;

/// Write `<output>/<example>.spiral`.
pub fn create_command(example: Example, output: &str, force: bool) -> Result<()> {
    let dir = canonicalize_or_current(output)?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;
    let path = dir.join(format!("{}.spiral", example.name()));
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(&path, example.source())
        .with_context(|| format!("Failed to write example program: {}", path.display()))?;

    println!("Created {} example: {}", example.name(), path.display());
    println!("Run it with: spirallogic run {}", path.display());
    Ok(())
}
