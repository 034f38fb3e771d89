//! Ritual statement syntax: vocabulary, statement model, parser and serializer.
//!
//! One textual line maps to at most one [`Statement`]. The accepted shapes are:
//! - `family.verb "quoted subject" | key:value, key:value`
//! - `family.verb [card:x, card:y]`
//! - `family.set "value"`
//!
//! Parsing is pure: no I/O, no session state. The serializer in [`render`]
//! produces the canonical text form that the audit logger digests.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod ast;
mod lexer;
mod parser;
pub mod render;

pub use ast::StatementAst;
pub use parser::{parse, parse_program, ParsedLine, SyntaxError};
pub use render::serialize;

/// Statement family (the part before the dot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Ritual,
    Anchor,
    Voice,
    Archive,
    Bandwidth,
    Companion,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Ritual => "ritual",
            Family::Anchor => "anchor",
            Family::Voice => "voice",
            Family::Archive => "archive",
            Family::Bandwidth => "bandwidth",
            Family::Companion => "companion",
        }
    }

    /// Verbs this family accepts.
    pub fn verbs(self) -> &'static [Verb] {
        match self {
            Family::Ritual => &[Verb::Engage, Verb::Complete, Verb::Fail],
            Family::Anchor => &[Verb::Require, Verb::Engage],
            Family::Voice => &[Verb::Use],
            Family::Archive => &[Verb::Access],
            Family::Bandwidth => &[Verb::Set],
            Family::Companion => &[Verb::Summon],
        }
    }

    pub fn allows(self, verb: Verb) -> bool {
        self.verbs().contains(&verb)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ritual" => Ok(Family::Ritual),
            "anchor" => Ok(Family::Anchor),
            "voice" => Ok(Family::Voice),
            "archive" => Ok(Family::Archive),
            "bandwidth" => Ok(Family::Bandwidth),
            "companion" => Ok(Family::Companion),
            _ => Err(()),
        }
    }
}

/// Statement verb (the part after the dot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Engage,
    Complete,
    Fail,
    Require,
    Use,
    Set,
    Access,
    Summon,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Engage => "engage",
            Verb::Complete => "complete",
            Verb::Fail => "fail",
            Verb::Require => "require",
            Verb::Use => "use",
            Verb::Set => "set",
            Verb::Access => "access",
            Verb::Summon => "summon",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "engage" => Ok(Verb::Engage),
            "complete" => Ok(Verb::Complete),
            "fail" => Ok(Verb::Fail),
            "require" => Ok(Verb::Require),
            "use" => Ok(Verb::Use),
            "set" => Ok(Verb::Set),
            "access" => Ok(Verb::Access),
            "summon" => Ok(Verb::Summon),
            _ => Err(()),
        }
    }
}

/// Kind of safety precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorKind {
    Consent,
    Review,
    Containment,
}

impl AnchorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorKind::Consent => "consent",
            AnchorKind::Review => "review",
            AnchorKind::Containment => "containment",
        }
    }
}

/// How an anchor was granted. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    Implicit,
    Explicit,
    Human,
}

impl AnchorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorMode::Implicit => "implicit",
            AnchorMode::Explicit => "explicit",
            AnchorMode::Human => "human",
        }
    }
}

/// Subject of `anchor.engage` that switches the session into containment.
pub const SAFE_CONTAINMENT: &str = "safe_containment";

/// A safety precondition, written `kind:mode` (e.g. `consent:explicit`).
///
/// The mode defaults to `explicit` when omitted. `safe_containment` is accepted
/// as an alias for `containment:explicit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnchorRef {
    pub kind: AnchorKind,
    pub mode: AnchorMode,
}

impl AnchorRef {
    pub fn new(kind: AnchorKind, mode: AnchorMode) -> Self {
        Self { kind, mode }
    }

    /// True when this (granted) anchor covers `required`: same kind, mode at least as strong.
    pub fn satisfies(&self, required: &AnchorRef) -> bool {
        self.kind == required.kind && self.mode >= required.mode
    }
}

impl fmt::Display for AnchorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.mode.as_str())
    }
}

impl FromStr for AnchorRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == SAFE_CONTAINMENT {
            return Ok(AnchorRef::new(AnchorKind::Containment, AnchorMode::Explicit));
        }
        let (kind, mode) = match s.split_once(':') {
            Some((k, m)) => (k, Some(m)),
            None => (s, None),
        };
        let kind = match kind {
            "consent" => AnchorKind::Consent,
            "review" => AnchorKind::Review,
            "containment" => AnchorKind::Containment,
            other => return Err(format!("unknown anchor kind '{other}'")),
        };
        let mode = match mode {
            None | Some("explicit") => AnchorMode::Explicit,
            Some("implicit") => AnchorMode::Implicit,
            Some("human") => AnchorMode::Human,
            Some(other) => return Err(format!("unknown anchor mode '{other}'")),
        };
        Ok(AnchorRef { kind, mode })
    }
}

impl TryFrom<String> for AnchorRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnchorRef> for String {
    fn from(value: AnchorRef) -> Self {
        value.to_string()
    }
}

/// Session bandwidth level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Level::Low),
            "medium" => Ok(Level::Medium),
            "high" => Ok(Level::High),
            other => Err(format!("unknown bandwidth level '{other}'")),
        }
    }
}

/// Opaque persona token such as `@healer`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonaRef(String);

impl PersonaRef {
    /// Wrap a token known to be well formed.
    pub(crate) fn from_static(token: &'static str) -> Self {
        PersonaRef(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PersonaRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix('@')
            .ok_or_else(|| format!("persona '{s}' must start with '@'"))?;
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(format!("invalid persona name '{s}'"));
        }
        Ok(PersonaRef(s.to_string()))
    }
}

impl TryFrom<String> for PersonaRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PersonaRef> for String {
    fn from(value: PersonaRef) -> Self {
        value.0
    }
}

/// Memory card reference: a literal id or one of the selector forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CardRef {
    /// Literal card identifier.
    Id(String),
    /// `latest-N`: the N most recent cards.
    Latest(usize),
    /// `topic-relevant`: every card relevant to the statement topic.
    TopicRelevant,
    /// `top-K-relevant`: the K most relevant cards.
    TopRelevant(usize),
}

impl CardRef {
    /// Parse a selector or fall back to a literal id. Zero-sized bounds are rejected.
    pub fn parse_item(raw: &str) -> Result<Self, String> {
        let raw = raw.strip_prefix("card:").unwrap_or(raw);
        if raw.is_empty() {
            return Err("empty card reference".to_string());
        }
        if raw == "topic-relevant" {
            return Ok(CardRef::TopicRelevant);
        }
        if let Some(n) = raw.strip_prefix("latest-") {
            if let Ok(n) = n.parse::<usize>() {
                return bounded(n, raw).map(CardRef::Latest);
            }
        }
        if let Some(k) = raw.strip_prefix("top-").and_then(|r| r.strip_suffix("-relevant")) {
            if let Ok(k) = k.parse::<usize>() {
                return bounded(k, raw).map(CardRef::TopRelevant);
            }
        }
        Ok(CardRef::Id(raw.to_string()))
    }

    /// Upper bound on the number of cards this reference may resolve to.
    pub fn limit(&self) -> Option<usize> {
        match self {
            CardRef::Id(_) => Some(1),
            CardRef::Latest(n) | CardRef::TopRelevant(n) => Some(*n),
            CardRef::TopicRelevant => None,
        }
    }
}

fn bounded(n: usize, raw: &str) -> Result<usize, String> {
    if n == 0 {
        Err(format!("selector '{raw}' must request at least one card"))
    } else {
        Ok(n)
    }
}

impl fmt::Display for CardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardRef::Id(id) => f.write_str(id),
            CardRef::Latest(n) => write!(f, "latest-{n}"),
            CardRef::TopicRelevant => f.write_str("topic-relevant"),
            CardRef::TopRelevant(k) => write!(f, "top-{k}-relevant"),
        }
    }
}

impl TryFrom<String> for CardRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CardRef::parse_item(&value)
    }
}

impl From<CardRef> for String {
    fn from(value: CardRef) -> Self {
        format!("card:{value}")
    }
}

/// Intent class a ritual subject resolves to. Looked up in the anchor policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentTag {
    Healing,
    Crisis,
    Therapeutic,
    General,
}

impl IntentTag {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentTag::Healing => "healing",
            IntentTag::Crisis => "crisis",
            IntentTag::Therapeutic => "therapeutic",
            IntentTag::General => "general",
        }
    }

    /// Classify a ritual subject by its words. Crisis wins over healing, healing
    /// over therapeutic.
    pub fn classify(subject: &str) -> Self {
        let lowered = subject.to_lowercase();
        let words: Vec<&str> =
            lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
        if mentions(&words, &["crisis"]) {
            IntentTag::Crisis
        } else if mentions(&words, &["heal", "healing"]) {
            IntentTag::Healing
        } else if mentions(&words, &["therapy", "therapeutic"]) {
            IntentTag::Therapeutic
        } else {
            IntentTag::General
        }
    }
}

fn mentions(words: &[&str], vocab: &[&str]) -> bool {
    words.iter().any(|w| vocab.contains(w))
}

impl FromStr for IntentTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healing" => Ok(IntentTag::Healing),
            "crisis" => Ok(IntentTag::Crisis),
            "therapeutic" => Ok(IntentTag::Therapeutic),
            "general" => Ok(IntentTag::General),
            other => Err(format!("unknown intent tag '{other}'")),
        }
    }
}

/// One parsed ritual line. Immutable once produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub family: Family,
    pub verb: Verb,
    /// Quoted subject, verbatim (empty when absent).
    pub subject: String,
    /// Intent tag resolved at parse time (rituals and companion summons only).
    pub intent: Option<IntentTag>,
    pub args: BTreeMap<String, String>,
    pub anchors: BTreeSet<AnchorRef>,
    pub voice: Option<PersonaRef>,
    pub bandwidth: Option<Level>,
    pub memory_refs: Vec<CardRef>,
}

impl Statement {
    /// `family.verb` keyword as written in source.
    pub fn keyword(&self) -> String {
        format!("{}.{}", self.family, self.verb)
    }

    /// Whether processing this statement calls out to the voice or archive collaborators.
    pub fn is_dispatch(&self) -> bool {
        matches!(
            (self.family, self.verb),
            (Family::Ritual, Verb::Engage)
                | (Family::Companion, Verb::Summon)
                | (Family::Archive, Verb::Access)
        )
    }

    /// The containment directive `anchor.engage "safe_containment"` (or any containment grant
    /// made through `anchor.engage`).
    pub fn engages_containment(&self) -> bool {
        self.family == Family::Anchor
            && self.verb == Verb::Engage
            && self.anchors.iter().any(|a| a.kind == AnchorKind::Containment)
    }
}

/// Default intent for a statement of this family with this subject.
pub(crate) fn default_intent(family: Family, subject: &str) -> Option<IntentTag> {
    match family {
        Family::Ritual | Family::Companion => Some(IntentTag::classify(subject)),
        _ => None,
    }
}
