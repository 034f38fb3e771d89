//! Canonical text form of a [`Statement`].
//!
//! The output is what the audit logger digests, so it must be deterministic:
//! lifted fields come first in a fixed order, followed by `args` in key order.
//! For every statement produced by the parser, `parse(serialize(s)) == s`.

use super::{default_intent, AnchorRef, CardRef, Family, Statement, Verb};

/// Render the canonical single-line form of a statement.
pub fn serialize(statement: &Statement) -> String {
    let mut out = statement.keyword();

    if !statement.subject.is_empty() {
        out.push(' ');
        out.push_str(&quote(&statement.subject));
    }

    if !statement.memory_refs.is_empty() {
        let items: Vec<String> = statement.memory_refs.iter().map(render_card).collect();
        out.push_str(" [");
        out.push_str(&items.join(", "));
        out.push(']');
    }

    let pairs = tail_pairs(statement);
    if !pairs.is_empty() {
        out.push_str(" | ");
        out.push_str(&pairs.join(", "));
    }

    out
}

fn tail_pairs(statement: &Statement) -> Vec<String> {
    let mut pairs = Vec::new();
    let keyword = (statement.family, statement.verb);

    if let Some(voice) = &statement.voice {
        if keyword != (Family::Voice, Verb::Use) {
            pairs.push(format!("voice:{voice}"));
        }
    }
    if let Some(level) = statement.bandwidth {
        if keyword != (Family::Bandwidth, Verb::Set) {
            pairs.push(format!("bandwidth:{level}"));
        }
    }

    let subject_anchor = match statement.family {
        Family::Anchor => statement.subject.parse::<AnchorRef>().ok(),
        _ => None,
    };
    for anchor in &statement.anchors {
        if Some(*anchor) != subject_anchor {
            pairs.push(format!("anchor:{anchor}"));
        }
    }

    if statement.intent != default_intent(statement.family, &statement.subject) {
        if let Some(tag) = statement.intent {
            pairs.push(format!("intent:{}", tag.as_str()));
        }
    }

    for (key, value) in &statement.args {
        if value == "true" {
            pairs.push(key.clone());
        } else {
            pairs.push(format!("{key}:{}", render_value(value)));
        }
    }

    pairs
}

fn render_card(card: &CardRef) -> String {
    match card {
        CardRef::Id(id) if !is_plain(id) => quote(id),
        CardRef::Id(id) if !reads_back_as_id(id) => quote(id),
        other => format!("card:{other}"),
    }
}

/// Bare ids that look like selectors must be quoted to stay literal.
fn reads_back_as_id(id: &str) -> bool {
    matches!(CardRef::parse_item(id), Ok(CardRef::Id(ref parsed)) if parsed == id)
}

fn render_value(value: &str) -> String {
    if is_plain(value) {
        value.to_string()
    } else {
        quote(value)
    }
}

/// A word the lexer reads back as a single token.
fn is_plain(text: &str) -> bool {
    !text.is_empty()
        && text.chars().all(|c| !c.is_whitespace() && !matches!(c, '"' | '[' | ']' | ',' | '|'))
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
