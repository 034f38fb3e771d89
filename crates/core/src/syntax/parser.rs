use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::lexer::{tokenize, Token, TokenKind};
use super::{
    default_intent, AnchorRef, CardRef, Family, IntentTag, Level, PersonaRef, Statement, Verb,
};

/// Malformed ritual line. Fatal to that line only.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("syntax error{} at column {column}: {message} (near '{token}')", line_suffix(.line))]
pub struct SyntaxError {
    pub message: String,
    /// Offending token as written.
    pub token: String,
    /// 1-based character column.
    pub column: usize,
    /// 1-based line number, when parsed as part of a program.
    pub line: Option<usize>,
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" on line {l}")).unwrap_or_default()
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, token: impl Into<String>, column: usize) -> Self {
        Self { message: message.into(), token: token.into(), column, line: None }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    fn at(token: &Token, message: impl Into<String>) -> Self {
        Self::new(message, token.describe(), token.column)
    }
}

/// Parse one line. Blank lines and comments (`#` or `//`) yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Statement>, SyntaxError> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
        return Ok(None);
    }
    let tokens = tokenize(line)?;
    let statement = Parser { tokens: &tokens, pos: 0 }.statement()?;
    debug!(keyword = %statement.keyword(), subject = %statement.subject, "parsed ritual statement");
    Ok(Some(statement))
}

/// A statement (or syntax error) together with its 1-based source line.
#[derive(Debug, Clone)]
pub struct ParsedLine {
    pub line: usize,
    pub result: Result<Statement, SyntaxError>,
}

/// Parse every line of a program, skipping comments and blank lines.
pub fn parse_program(text: &str) -> Vec<ParsedLine> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line_no = idx + 1;
            match parse(line) {
                Ok(Some(statement)) => Some(ParsedLine { line: line_no, result: Ok(statement) }),
                Ok(None) => None,
                Err(err) => {
                    Some(ParsedLine { line: line_no, result: Err(err.with_line(line_no)) })
                }
            }
        })
        .collect()
}

struct Pair {
    key: String,
    value: String,
    column: usize,
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn statement(mut self) -> Result<Statement, SyntaxError> {
        let head = self.next().ok_or_else(|| SyntaxError::new("empty statement", "", 1))?;
        let (family, verb) = keyword(head)?;

        let mut subject = None;
        if let Some(token) = self.peek() {
            if let TokenKind::Quoted(text) = &token.kind {
                subject = Some((text.clone(), token));
                self.pos += 1;
            }
        }

        let mut memory_refs = Vec::new();
        if let Some(open) = self.peek() {
            if open.kind == TokenKind::LBracket {
                self.pos += 1;
                memory_refs = self.card_list(open)?;
            }
        }

        let mut pairs = Vec::new();
        if let Some(pipe) = self.peek() {
            if pipe.kind == TokenKind::Pipe {
                self.pos += 1;
                pairs = self.pairs(pipe)?;
            }
        }

        if let Some(extra) = self.next() {
            return Err(SyntaxError::at(extra, "unexpected token"));
        }

        build(family, verb, head, subject, memory_refs, pairs)
    }

    fn card_list(&mut self, open: &Token) -> Result<Vec<CardRef>, SyntaxError> {
        let mut refs = Vec::new();
        loop {
            let token = self
                .next()
                .ok_or_else(|| SyntaxError::at(open, "unterminated card list"))?;
            let item = match &token.kind {
                TokenKind::RBracket if refs.is_empty() => break,
                TokenKind::Word(w) if w == "card:" => match self.next().map(|t| &t.kind) {
                    Some(TokenKind::Word(rest)) => card_word(rest, token)?,
                    Some(TokenKind::Quoted(rest)) => quoted_card(rest, token)?,
                    _ => return Err(SyntaxError::at(token, "expected card reference")),
                },
                TokenKind::Word(w) => card_word(w, token)?,
                TokenKind::Quoted(q) => quoted_card(q, token)?,
                _ => return Err(SyntaxError::at(token, "expected card reference")),
            };
            refs.push(item);

            match self.next() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::RBracket => break,
                Some(other) => return Err(SyntaxError::at(other, "expected ',' or ']'")),
                None => return Err(SyntaxError::at(open, "unterminated card list")),
            }
        }
        Ok(refs)
    }

    fn pairs(&mut self, pipe: &Token) -> Result<Vec<Pair>, SyntaxError> {
        let mut pairs = Vec::new();
        if self.peek().is_none() {
            return Err(SyntaxError::at(pipe, "expected key:value pairs after '|'"));
        }
        while let Some(token) = self.next() {
            pairs.push(self.pair(token)?);
            match self.peek() {
                Some(t) if t.kind == TokenKind::Comma => self.pos += 1,
                None => break,
                Some(other) => return Err(SyntaxError::at(other, "expected ',' between pairs")),
            }
        }
        Ok(pairs)
    }

    fn pair(&mut self, token: &Token) -> Result<Pair, SyntaxError> {
        let word = match &token.kind {
            TokenKind::Word(w) => w,
            _ => return Err(SyntaxError::at(token, "expected key")),
        };

        let (key, rest) = match word.split_once(':') {
            Some((k, r)) => (k.to_string(), Some(r.to_string())),
            None => match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Word(w)) if w.starts_with(':') => {
                    self.pos += 1;
                    (word.clone(), Some(w[1..].to_string()))
                }
                _ => (word.clone(), None),
            },
        };
        if key.is_empty() {
            return Err(SyntaxError::at(token, "empty key"));
        }

        let value = match rest {
            None => "true".to_string(),
            Some(r) if !r.is_empty() => r,
            Some(_) => match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Word(w)) | Some(TokenKind::Quoted(w)) => {
                    self.pos += 1;
                    w.clone()
                }
                _ => String::new(),
            },
        };

        Ok(Pair { key, value, column: token.column })
    }
}

fn keyword(head: &Token) -> Result<(Family, Verb), SyntaxError> {
    let word = match &head.kind {
        TokenKind::Word(w) => w,
        _ => return Err(SyntaxError::at(head, "expected family.verb")),
    };
    let (family_text, verb_text) = word
        .split_once('.')
        .ok_or_else(|| SyntaxError::at(head, "expected family.verb"))?;
    let family: Family = family_text.parse().map_err(|_| {
        SyntaxError::new(format!("unknown family '{family_text}'"), family_text, head.column)
    })?;
    let verb_column = head.column + family_text.chars().count() + 1;
    let verb = verb_text
        .parse::<Verb>()
        .ok()
        .filter(|v| family.allows(*v))
        .ok_or_else(|| {
            SyntaxError::new(
                format!("unknown verb '{verb_text}' for family '{family_text}'"),
                verb_text,
                verb_column,
            )
        })?;
    Ok((family, verb))
}

fn card_word(word: &str, token: &Token) -> Result<CardRef, SyntaxError> {
    CardRef::parse_item(word).map_err(|msg| SyntaxError::at(token, msg))
}

fn quoted_card(text: &str, token: &Token) -> Result<CardRef, SyntaxError> {
    if text.is_empty() {
        return Err(SyntaxError::at(token, "empty card reference"));
    }
    Ok(CardRef::Id(text.to_string()))
}

fn build(
    family: Family,
    verb: Verb,
    head: &Token,
    subject: Option<(String, &Token)>,
    memory_refs: Vec<CardRef>,
    pairs: Vec<Pair>,
) -> Result<Statement, SyntaxError> {
    let subject_text = subject.as_ref().map(|(s, _)| s.clone()).unwrap_or_default();
    let mut statement = Statement {
        family,
        verb,
        subject: subject_text.clone(),
        intent: default_intent(family, &subject_text),
        args: BTreeMap::new(),
        anchors: BTreeSet::new(),
        voice: None,
        bandwidth: None,
        memory_refs,
    };

    match (family, verb) {
        (Family::Voice, Verb::Use) => {
            let (text, token) = require_subject(&subject, head, "persona")?;
            let persona = text.parse::<PersonaRef>().map_err(|m| SyntaxError::at(token, m))?;
            statement.voice = Some(persona);
        }
        (Family::Bandwidth, Verb::Set) => {
            let (text, token) = require_subject(&subject, head, "level")?;
            let level = text.parse::<Level>().map_err(|m| SyntaxError::at(token, m))?;
            statement.bandwidth = Some(level);
        }
        (Family::Anchor, _) => {
            let (text, token) = require_subject(&subject, head, "anchor")?;
            let anchor = text.parse::<AnchorRef>().map_err(|m| SyntaxError::at(token, m))?;
            statement.anchors.insert(anchor);
        }
        (Family::Archive, Verb::Access) if statement.memory_refs.is_empty() => {
            return Err(SyntaxError::at(
                head,
                "archive.access requires at least one card reference",
            ));
        }
        _ => {}
    }

    for pair in pairs {
        let here = |msg: String| {
            SyntaxError::new(msg, format!("{}:{}", pair.key, pair.value), pair.column)
        };
        match pair.key.as_str() {
            "voice" => {
                let persona = pair.value.parse::<PersonaRef>().map_err(here)?;
                if statement.voice.as_ref().is_some_and(|v| *v != persona) {
                    return Err(here(format!("conflicting voice '{persona}'")));
                }
                statement.voice = Some(persona);
            }
            "bandwidth" => {
                let level = pair.value.parse::<Level>().map_err(here)?;
                if statement.bandwidth.is_some_and(|b| b != level) {
                    return Err(here(format!("conflicting bandwidth '{level}'")));
                }
                statement.bandwidth = Some(level);
            }
            "anchor" => {
                let anchor = pair.value.parse::<AnchorRef>().map_err(here)?;
                statement.anchors.insert(anchor);
            }
            "intent" => {
                let tag = pair.value.parse::<IntentTag>().map_err(here)?;
                statement.intent = Some(tag);
            }
            _ => {
                if statement.args.contains_key(&pair.key) {
                    return Err(here(format!("duplicate argument '{}'", pair.key)));
                }
                statement.args.insert(pair.key.clone(), pair.value.clone());
            }
        }
    }

    Ok(statement)
}

fn require_subject<'t>(
    subject: &Option<(String, &'t Token)>,
    head: &Token,
    what: &str,
) -> Result<(String, &'t Token), SyntaxError> {
    subject.clone().ok_or_else(|| {
        SyntaxError::at(head, format!("{} requires a quoted {what}", head.describe()))
    })
}
