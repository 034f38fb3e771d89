use super::parser::SyntaxError;

/// Token kinds produced for a single ritual line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Maximal run of characters outside quotes that are not whitespace or punctuation.
    Word(String),
    /// Contents of a `"..."` segment with escapes resolved.
    Quoted(String),
    LBracket,
    RBracket,
    Comma,
    Pipe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// 1-based character column of the first character of the token.
    pub column: usize,
}

impl Token {
    /// Text used when naming this token in an error.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) => w.clone(),
            TokenKind::Quoted(q) => format!("\"{q}\""),
            TokenKind::LBracket => "[".into(),
            TokenKind::RBracket => "]".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Pipe => "|".into(),
        }
    }
}

fn is_punct(c: char) -> bool {
    matches!(c, '"' | '[' | ']' | ',' | '|')
}

/// Split one line into tokens. Whitespace outside quotes is dropped.
pub(crate) fn tokenize(line: &str) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let simple = match c {
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            '|' => Some(TokenKind::Pipe),
            _ => None,
        };
        if let Some(kind) = simple {
            tokens.push(Token { kind, column });
            i += 1;
            continue;
        }
        if c == '"' {
            let (text, next) = read_quoted(&chars, i)?;
            tokens.push(Token { kind: TokenKind::Quoted(text), column });
            i = next;
            continue;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && !is_punct(chars[i]) {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        tokens.push(Token { kind: TokenKind::Word(word), column });
    }

    Ok(tokens)
}

/// Read a quoted segment starting at `open` (the index of the opening quote).
///
/// Only `\"` and `\\` are escapes; any other backslash is kept verbatim.
fn read_quoted(chars: &[char], open: usize) -> Result<(String, usize), SyntaxError> {
    let mut out = String::new();
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((out, i + 1)),
            '\\' if matches!(chars.get(i + 1), Some('"') | Some('\\')) => {
                out.push(chars[i + 1]);
                i += 2;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(SyntaxError::new("unterminated quoted segment", "\"", open + 1))
}
