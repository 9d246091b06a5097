use super::text::LineIndex;
use super::tree::Span;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    String,
    Number,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub text: &'s str,
    pub span: Span,
}

impl Token<'_> {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::String && self.text == text
    }

    pub fn is_opener(&self) -> bool {
        self.kind == TokenKind::Punct && matches!(self.text, "(" | "[" | "{" | "{|")
    }

    pub fn is_closer(&self) -> bool {
        self.kind == TokenKind::Punct && matches!(self.text, ")" | "]" | "}" | "|}")
    }
}

// Longest match first.
const PUNCTUATION: &[&str] = &[
    "...", "..<", "===", "!==", "{|", "|}", "->", "=>", "==", "!=", "<=", ">=", "&&", "||", "+=",
    "-=", "*=", "/=", "?:", "?.", "..", "{", "}", "(", ")", "[", "]", ";", ",", "=", ":", ".",
    "<", ">", "+", "-", "*", "/", "%", "!", "?", "|", "&", "@", "^", "~", "$",
];

/// Splits `source` into tokens, dropping whitespace, `//` comments and `#`
/// documentation lines.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let index = LineIndex::new(source);
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if c == b'#' || (c == b'/' && bytes.get(pos + 1) == Some(&b'/')) {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }

        let start = pos;
        let kind = if c == b'"' || c == b'`' {
            pos = scan_string(bytes, pos, c).ok_or_else(|| {
                let at = index.position(start);
                ParseError::UnterminatedString {
                    line: at.line,
                    column: at.offset,
                }
            })?;
            TokenKind::String
        } else if c.is_ascii_digit() {
            pos = scan_number(bytes, pos);
            TokenKind::Number
        } else if c.is_ascii_alphabetic() || c == b'_' || c == b'\'' {
            pos += 1;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Ident
        } else if let Some(punct) = PUNCTUATION.iter().find(|p| source[pos..].starts_with(*p)) {
            pos += punct.len();
            TokenKind::Punct
        } else {
            let at = index.position(start);
            return Err(ParseError::UnexpectedCharacter {
                line: at.line,
                column: at.offset,
                found: source[pos..].chars().next().unwrap_or('\0'),
            });
        };

        tokens.push(Token {
            kind,
            text: &source[start..pos],
            span: index.span(start, pos),
        });
    }

    Ok(tokens)
}

/// Returns the offset just past the closing quote, or `None` when unterminated.
fn scan_string(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if quote == b'"' => pos += 2,
            b if b == quote => return Some(pos + 1),
            _ => pos += 1,
        }
    }
    None
}

fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() {
        let b = bytes[pos];
        let fraction = b == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
        if b.is_ascii_alphanumeric() || b == b'_' || fraction {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}
