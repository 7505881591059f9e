//! Lexical tokens of a node's source extent.

use smol_str::SmolStr;
use std::fmt;

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Bool",
    "_Static_assert",
];

/// libclang token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: SmolStr,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_punct(&self, spelling: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.spelling == spelling
    }

    /// Split C text into tokens the way libclang classifies them.
    ///
    /// Used for type spellings and hand-built trees; the front-end takes
    /// macro tokens straight from libclang.
    pub fn lex(text: &str) -> Vec<Token> {
        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            let start = i;

            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }

            let kind = if c.is_ascii_alphabetic() || c == b'_' {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                if C_KEYWORDS.contains(&&text[start..i]) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                }
            } else if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    i += 1;
                }
                TokenKind::Literal
            } else if c == b'"' || c == b'\'' {
                i += 1;
                while i < bytes.len() && bytes[i] != c {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                TokenKind::Literal
            } else if text[i..].starts_with("/*") {
                i = text[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 2);
                TokenKind::Comment
            } else {
                i += punct_len(&text[i..]);
                TokenKind::Punctuation
            };

            tokens.push(Token::new(kind, &text[start..i]));
        }

        tokens
    }
}

/// Length of the punctuator at the start of `text`.
fn punct_len(text: &str) -> usize {
    const MULTI: &[&str] = &[
        "...", "<<=", ">>=", "##", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&",
        "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    ];
    MULTI
        .iter()
        .find(|op| text.starts_with(**op))
        .map_or_else(|| text.chars().next().map_or(1, char::len_utf8), |op| op.len())
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelling)
    }
}
