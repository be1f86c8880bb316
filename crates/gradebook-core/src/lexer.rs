//! Tokenizer for grade formulas.
//!
//! Recognises unsigned decimal numbers, identifiers, the four arithmetic
//! operators and parentheses. Signs are handled by the parser as unary
//! operators. Positions are character offsets into the formula text.

use crate::error::FormulaError;

/// A lexical token kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl TokenKind {
    /// Short human-readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Slash => "'/'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
        }
    }
}

/// A token with the character offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split a formula into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token { kind, position: i });
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            let mut seen_dot = false;
            let mut digits = 0usize;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    if seen_dot {
                        return Err(FormulaError::syntax(i, "unexpected second decimal point"));
                    }
                    seen_dot = true;
                } else {
                    digits += 1;
                }
                i += 1;
            }
            if digits == 0 {
                return Err(FormulaError::syntax(start, "decimal point without digits"));
            }
            if i < chars.len() && is_ident_start(chars[i]) {
                return Err(FormulaError::syntax(
                    i,
                    format!("unexpected character '{}' after number", chars[i]),
                ));
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| FormulaError::syntax(start, format!("invalid number '{text}'")))?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                position: start,
            });
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(chars[start..i].iter().collect()),
                position: start,
            });
            continue;
        }

        return Err(FormulaError::syntax(i, format!("unexpected character '{c}'")));
    }

    Ok(tokens)
}
