//! Strict literal decoder
//!
//! Some corpus dumps write one record per line as a Python literal (single
//! quoted strings, `True`/`None`, ...) rather than JSON. This module decodes
//! exactly that data subset into a [`serde_json::Value`] and nothing more: no
//! names, calls, operators or tuples are accepted, so input is never treated
//! as code.
//!
//! Grammar:
//!
//!     <value>  = <dict> | <list> | <string> | <int> | <float> | <const>
//!     <dict>   = "{" (<string> ":" <value> ("," <string> ":" <value>)* ","?)? "}"
//!     <list>   = "[" (<value> ("," <value>)* ","?)? "]"
//!     <const>  = True | False | None | true | false | null
//!
//! JSON is a subset of what this accepts.

use logos::Logos;
use serde_json::{Map, Number, Value};
use std::ops::Range;
use thiserror::Error;

/// Failure to decode a literal line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiteralError {
    #[error("unrecognized input at byte {}", .0.start)]
    Unrecognized(Range<usize>),
    #[error("expected {expected} at byte {position}")]
    Unexpected {
        expected: &'static str,
        position: usize,
    },
    #[error("bad escape sequence in string at byte {0}")]
    BadEscape(usize),
    #[error("number out of range at byte {0}")]
    BadNumber(usize),
    #[error("trailing input at byte {0}")]
    Trailing(usize),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token<'s> {
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("True")]
    #[token("true")]
    True,
    #[token("False")]
    #[token("false")]
    False,
    #[token("None")]
    #[token("null")]
    Null,
    #[regex(r"-?[0-9]+", |lex| lex.slice())]
    Int(&'s str),
    #[regex(r"-?([0-9]+\.[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"-?[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice())]
    Float(&'s str),
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice())]
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    Str(&'s str),
}

/// Decode one literal (typically one input line).
pub fn parse(source: &str) -> Result<Value, LiteralError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => return Err(LiteralError::Unrecognized(lexer.span())),
        }
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
    };
    let value = parser.value()?;
    if let Some((_, span)) = parser.tokens.get(parser.pos) {
        return Err(LiteralError::Trailing(span.start));
    }
    Ok(value)
}

struct Parser<'s> {
    tokens: Vec<(Token<'s>, Range<usize>)>,
    pos: usize,
    end: usize,
}

impl<'s> Parser<'s> {
    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn bump(&mut self) -> Option<(Token<'s>, Range<usize>)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn expect(&mut self, wanted: Token<'s>, expected: &'static str) -> Result<(), LiteralError> {
        let position = self.position();
        match self.bump() {
            Some((token, _)) if token == wanted => Ok(()),
            _ => Err(LiteralError::Unexpected { expected, position }),
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        let position = self.position();
        let (token, span) = self.bump().ok_or(LiteralError::Unexpected {
            expected: "a value",
            position,
        })?;
        match token {
            Token::OpenBrace => self.dict(),
            Token::OpenBracket => self.list(),
            Token::Str(raw) => Ok(Value::String(unescape(raw, span.start)?)),
            Token::Int(raw) => match raw.parse::<i64>() {
                Ok(n) => Ok(Value::Number(n.into())),
                Err(_) => float(raw, span.start),
            },
            Token::Float(raw) => float(raw, span.start),
            Token::True => Ok(Value::Bool(true)),
            Token::False => Ok(Value::Bool(false)),
            Token::Null => Ok(Value::Null),
            _ => Err(LiteralError::Unexpected {
                expected: "a value",
                position,
            }),
        }
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        let mut map = Map::new();
        loop {
            if self.peek() == Some(&Token::CloseBrace) {
                self.bump();
                return Ok(Value::Object(map));
            }
            let position = self.position();
            let key = match self.bump() {
                Some((Token::Str(raw), span)) => unescape(raw, span.start)?,
                _ => {
                    return Err(LiteralError::Unexpected {
                        expected: "a string key",
                        position,
                    })
                }
            };
            self.expect(Token::Colon, "':'")?;
            let value = self.value()?;
            map.insert(key, value);

            let position = self.position();
            match self.bump() {
                Some((Token::Comma, _)) => continue,
                Some((Token::CloseBrace, _)) => return Ok(Value::Object(map)),
                _ => {
                    return Err(LiteralError::Unexpected {
                        expected: "',' or '}'",
                        position,
                    })
                }
            }
        }
    }

    fn list(&mut self) -> Result<Value, LiteralError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&Token::CloseBracket) {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);

            let position = self.position();
            match self.bump() {
                Some((Token::Comma, _)) => continue,
                Some((Token::CloseBracket, _)) => return Ok(Value::Array(items)),
                _ => {
                    return Err(LiteralError::Unexpected {
                        expected: "',' or ']'",
                        position,
                    })
                }
            }
        }
    }
}

fn float(raw: &str, position: usize) -> Result<Value, LiteralError> {
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or(LiteralError::BadNumber(position))
}

/// Strip the quotes from a string token and resolve backslash escapes.
///
/// The dumps are reprs of byte strings, so a run of `\xNN` escapes spells
/// out UTF-8 bytes. A run that is not valid UTF-8 is read as Latin-1.
fn unescape(raw: &str, position: usize) -> Result<String, LiteralError> {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut bytes = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_bytes(&mut bytes, &mut out);
            out.push(c);
            continue;
        }
        let escaped = chars.next().ok_or(LiteralError::BadEscape(position))?;
        if escaped == 'x' {
            let byte = hex_value(&mut chars, 2, position)?;
            bytes.push(byte as u8);
            continue;
        }
        flush_bytes(&mut bytes, &mut out);
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' | '/' => out.push(escaped),
            'u' => out.push(hex_char(&mut chars, 4, position)?),
            'U' => out.push(hex_char(&mut chars, 8, position)?),
            _ => {
                out.push('\\');
                out.push(escaped);
            }
        }
    }
    flush_bytes(&mut bytes, &mut out);
    Ok(out)
}

fn flush_bytes(bytes: &mut Vec<u8>, out: &mut String) {
    if bytes.is_empty() {
        return;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => out.push_str(text),
        Err(_) => out.extend(bytes.iter().map(|&b| char::from(b))),
    }
    bytes.clear();
}

fn hex_value(
    chars: &mut std::str::Chars<'_>,
    digits: usize,
    position: usize,
) -> Result<u32, LiteralError> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err(LiteralError::BadEscape(position));
    }
    u32::from_str_radix(&hex, 16).map_err(|_| LiteralError::BadEscape(position))
}

fn hex_char(
    chars: &mut std::str::Chars<'_>,
    digits: usize,
    position: usize,
) -> Result<char, LiteralError> {
    char::from_u32(hex_value(chars, digits, position)?).ok_or(LiteralError::BadEscape(position))
}
