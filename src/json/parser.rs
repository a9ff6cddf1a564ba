//! Recursive-descent JSON parser.
//!
//! Produces [`Value`] trees. Integer literals that fit in an `i64` become
//! [`Number::Int`]; anything with a fraction, an exponent, or too many digits
//! becomes [`Number::Float`].
//!
//! The parser stops after the first complete top-level value. Anything that
//! follows it is ignored.

use super::error::{Error, Result};
use super::value::{Map, Number, Value};

/// Maximum nesting depth of arrays and objects.
pub const MAX_DEPTH: usize = 128;

/// Parses a JSON document into a [`Value`].
///
/// # Errors
///
/// Returns [`Error::Parse`] if the text is not well-formed JSON or nests
/// deeper than [`MAX_DEPTH`].
pub fn from_str(text: &str) -> Result<Value> {
    let mut parser = Parser::new(text);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(Error::parse(0, "empty input"));
    }
    parser.parse_value()
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    const fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.pos, message)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        match self.next_byte() {
            Some(b) if b == expected => Ok(()),
            Some(b) => {
                self.pos -= 1;
                Err(self.error(format!(
                    "expected '{}', found '{}'",
                    char::from(expected),
                    char::from(b)
                )))
            }
            None => Err(self.error(format!(
                "expected '{}', found end of input",
                char::from(expected)
            ))),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number().map(Value::Number),
            Some(b) => Err(self.error(format!("unexpected character '{}'", char::from(b)))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> Result<Value> {
        if self.src[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(value)
        } else {
            Err(self.error(format!("invalid literal, expected '{word}'")))
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {MAX_DEPTH} levels")));
        }
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.enter()?;
        self.expect(b'{')?;
        let mut map = Map::new();

        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Object(map));
        }

        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.error("object keys must be double-quoted strings"));
            }
            let key = self.parse_string()?;
            self.skip_whitespace();
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.next_byte() {
                Some(b',') => {}
                Some(b'}') => break,
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error("expected ',' or '}' in object"));
                }
                None => return Err(self.error("unterminated object")),
            }
        }

        self.depth -= 1;
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.enter()?;
        self.expect(b'[')?;
        let mut items = Vec::new();

        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.next_byte() {
                Some(b',') => {}
                Some(b']') => break,
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error("expected ',' or ']' in array"));
                }
                None => return Err(self.error("unterminated array")),
            }
        }

        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn parse_string(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut out = String::new();

        loop {
            // Copy the run of plain characters in one go. Both stop bytes are
            // ASCII, so `start..pos` always lies on char boundaries.
            let start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'"' || b == b'\\' {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&self.src[start..self.pos]);

            match self.next_byte() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => self.parse_escape(&mut out)?,
                _ => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        let Some(c) = self.src[self.pos..].chars().next() else {
            return Err(self.error("unterminated escape sequence"));
        };
        self.pos += c.len_utf8();

        match c {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'u' => out.push(self.parse_unicode_escape()?),
            // '"', '\\', '/' and anything unrecognised stand for themselves.
            other => out.push(other),
        }
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u16> {
        let digits = self
            .src
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated \\u escape"))?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(self.error(format!("invalid \\u escape '{digits}'")));
        }
        let code = u16::from_str_radix(digits, 16)
            .map_err(|_| self.error(format!("invalid \\u escape '{digits}'")))?;
        self.pos += 4;
        Ok(code)
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let first = self.parse_hex4()?;

        if (0xD800..0xDC00).contains(&first) {
            // High surrogate: a low surrogate escape must follow.
            if self.src[self.pos..].starts_with("\\u") {
                self.pos += 2;
                let second = self.parse_hex4()?;
                if (0xDC00..0xE000).contains(&second) {
                    let combined =
                        0x10000 + ((u32::from(first) - 0xD800) << 10) + (u32::from(second) - 0xDC00);
                    return char::from_u32(combined)
                        .ok_or_else(|| self.error("invalid surrogate pair"));
                }
            }
            return Err(self.error("unpaired surrogate in \\u escape"));
        }

        char::from_u32(u32::from(first)).ok_or_else(|| self.error("unpaired surrogate in \\u escape"))
    }

    fn parse_number(&mut self) -> Result<Number> {
        let start = self.pos;
        let mut is_float = false;

        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let int_start = self.pos;
        if !self.consume_digits() {
            return Err(self.error("expected digit"));
        }
        if self.pos - int_start > 1 && self.src.as_bytes()[int_start] == b'0' {
            return Err(Error::parse(int_start, "leading zeros are not allowed"));
        }
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            if !self.consume_digits() {
                return Err(self.error("expected digit after decimal point"));
            }
        }
        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if !self.consume_digits() {
                return Err(self.error("expected digit in exponent"));
            }
        }

        let literal = &self.src[start..self.pos];
        if !is_float {
            if let Ok(n) = literal.parse::<i64>() {
                return Ok(Number::Int(n));
            }
        }
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| Error::parse(start, format!("invalid number '{literal}'")))
    }

    fn consume_digits(&mut self) -> bool {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        self.pos > start
    }
}
