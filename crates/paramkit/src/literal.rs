//! Reader for literal expressions handed to the `py` type.
//!
//! Only literals are understood: `None`, `True`, `False`, numbers, quoted
//! strings, lists, tuples (read as lists) and dicts. Names, calls and
//! operators are rejected.

use crate::value::Value;
use indexmap::IndexMap;
use std::iter::Peekable;
use std::str::CharIndices;

/// Deepest container nesting a literal may use.
pub const MAX_DEPTH: usize = 200;

/// Read one literal; trailing input other than whitespace is an error.
pub fn eval(source: &str) -> Result<Value, String> {
    let mut reader = Reader {
        source,
        chars: source.char_indices().peekable(),
        depth: 0,
    };
    let value = reader.value()?;
    reader.skip_ws();
    match reader.chars.peek() {
        None => Ok(value),
        Some(&(pos, c)) => Err(format!("unexpected '{c}' at position {pos}")),
    }
}

struct Reader<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |(pos, _)| *pos)
    }

    fn expect(&mut self, wanted: char) -> Result<(), String> {
        self.skip_ws();
        match self.chars.next() {
            Some((_, c)) if c == wanted => Ok(()),
            Some((pos, c)) => Err(format!("expected '{wanted}' at position {pos}, got '{c}'")),
            None => Err(format!("expected '{wanted}', got end of input")),
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        let Some(&(pos, c)) = self.chars.peek() else {
            return Err("unexpected end of input".to_string());
        };
        match c {
            '[' | '(' | '{' => {
                self.chars.next();
                if self.depth == MAX_DEPTH {
                    return Err(format!("too many nested containers at position {pos}"));
                }
                self.depth += 1;
                let value = match c {
                    '[' => self.sequence(']').map(Value::List),
                    '(' => self.sequence(')').map(Value::List),
                    _ => self.dict(),
                };
                self.depth -= 1;
                value
            }
            '\'' | '"' => self.string().map(Value::Str),
            '+' | '-' | '.' | '0'..='9' => self.number(),
            c if c.is_alphabetic() || c == '_' => {
                let word = self.word();
                match word {
                    "None" => Ok(Value::None),
                    "True" => Ok(Value::Bool(true)),
                    "False" => Ok(Value::Bool(false)),
                    other => Err(format!("malformed literal '{other}' at position {pos}")),
                }
            }
            other => Err(format!("unexpected '{other}' at position {pos}")),
        }
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos();
        while self
            .chars
            .next_if(|(_, c)| c.is_alphanumeric() || *c == '_')
            .is_some()
        {}
        let end = self.pos();
        &self.source[start..end]
    }

    fn sequence(&mut self, close: char) -> Result<Vec<Value>, String> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.chars.next_if(|(_, c)| *c == close).is_some() {
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.chars.next_if(|(_, c)| *c == ',').is_none() {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn dict(&mut self) -> Result<Value, String> {
        let mut map = IndexMap::new();
        loop {
            self.skip_ws();
            if self.chars.next_if(|(_, c)| *c == '}').is_some() {
                return Ok(Value::Dict(map));
            }
            let key = match self.value()? {
                Value::Str(s) => s,
                other => other.to_string(),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            if self.chars.next_if(|(_, c)| *c == ',').is_none() {
                self.expect('}')?;
                return Ok(Value::Dict(map));
            }
        }
    }

    fn string(&mut self) -> Result<String, String> {
        let Some((start, quote)) = self.chars.next() else {
            return Err("unexpected end of input".to_string());
        };
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return Err(format!("unterminated string starting at position {start}")),
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, '0')) => out.push('\0'),
                    Some((_, c @ ('\\' | '\'' | '"'))) => out.push(c),
                    Some((_, c)) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => return Err(format!("unterminated string starting at position {start}")),
                },
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos();
        self.chars.next_if(|(_, c)| matches!(c, '+' | '-'));
        let mut is_float = false;
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.chars.next();
                    self.chars.next_if(|(_, c)| matches!(c, '+' | '-'));
                    continue;
                }
                _ => break,
            }
            self.chars.next();
        }
        let end = self.pos();
        let text = self.source[start..end].replace('_', "");
        let parsed = if is_float {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            // past the i64 range an integer degrades to a float
            text.parse::<i64>()
                .map(Value::Int)
                .or_else(|_| text.parse::<f64>().map(Value::Float))
                .ok()
        };
        parsed.ok_or_else(|| format!("malformed number '{}'", &self.source[start..end]))
    }
}
