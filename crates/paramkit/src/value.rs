//! Runtime values held by options.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An option value after coercion (or a raw token before it).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Truthiness: `None`, `false`, zero, and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Dict(map) => !map.is_empty(),
        }
    }

    /// Quoted rendering used in messages: `'text'`, `None`, `True`, `[1, 2]`.
    pub fn repr(&self) -> Repr<'_> {
        Repr(self)
    }

    /// Merge `other` into `self` key by key; nested dicts merge recursively,
    /// anything else overwrites.
    pub(crate) fn deep_merge(target: &mut IndexMap<String, Value>, other: IndexMap<String, Value>) {
        for (key, value) in other {
            match value {
                Self::Dict(nested) => {
                    let slot = target
                        .entry(key)
                        .or_insert_with(|| Self::Dict(IndexMap::new()));
                    if !matches!(slot, Self::Dict(_)) {
                        *slot = Self::Dict(IndexMap::new());
                    }
                    if let Self::Dict(inner) = slot {
                        Self::deep_merge(inner, nested);
                    }
                }
                other => {
                    target.insert(key, other);
                }
            }
        }
    }
}

/// Plain rendering: strings are written bare, everything else as [`Repr`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => write!(f, "{}", other.repr()),
        }
    }
}

pub struct Repr<'a>(&'a Value);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write_float(f, *x),
            Value::Str(s) => write_quoted(f, s),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                f.write_str("]")
            }
            Value::Dict(map) => {
                f.write_str("{")?;
                for (idx, (key, item)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, key)?;
                    write!(f, ": {}", item.repr())?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("nan")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug keeps the trailing `.0` on whole numbers.
        write!(f, "{x:?}")
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{quote}")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => write!(f, "\\{c}")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self::Dict(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, Value)]) -> Value {
        Value::Dict(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn repr_matches_literal_syntax() {
        let v = Value::List(vec![
            Value::Int(1),
            Value::Float(1.0),
            Value::from("a"),
            Value::None,
            Value::Bool(true),
        ]);
        assert_eq!(v.repr().to_string(), "[1, 1.0, 'a', None, True]");
        assert_eq!(dict(&[("a", Value::Int(1))]).repr().to_string(), "{'a': 1}");
        assert_eq!(Value::from("it's").repr().to_string(), "\"it's\"");
    }

    #[test]
    fn display_leaves_strings_bare() {
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::Bool(false).to_string(), "False");
    }

    #[test]
    fn deep_merge_overlays_nested_keys() {
        let Value::Dict(mut target) = dict(&[(
            "a",
            dict(&[("b", Value::Int(2)), ("c", Value::Int(3))]),
        )]) else {
            unreachable!()
        };
        let Value::Dict(other) = dict(&[("a", dict(&[("b", Value::Int(1))]))]) else {
            unreachable!()
        };
        Value::deep_merge(&mut target, other);
        assert_eq!(
            Value::Dict(target),
            dict(&[("a", dict(&[("b", Value::Int(1)), ("c", Value::Int(3))]))])
        );
    }

    #[test]
    fn deep_merge_replaces_scalar_with_dict() {
        let Value::Dict(mut target) = dict(&[("a", Value::Int(1))]) else {
            unreachable!()
        };
        let Value::Dict(other) = dict(&[("a", dict(&[("x", Value::Int(2))]))]) else {
            unreachable!()
        };
        Value::deep_merge(&mut target, other);
        assert_eq!(Value::Dict(target), dict(&[("a", dict(&[("x", Value::Int(2))]))]));
    }

    #[test]
    fn serde_round_trips_json_shapes() {
        let v: Value = serde_json::from_str(r#"{"a": [1, 2.5, "x", null, true]}"#).unwrap();
        assert_eq!(
            v,
            dict(&[(
                "a",
                Value::List(vec![
                    Value::Int(1),
                    Value::Float(2.5),
                    Value::from("x"),
                    Value::None,
                    Value::Bool(true),
                ])
            )])
        );
        assert_eq!(serde_json::to_string(&Value::None).unwrap(), "null");
    }
}
