//! Value coercion against a type descriptor.

use crate::error::TypeError;
use crate::literal;
use crate::types::{Primary, TypeDescriptor};
use crate::value::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Rules `auto` tries in order; the first matching pattern picks the type,
/// anything left over is a `str`. `"true"` must be seen as a bool before it
/// falls through to a string, and integers before floats.
static AUTO_RULES: LazyLock<Vec<(Regex, Primary)>> = LazyLock::new(|| {
    [
        (r"^(?:none|None)$", Primary::NoneType),
        (r"^[+-]?\d+$", Primary::Int),
        (r"^[+-]?(?:\d*\.)?\d+(?:[Ee][+-]\d+)?$", Primary::Float),
        (
            r"^(?:True|TRUE|true|1|False|FALSE|false|0|None|none)$",
            Primary::Bool,
        ),
        (r"^(?:py|repr):(.+)$", Primary::Py),
    ]
    .into_iter()
    .map(|(pattern, primary)| (Regex::new(pattern).expect("static regex must compile"), primary))
    .collect()
});

const TRUE_WORDS: [&str; 4] = ["True", "TRUE", "true", "1"];
const FALSE_WORDS: [&str; 6] = ["False", "FALSE", "false", "0", "None", "none"];

/// The type `auto` settles on for a raw string.
pub fn infer(raw: &str) -> Primary {
    AUTO_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(raw))
        .map_or(Primary::Str, |(_, primary)| *primary)
}

/// Whether `value` is one of the accepted bool spellings.
pub fn is_bool_literal(value: &Value) -> bool {
    to_bool(value).is_some()
}

/// Coerce `value` to `ty`. `name` is only consulted by `verbose`, where a
/// repetition of the option's own name counts up.
pub fn coerce(value: Value, ty: &TypeDescriptor, name: Option<&str>) -> Result<Value, TypeError> {
    let fail = |value: &Value| TypeError::Coerce {
        value: value.repr().to_string(),
        ty: ty.to_string(),
    };

    match ty.primary() {
        Primary::Int => match value {
            Value::None => Ok(Value::None),
            Value::Int(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
            Value::Str(ref s) => parse_int(s).map(Value::Int).ok_or_else(|| fail(&value)),
            other => Err(fail(&other)),
        },
        Primary::Float => match value {
            Value::None => Ok(Value::None),
            Value::Float(_) => Ok(value),
            Value::Int(i) => Ok(Value::Float(i as f64)),
            Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
            Value::Str(ref s) => s
                .trim()
                .replace('_', "")
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| fail(&value)),
            other => Err(fail(&other)),
        },
        Primary::Str => match value {
            Value::None | Value::Str(_) => Ok(value),
            other => Ok(Value::Str(other.to_string())),
        },
        Primary::Bool => to_bool(&value).map(Value::Bool).ok_or_else(|| fail(&value)),
        Primary::NoneType => match &value {
            Value::None => Ok(Value::None),
            Value::Str(s) if s == "none" || s == "None" => Ok(Value::None),
            _ => Err(fail(&value)),
        },
        Primary::Py => match value {
            Value::Str(ref s) => {
                let source = s
                    .strip_prefix("py:")
                    .or_else(|| s.strip_prefix("repr:"))
                    .unwrap_or(s);
                literal::eval(source).map_err(|_| fail(&value))
            }
            // already a literal
            other => Ok(other),
        },
        Primary::Auto => match value {
            Value::Str(ref s) => match infer(s) {
                // integers past the i64 range are kept as floats
                Primary::Int if parse_int(s).is_none() => {
                    coerce(value, &TypeDescriptor::scalar(Primary::Float), name)
                }
                inferred => coerce(value, &TypeDescriptor::scalar(inferred), name),
            },
            other => Ok(other),
        },
        Primary::Dict => match value {
            Value::None | Value::Dict(_) => Ok(value),
            other if !other.is_truthy() => Ok(Value::Dict(IndexMap::new())),
            Value::List(ref items) => pairs_to_dict(items).ok_or_else(|| fail(&value)),
            other => Err(fail(&other)),
        },
        Primary::List => coerce_list(value, ty),
        Primary::Verbose => match value {
            Value::None => Ok(Value::Int(0)),
            Value::Int(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(i64::from(b))),
            Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
            Value::Str(ref s) if s.is_empty() => Ok(Value::Int(1)),
            Value::Str(ref s) if s.chars().all(|c| c.is_ascii_digit()) => {
                s.parse().map(Value::Int).map_err(|_| fail(&value))
            }
            Value::Str(ref s) => match name {
                Some(name) if !name.is_empty() && s.matches(name).count() == s.chars().count() => {
                    Ok(Value::Int(s.chars().count() as i64 + 1))
                }
                _ => Err(fail(&value)),
            },
            other => Err(fail(&other)),
        },
        Primary::Reset => Err(fail(&value)),
    }
}

fn coerce_list(value: Value, ty: &TypeDescriptor) -> Result<Value, TypeError> {
    let items = match value {
        Value::None => return Ok(Value::None),
        Value::List(items) => items,
        Value::Dict(map) => map.into_keys().map(Value::Str).collect(),
        scalar => vec![scalar],
    };
    match ty.secondary().unwrap_or(Primary::Auto) {
        Primary::Reset => Ok(Value::List(items)),
        Primary::List => {
            if matches!(items.first(), Some(Value::List(_))) {
                Ok(Value::List(items))
            } else {
                Ok(Value::List(vec![Value::List(items)]))
            }
        }
        secondary => {
            let element = TypeDescriptor::scalar(secondary);
            items
                .into_iter()
                .map(|item| coerce(item, &element, None))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::None => Some(false),
        Value::Int(1) => Some(true),
        Value::Int(0) => Some(false),
        Value::Float(x) if *x == 1.0 => Some(true),
        Value::Float(x) if *x == 0.0 => Some(false),
        Value::Str(s) if TRUE_WORDS.contains(&s.as_str()) => Some(true),
        Value::Str(s) if FALSE_WORDS.contains(&s.as_str()) => Some(false),
        _ => None,
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.starts_with('_') || trimmed.ends_with('_') || trimmed.contains("__") {
        return None;
    }
    trimmed.replace('_', "").parse().ok()
}

/// `[[k, v], ...]` into an ordered dict.
fn pairs_to_dict(items: &[Value]) -> Option<Value> {
    let mut map = IndexMap::new();
    for item in items {
        let Value::List(pair) = item else {
            return None;
        };
        let [key, value] = pair.as_slice() else {
            return None;
        };
        map.insert(key.to_string(), value.clone());
    }
    Some(Value::Dict(map))
}
