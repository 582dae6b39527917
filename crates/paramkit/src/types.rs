//! Type descriptors: the canonical `primary:secondary` tags options carry.

use crate::error::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A type tag on its own, either side of the `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primary {
    Auto,
    Int,
    Float,
    Str,
    Bool,
    NoneType,
    Py,
    List,
    Dict,
    Verbose,
    Reset,
}

impl Primary {
    /// Resolve a spelling or one of its short aliases.
    pub fn from_alias(spelling: &str) -> Option<Self> {
        let primary = match spelling {
            "a" | "auto" => Self::Auto,
            "i" | "int" => Self::Int,
            "f" | "float" => Self::Float,
            "s" | "str" => Self::Str,
            "b" | "bool" => Self::Bool,
            "n" | "none" | "NoneType" => Self::NoneType,
            "p" | "py" | "python" => Self::Py,
            "l" | "list" | "array" => Self::List,
            "d" | "dict" | "box" => Self::Dict,
            "v" | "verb" | "verbose" => Self::Verbose,
            "r" | "reset" => Self::Reset,
            _ => return None,
        };
        Some(primary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::NoneType => "NoneType",
            Self::Py => "py",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Verbose => "verbose",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical type descriptor. Renders as `primary:secondary`, the secondary
/// part being empty when absent (`int:`, `list:str`, `list:list`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    primary: Primary,
    secondary: Option<Primary>,
}

impl TypeDescriptor {
    pub const AUTO: Self = Self::scalar(Primary::Auto);
    pub const BOOL: Self = Self::scalar(Primary::Bool);
    pub const DICT: Self = Self::scalar(Primary::Dict);
    pub const LIST: Self = Self::scalar(Primary::List);
    pub const LIST_LIST: Self = Self {
        primary: Primary::List,
        secondary: Some(Primary::List),
    };

    pub const fn scalar(primary: Primary) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    /// Build a descriptor from parts, enforcing the pairing rules.
    pub fn new(primary: Primary, secondary: Option<Primary>) -> Result<Self, TypeError> {
        let ty = Self { primary, secondary };
        let Some(secondary) = secondary else {
            return Ok(ty);
        };
        let spelling = ty.to_string();
        if primary == Primary::Reset {
            return Err(TypeError::descriptor(
                &spelling,
                "subtype not allowed for 'reset'",
            ));
        }
        if primary == Primary::Dict && secondary != Primary::Reset {
            return Err(TypeError::descriptor(
                &spelling,
                "only subtype 'reset' is allowed for 'dict'",
            ));
        }
        if secondary == Primary::List && primary != Primary::List {
            return Err(TypeError::descriptor(
                &spelling,
                "subtype 'list' is only allowed for 'list'",
            ));
        }
        if !matches!(primary, Primary::List | Primary::Dict) {
            return Err(TypeError::descriptor(
                &spelling,
                format!("subtype '{secondary}' is only allowed for list and dict"),
            ));
        }
        Ok(ty)
    }

    /// Normalize a spelling such as `l:i`, `array:str`, `verb` or `int:`.
    pub fn normalize(spelling: &str) -> Result<Self, TypeError> {
        let trimmed = spelling.trim_end_matches(':');
        let (first, second) = trimmed.split_once(':').unwrap_or((trimmed, ""));
        // only the first two parts are significant
        let second = second.split(':').next().unwrap_or_default();

        let primary = if first.is_empty() {
            Primary::Auto
        } else {
            Primary::from_alias(first).ok_or_else(|| {
                TypeError::descriptor(spelling, format!("unknown type '{first}'"))
            })?
        };
        let secondary = if second.is_empty() {
            None
        } else {
            Some(Primary::from_alias(second).ok_or_else(|| {
                TypeError::descriptor(spelling, format!("unknown subtype '{second}'"))
            })?)
        };
        Self::new(primary, secondary)
    }

    pub fn primary(&self) -> Primary {
        self.primary
    }

    pub fn secondary(&self) -> Option<Primary> {
        self.secondary
    }

    /// The descriptor with its secondary dropped (`list:int` -> `list:`).
    pub fn primary_only(&self) -> Self {
        Self::scalar(self.primary)
    }

    pub fn is_list_list(&self) -> bool {
        *self == Self::LIST_LIST
    }

    pub fn is_auto(&self) -> bool {
        *self == Self::AUTO
    }
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self::AUTO
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary {
            Some(secondary) => write!(f, "{}:{}", self.primary, secondary),
            None => write!(f, "{}:", self.primary),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let spelling = String::deserialize(deserializer)?;
        Self::normalize(&spelling).map_err(serde::de::Error::custom)
    }
}
