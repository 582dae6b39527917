//! A single option: its settled type and value, its description, and the
//! stack of frames that records what the command line pushed into it.

use crate::coerce::coerce;
use crate::error::{Error, Result, TypeError};
use crate::registry::Registry;
use crate::types::{Primary, TypeDescriptor};
use crate::value::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

/// Name of the option that collects positional values.
pub const POSITIONAL: &str = "_";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_,\-.]{1,255}$").expect("static regex must compile"));

/// Check an option name against the allowed grammar.
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::name(
            name,
            "expected 1 to 255 alphanumerics, commas, dots, dashes or underscores",
        ))
    }
}

/// One raw item recorded in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Value(Value),
    /// A dotted sub-option (`a.b.c`) whose dict form is merged into its
    /// root once it has been checked out.
    Path(String),
}

impl Entry {
    pub(crate) fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Path(path) => Value::Str(path),
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        self.clone().into_value()
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Entry {
    fn from(raw: &str) -> Self {
        Self::Value(Value::from(raw))
    }
}

/// A typed group of raw values pushed since the last type change.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub ty: TypeDescriptor,
    pub values: Vec<Entry>,
}

impl Frame {
    fn new(ty: TypeDescriptor, values: Vec<Entry>) -> Self {
        Self { ty, values }
    }

    /// Values a reset leaves behind: one empty sub-list for `list:list`.
    fn emptied(ty: TypeDescriptor) -> Self {
        let values = if ty.is_list_list() {
            vec![Entry::Value(Value::List(Vec::new()))]
        } else {
            Vec::new()
        };
        Self::new(ty, values)
    }

    fn raw(&self) -> Value {
        Value::List(self.values.iter().map(Entry::to_value).collect())
    }
}

/// What a callback decided about its option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Accept,
    Reject,
    Error(String),
}

impl From<()> for CallbackOutcome {
    fn from(_: ()) -> Self {
        Self::Accept
    }
}

impl From<bool> for CallbackOutcome {
    fn from(ok: bool) -> Self {
        if ok { Self::Accept } else { Self::Reject }
    }
}

impl From<&str> for CallbackOutcome {
    fn from(message: &str) -> Self {
        Self::Error(message.to_string())
    }
}

impl From<String> for CallbackOutcome {
    fn from(message: String) -> Self {
        Self::Error(message)
    }
}

impl<E: fmt::Display> From<std::result::Result<(), E>> for CallbackOutcome {
    fn from(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Accept,
            Err(err) => Self::Error(err.to_string()),
        }
    }
}

type SingleFn = dyn Fn(&mut Param) -> CallbackOutcome;
type WithRegistryFn = dyn Fn(&mut Param, &Registry) -> CallbackOutcome;

/// Hook run on an option after parsing. It may inspect or modify the option,
/// optionally looking at the rest of the registry.
#[derive(Clone)]
pub enum Callback {
    Single(Rc<SingleFn>),
    WithRegistry(Rc<WithRegistryFn>),
}

impl Callback {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut Param) -> R + 'static,
        R: Into<CallbackOutcome>,
    {
        Self::Single(Rc::new(move |param: &mut Param| f(param).into()))
    }

    pub fn with_registry<F, R>(f: F) -> Self
    where
        F: Fn(&mut Param, &Registry) -> R + 'static,
        R: Into<CallbackOutcome>,
    {
        Self::WithRegistry(Rc::new(move |param: &mut Param, registry: &Registry| {
            f(param, registry).into()
        }))
    }

    pub(crate) fn call(&self, param: &mut Param, registry: &Registry) -> CallbackOutcome {
        match self {
            Self::Single(f) => f(param),
            Self::WithRegistry(f) => f(param, registry),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(_) => f.write_str("Callback::Single(..)"),
            Self::WithRegistry(_) => f.write_str("Callback::WithRegistry(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: TypeDescriptor,
    value: Value,
    default: Value,
    desc: Vec<String>,
    required: bool,
    show: bool,
    callback: Option<Callback>,
    stack: Vec<Frame>,
    guarded: bool,
}

impl Param {
    /// An untyped option with no value (`auto`, `None`).
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self::unchecked(name))
    }

    fn unchecked(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: TypeDescriptor::AUTO,
            value: Value::None,
            default: Value::None,
            desc: Vec::new(),
            required: false,
            show: true,
            callback: None,
            stack: Vec::new(),
            guarded: false,
        }
    }

    /// A built-in option. The caller has already validated `name`.
    pub(crate) fn builtin(name: &str, value: impl Into<Value>, desc: &str) -> Self {
        let value = value.into();
        Self {
            ty: type_of(&value),
            default: value.clone(),
            value,
            desc: vec![desc.to_string()],
            ..Self::unchecked(name)
        }
    }

    /// An option whose type is taken from its initial value.
    pub fn with_value(name: &str, value: impl Into<Value>) -> Result<Self> {
        let mut param = Self::new(name)?;
        let value = value.into();
        param.ty = type_of(&value);
        param.default = value.clone();
        param.value = value;
        Ok(param)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> TypeDescriptor {
        self.ty
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn show(&self) -> bool {
        self.show
    }

    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }

    pub fn stack(&self) -> &[Frame] {
        &self.stack
    }

    pub fn is_positional(&self) -> bool {
        self.name == POSITIONAL
    }

    /// Description lines as given.
    pub fn desc_lines(&self) -> &[String] {
        &self.desc
    }

    /// Description lines for display, with the default appended unless the
    /// text already states one.
    pub fn description(&self) -> Vec<String> {
        let mut lines = self.desc.clone();
        if lines.is_empty() {
            lines.push(String::new());
        }
        let last_idx = lines.len() - 1;
        let last = lines[last_idx].trim_end().to_string();
        let mentions_default = last.contains("DEFAULT: ") || last.contains("Default: ");
        let default_line = format!("Default: {}", self.default.repr());
        if mentions_default || (self.required && self.default.is_none()) {
            lines[last_idx] = last;
        } else if last.chars().count() > 20 {
            lines[last_idx] = last;
            lines.push(default_line);
        } else if last.is_empty() {
            lines[last_idx] = default_line;
        } else {
            lines[last_idx] = format!("{last} {default_line}");
        }
        if lines.len() == 1 && lines[0].is_empty() {
            lines[0] = "[No description]".to_string();
        }
        lines
    }

    fn guard(&self) -> Result<()> {
        if self.guarded {
            Err(Error::name(
                &self.name,
                "cannot change a hidden option of a locked registry",
            ))
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_guarded(&mut self, guarded: bool) {
        self.guarded = guarded;
    }

    /// Set the value and the default together.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<&mut Self> {
        self.guard()?;
        self.value = value.into();
        self.default = self.value.clone();
        Ok(self)
    }

    /// Set the value only, leaving the default alone. With `update_type` the
    /// type is re-derived from the new value.
    pub fn set_value_only(&mut self, value: impl Into<Value>, update_type: bool) -> &mut Self {
        self.value = value.into();
        if update_type {
            self.ty = type_of(&self.value);
        }
        self
    }

    pub fn set_desc<I, S>(&mut self, lines: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.guard()?;
        self.desc = lines
            .into_iter()
            .flat_map(|line| {
                line.as_ref()
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(self)
    }

    pub fn set_required(&mut self, required: bool) -> Result<&mut Self> {
        self.guard()?;
        if self.ty == TypeDescriptor::BOOL {
            return Err(TypeError::RequiredBool {
                name: self.name.clone(),
            }
            .into());
        }
        if let Some(last) = self.desc.last_mut() {
            if let Some(stripped) = last.strip_suffix("Default: None") {
                *last = stripped.trim_end().to_string();
            }
        }
        self.required = required;
        Ok(self)
    }

    pub fn set_show(&mut self, show: bool) -> &mut Self {
        self.show = show;
        self
    }

    /// Normalize `spelling`, then coerce the current value to it.
    pub fn set_type(&mut self, spelling: &str) -> Result<&mut Self> {
        let ty = TypeDescriptor::normalize(spelling)?;
        self.set_type_to(ty)
    }

    pub fn set_type_to(&mut self, ty: TypeDescriptor) -> Result<&mut Self> {
        self.guard()?;
        if ty.primary() == Primary::Verbose && self.name.chars().count() != 1 {
            return Err(TypeError::VerboseName {
                name: self.name.clone(),
            }
            .into());
        }
        let value = coerce(self.value.clone(), &ty, Some(&self.name))?;
        self.ty = ty;
        self.value = value;
        Ok(self)
    }

    pub fn set_callback(&mut self, callback: Callback) -> Result<&mut Self> {
        self.guard()?;
        self.callback = Some(callback);
        Ok(self)
    }

    /// `a.b.c` with value `v` becomes `{b: {c: v}}`.
    pub fn dict_form(&self) -> std::result::Result<Value, TypeError> {
        let mut parts = self.name.split('.');
        parts.next();
        let path: Vec<&str> = parts.collect();
        if path.is_empty() {
            return Err(TypeError::NotDotted {
                name: self.name.clone(),
            });
        }
        Ok(path.iter().rev().fold(self.value.clone(), |inner, key| {
            let mut map = IndexMap::new();
            map.insert((*key).to_string(), inner);
            Value::Dict(map)
        }))
    }

    /// Type of the top frame, or the settled type when nothing was pushed.
    pub fn origin_type(&self) -> TypeDescriptor {
        self.stack.last().map_or(self.ty, |frame| frame.ty)
    }

    /// Record a raw value and/or a type change.
    ///
    /// A type opens (or reuses, or resets) a frame; a bare value lands in the
    /// innermost container of the top frame.
    pub fn push(&mut self, value: Option<Entry>, ty: Option<TypeDescriptor>) {
        if ty.is_none() && value.is_none() && self.ty.is_auto() {
            return;
        }
        let origin = self.origin_type();
        match ty {
            Some(ty) => {
                self.open_frame(ty, origin);
                self.push(value, None);
            }
            None if self.stack.is_empty() => self.push(value, Some(origin)),
            None => {
                if let Some(entry) = value {
                    self.append(entry, origin);
                }
            }
        }
    }

    /// Push using the type already in effect.
    pub fn push_as_origin(&mut self, value: Option<Entry>) {
        let origin = self.origin_type();
        self.push(value, Some(origin));
    }

    fn open_frame(&mut self, ty: TypeDescriptor, origin: TypeDescriptor) {
        let primary = ty.primary();
        let secondary = ty.secondary();

        if self.stack.is_empty() {
            let frame = if ty.is_list_list() {
                let mut values = match &self.value {
                    Value::List(items)
                        if origin == ty && items.first().is_some_and(Value::is_truthy) =>
                    {
                        items.iter().cloned().map(Entry::Value).collect()
                    }
                    _ => Vec::new(),
                };
                values.push(Entry::Value(Value::List(Vec::new())));
                Frame::new(ty, values)
            } else if primary == Primary::Reset {
                Frame::emptied(origin)
            } else if secondary == Some(Primary::Reset) {
                Frame::new(ty.primary_only(), Vec::new())
            } else if primary == Primary::List {
                let values = match &self.value {
                    Value::List(items) if origin == ty => {
                        items.iter().cloned().map(Entry::Value).collect()
                    }
                    _ => Vec::new(),
                };
                Frame::new(ty, values)
            } else if primary == Primary::Dict {
                let values = if origin == ty {
                    let current = match &self.value {
                        Value::Dict(map) => map.clone(),
                        _ => IndexMap::new(),
                    };
                    vec![Entry::Value(Value::Dict(current))]
                } else {
                    Vec::new()
                };
                Frame::new(ty, values)
            } else {
                Frame::new(ty, Vec::new())
            };
            self.stack.push(frame);
            return;
        }

        let Some(top) = self.stack.last_mut() else {
            return;
        };
        if secondary == Some(Primary::Reset) {
            *top = Frame::new(origin, Vec::new());
        } else if primary == Primary::Reset {
            self.stack = vec![Frame::emptied(origin)];
        } else if secondary == Some(Primary::List) {
            if origin.is_list_list() {
                top.values.push(Entry::Value(Value::List(Vec::new())));
            } else {
                self.stack.push(Frame::emptied(ty));
            }
        } else if !matches!(primary, Primary::List | Primary::Dict) {
            self.stack.push(Frame::new(ty, Vec::new()));
        } else if primary == Primary::List && origin != ty && top.values.is_empty() {
            // the previous frame was a reset
            *top = Frame::new(ty, Vec::new());
        }
    }

    fn append(&mut self, entry: Entry, origin: TypeDescriptor) {
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        if origin.secondary() != Some(Primary::List) {
            top.values.push(entry);
            return;
        }
        match top.values.last_mut() {
            Some(Entry::Value(Value::List(sub))) => sub.push(entry.into_value()),
            _ => top
                .values
                .push(Entry::Value(Value::List(vec![entry.into_value()]))),
        }
    }

    /// Swap dotted sub-option references for their checked-out dict forms.
    pub fn substitute_paths(&mut self, resolved: &HashMap<String, Value>) {
        for entry in self.stack.iter_mut().flat_map(|frame| frame.values.iter_mut()) {
            if let Entry::Path(path) = entry {
                if let Some(value) = resolved.get(path.as_str()) {
                    *entry = Entry::Value(value.clone());
                }
            }
        }
    }

    pub(crate) fn clear_stack(&mut self) {
        self.stack.clear();
    }

    /// Drop trailing raw values of the top frame, returning them.
    pub(crate) fn split_off_top(&mut self, keep: usize) -> Vec<Entry> {
        self.stack
            .last_mut()
            .map(|frame| frame.values.split_off(keep.min(frame.values.len())))
            .unwrap_or_default()
    }

    /// Collapse the stack into the final value. Returns the warnings for
    /// every discarded frame and every ignored later value.
    pub fn checkout(&mut self) -> std::result::Result<Vec<String>, TypeError> {
        let Some(top) = self.stack.pop() else {
            return Ok(Vec::new());
        };
        let mut warnings: Vec<String> = self
            .stack
            .drain(..)
            .map(|frame| {
                format!(
                    "Previous settings (type='{}', value={}) were ignored for option '{}'",
                    frame.ty,
                    frame.raw().repr(),
                    self.name
                )
            })
            .collect();

        let Frame { ty, values } = top;
        self.ty = ty;
        let primary = ty.primary();

        self.value = if ty.secondary() == Some(Primary::List) {
            Value::List(values.into_iter().map(Entry::into_value).collect())
        } else if primary == Primary::List {
            let raw = Value::List(values.into_iter().map(Entry::into_value).collect());
            coerce(raw, &ty, None)?
        } else if matches!(primary, Primary::Bool | Primary::Auto) && values.is_empty() {
            Value::Bool(true)
        } else if primary == Primary::Dict {
            merge_dicts(values)?
        } else {
            let mut values = values.into_iter().map(Entry::into_value);
            let first = match values.next() {
                Some(first) => first,
                // only verbose gets here with nothing pushed
                None => Value::Int(1),
            };
            let coerced = coerce(first, &ty, Some(&self.name))?;
            for later in values {
                warnings.push(format!(
                    "Later value {} was ignored for option '{}' (type='{}')",
                    later.repr(),
                    self.name,
                    ty
                ));
            }
            coerced
        };
        Ok(warnings)
    }
}

fn merge_dicts(values: Vec<Entry>) -> std::result::Result<Value, TypeError> {
    let mut merged = IndexMap::new();
    for entry in values {
        let part = match entry {
            Entry::Value(value) => coerce(value, &TypeDescriptor::DICT, None)?,
            Entry::Path(path) => {
                return Err(TypeError::Coerce {
                    value: Value::Str(path).repr().to_string(),
                    ty: TypeDescriptor::DICT.to_string(),
                });
            }
        };
        if let Value::Dict(part) = part {
            Value::deep_merge(&mut merged, part);
        }
    }
    Ok(Value::Dict(merged))
}

/// Type an initial value implies.
pub fn type_of(value: &Value) -> TypeDescriptor {
    TypeDescriptor::scalar(match value {
        Value::None => Primary::NoneType,
        Value::Bool(_) => Primary::Bool,
        Value::Int(_) => Primary::Int,
        Value::Float(_) => Primary::Float,
        Value::Str(_) => Primary::Str,
        Value::List(_) => Primary::List,
        Value::Dict(_) => Primary::Dict,
    })
}
