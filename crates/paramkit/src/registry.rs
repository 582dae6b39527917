//! The option registry: named options, their aliases and the settings that
//! shape parsing and the help page.

use crate::error::{Error, ParseError, Result};
use crate::help::HelpPage;
use crate::param::{validate_name, Param};
use crate::types::{Primary, TypeDescriptor};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

/// Index of an option in a registry's storage. Aliases share one id.
pub type ParamId = usize;

pub const DEFAULT_HELP_NAMES: [&str; 3] = ["h", "help", "H"];
pub const DEFAULT_MAX_WARNINGS: usize = 10;
const HELP_DESC: &str = "Show help message and exit.";

/// How option tokens are prefixed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefix {
    /// `-name` for every option.
    Short,
    /// `--name` for every option.
    Long,
    /// `-x` for one-character names, `--name` otherwise.
    #[default]
    Auto,
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "-",
            Self::Long => "--",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prefix {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "-" => Ok(Self::Short),
            "--" => Ok(Self::Long),
            "auto" => Ok(Self::Auto),
            other => Err(ParseError::InvalidPrefix(other.to_string())),
        }
    }
}

/// Caller hook that may rearrange the help page before it is rendered.
pub type HelpHook = Rc<dyn Fn(&mut HelpPage)>;

#[derive(Clone)]
pub struct Registry {
    prog: String,
    usage: Vec<String>,
    desc: Vec<String>,
    help_names: Vec<String>,
    prefix: Prefix,
    help_on_empty: bool,
    locked: bool,
    max_warnings: usize,
    help_hook: Option<HelpHook>,
    names: IndexMap<String, ParamId>,
    params: Vec<Param>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("prog", &self.prog)
            .field("prefix", &self.prefix)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry named after the running executable, with the default help
    /// options installed.
    pub fn new() -> Self {
        let prog = std::env::args()
            .next()
            .and_then(|arg0| {
                Path::new(&arg0)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "prog".to_string());
        Self::with_prog(prog)
    }

    pub fn with_prog(prog: impl Into<String>) -> Self {
        let mut registry = Self {
            prog: prog.into(),
            usage: Vec::new(),
            desc: Vec::new(),
            help_names: Vec::new(),
            prefix: Prefix::Auto,
            help_on_empty: true,
            locked: false,
            max_warnings: DEFAULT_MAX_WARNINGS,
            help_hook: None,
            names: IndexMap::new(),
            params: Vec::new(),
        };
        registry.install_help(&DEFAULT_HELP_NAMES);
        registry
    }

    /// Install the help flag under `names`, which must already be valid.
    fn install_help<S: AsRef<str>>(&mut self, names: &[S]) {
        self.help_names = names.iter().map(|n| n.as_ref().to_string()).collect();
        let Some((first, rest)) = names.split_first() else {
            return;
        };
        let id = self.insert(first.as_ref(), Param::builtin(first.as_ref(), false, HELP_DESC));
        for name in rest {
            self.names.insert(name.as_ref().to_string(), id);
        }
    }

    pub(crate) fn insert(&mut self, name: &str, param: Param) -> ParamId {
        let id = self.params.len();
        self.params.push(param);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Store `param` under every name in `names`.
    pub(crate) fn insert_group(&mut self, names: &[String], param: Param) -> Option<ParamId> {
        let (first, rest) = names.split_first()?;
        let id = self.insert(first, param);
        for name in rest {
            self.names.insert(name.clone(), id);
        }
        Some(id)
    }

    pub fn prog(&self) -> &str {
        &self.prog
    }

    pub fn set_prog(&mut self, prog: impl Into<String>) -> &mut Self {
        self.prog = prog.into();
        self
    }

    pub fn usage(&self) -> &[String] {
        &self.usage
    }

    pub fn set_usage<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.usage = split_lines(lines);
        self
    }

    pub fn desc(&self) -> &[String] {
        &self.desc
    }

    pub fn set_desc<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.desc = split_lines(lines);
        self
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn set_prefix(&mut self, prefix: Prefix) -> &mut Self {
        self.prefix = prefix;
        self
    }

    /// Set the prefix from its spelling: `-`, `--` or `auto`.
    pub fn set_prefix_str(&mut self, spelling: &str) -> Result<&mut Self> {
        self.prefix = spelling.parse()?;
        Ok(self)
    }

    pub fn help_names(&self) -> &[String] {
        &self.help_names
    }

    /// Replace the help options. The previous names are removed.
    pub fn set_help_names<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Self> {
        if let Some(dotted) = names.iter().find(|n| n.as_ref().contains('.')) {
            return Err(Error::name(dotted.as_ref(), "no dot allowed in a help option name"));
        }
        for name in names {
            validate_name(name.as_ref())?;
        }
        for old in std::mem::take(&mut self.help_names) {
            self.names.shift_remove(&old);
        }
        self.install_help(names);
        Ok(self)
    }

    pub fn help_on_empty(&self) -> bool {
        self.help_on_empty
    }

    pub fn set_help_on_empty(&mut self, help_on_empty: bool) -> &mut Self {
        self.help_on_empty = help_on_empty;
        self
    }

    pub fn max_warnings(&self) -> usize {
        self.max_warnings
    }

    pub fn set_max_warnings(&mut self, max: usize) -> &mut Self {
        self.max_warnings = max;
        self
    }

    pub fn help_hook(&self) -> Option<&HelpHook> {
        self.help_hook.as_ref()
    }

    pub fn set_help_hook(&mut self, hook: impl Fn(&mut HelpPage) + 'static) -> &mut Self {
        self.help_hook = Some(Rc::new(hook));
        self
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Forbid adding or replacing options. Values of visible options can
    /// still be changed; hidden ones refuse.
    pub fn lock(&mut self) -> &mut Self {
        self.locked = true;
        self
    }

    pub fn unlock(&mut self) -> &mut Self {
        self.locked = false;
        for param in &mut self.params {
            param.set_guarded(false);
        }
        self
    }

    /// Declare `name` with an initial value; the type follows the value.
    /// An existing option just takes the value, unless the registry is locked.
    pub fn declare(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Param> {
        if let Some(&id) = self.names.get(name) {
            if self.locked {
                return Err(Error::name(
                    name,
                    "the registry is locked and the option exists; change its value instead",
                ));
            }
            let param = &mut self.params[id];
            param.set_value(value)?;
            return Ok(param);
        }
        let param = Param::with_value(name, value)?;
        let id = self.insert(name, param);
        Ok(&mut self.params[id])
    }

    /// The option named `name`, created untyped if it does not exist yet.
    pub fn get(&mut self, name: &str) -> Result<&mut Param> {
        let id = match self.names.get(name) {
            Some(&id) => id,
            None => {
                let param = Param::new(name)?;
                self.insert(name, param)
            }
        };
        Ok(self.guarded_mut(id))
    }

    /// Mutable access to an option; hidden options of a locked registry
    /// refuse changes.
    fn guarded_mut(&mut self, id: ParamId) -> &mut Param {
        let locked = self.locked;
        let param = &mut self.params[id];
        if locked && !param.show() {
            param.set_guarded(true);
        }
        param
    }

    /// Set the value of `name`, declaring it if needed.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Param> {
        self.declare(name, value)
    }

    pub fn lookup(&self, name: &str) -> Option<&Param> {
        self.names.get(name).map(|&id| &self.params[id])
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Param> {
        let id = self.id_of(name)?;
        Some(self.guarded_mut(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn id_of(&self, name: &str) -> Option<ParamId> {
        self.names.get(name).copied()
    }

    pub fn param(&self, id: ParamId) -> &Param {
        &self.params[id]
    }

    pub(crate) fn param_mut(&mut self, id: ParamId) -> &mut Param {
        &mut self.params[id]
    }

    pub(crate) fn clear_stacks(&mut self) {
        for param in &mut self.params {
            param.clear_stack();
        }
    }

    /// Bind `name` to the option already known as `existing`.
    pub fn alias(&mut self, name: &str, existing: &str) -> Result<()> {
        validate_name(name)?;
        let Some(&id) = self.names.get(existing) else {
            return Err(Error::name(existing, "no such option to alias"));
        };
        if self.params[id].ty().primary() == Primary::Verbose && name.chars().count() == 1 {
            return Err(Error::name(
                name,
                "cannot alias a verbose option to a short option",
            ));
        }
        self.names.insert(name.to_string(), id);
        Ok(())
    }

    /// Every name, aliases included, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = (&str, ParamId)> {
        self.names.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Distinct options in declaration order, each with all of its names.
    pub fn groups(&self) -> Vec<(ParamId, Vec<&str>)> {
        let mut groups: IndexMap<ParamId, Vec<&str>> = IndexMap::new();
        for (name, &id) in &self.names {
            groups.entry(id).or_default().push(name);
        }
        groups.into_iter().collect()
    }

    /// `name` as it is typed on the command line.
    pub fn prefixed(&self, name: &str) -> String {
        match self.prefix {
            Prefix::Auto => {
                let root = name.split('.').next().unwrap_or_default();
                if root.chars().count() <= 1 {
                    format!("-{name}")
                } else {
                    format!("--{name}")
                }
            }
            prefix => format!("{prefix}{name}"),
        }
    }

    /// Whether every character of `flags` is a distinct declared bool option.
    pub(crate) fn all_flags(&self, flags: &str) -> bool {
        let mut seen = Vec::new();
        for c in flags.chars() {
            if seen.contains(&c) {
                return false;
            }
            seen.push(c);
            let is_bool = self
                .lookup(c.encode_utf8(&mut [0; 4]))
                .is_some_and(|param| param.ty() == TypeDescriptor::BOOL);
            if !is_bool {
                return false;
            }
        }
        true
    }

    /// Current value of every name, aliases included.
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.names
            .iter()
            .map(|(name, &id)| (name.clone(), self.params[id].value().clone()))
            .collect()
    }
}

fn split_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .flat_map(|line| {
            line.as_ref()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_help_options() {
        let registry = Registry::with_prog("prog");
        let help = registry.lookup("h").unwrap();
        assert_eq!(help.value(), &Value::Bool(false));
        assert_eq!(help.desc_lines(), ["Show help message and exit."]);
        assert_eq!(registry.id_of("help"), registry.id_of("H"));
        assert_eq!(registry.groups().len(), 1);
    }

    #[test]
    fn replacing_help_names_drops_old_ones() {
        let mut registry = Registry::with_prog("prog");
        registry.set_help_names(&["?", "usage"]).unwrap_err();
        registry.set_help_names(&["u", "usage"]).unwrap();
        assert!(!registry.contains("h"));
        assert!(!registry.contains("help"));
        assert_eq!(registry.id_of("u"), registry.id_of("usage"));
        assert!(matches!(
            registry.set_help_names(&["a.b"]),
            Err(Error::Name { .. })
        ));
    }

    #[test]
    fn get_creates_untyped_option() {
        let mut registry = Registry::with_prog("prog");
        let param = registry.get("a").unwrap();
        assert_eq!(param.ty(), TypeDescriptor::AUTO);
        assert!(registry.contains("a"));
        assert!(matches!(registry.get("*a"), Err(Error::Name { .. })));
    }

    #[test]
    fn alias_shares_identity() {
        let mut registry = Registry::with_prog("prog");
        registry.declare("all", 1).unwrap();
        registry.alias("a", "all").unwrap();
        registry.get("a").unwrap().set_value(5).unwrap();
        assert_eq!(registry.lookup("all").unwrap().value(), &Value::Int(5));
        assert!(registry.alias("b", "missing").is_err());

        registry.get("v").unwrap().set_type("verbose").unwrap();
        assert!(registry.alias("w", "v").is_err());
        registry.alias("verbose", "v").unwrap();
    }

    #[test]
    fn locked_registry_refuses_structure_changes() {
        let mut registry = Registry::with_prog("prog");
        registry.declare("a", 1).unwrap();
        registry.declare("b", 2).unwrap().set_show(false);
        registry.lock();
        assert!(matches!(registry.declare("a", 2), Err(Error::Name { .. })));
        registry.get("a").unwrap().set_value(3).unwrap();
        assert_eq!(registry.lookup("a").unwrap().value(), &Value::Int(3));
        assert!(registry.get("b").unwrap().set_value(3).is_err());
        registry.unlock();
        registry.get("b").unwrap().set_value(3).unwrap();
    }

    #[test]
    fn lookup_mut_guards_hidden_options_when_locked() {
        let mut registry = Registry::with_prog("prog");
        registry.declare("a", 1).unwrap();
        registry.declare("b", 2).unwrap().set_show(false);
        registry.lock();
        assert!(registry.lookup_mut("b").unwrap().set_value(3).is_err());
        assert!(registry.lookup_mut("b").unwrap().set_desc(["x"]).is_err());
        registry.lookup_mut("a").unwrap().set_value(4).unwrap();
        assert_eq!(registry.lookup("b").unwrap().value(), &Value::Int(2));
        assert!(registry.lookup_mut("missing").is_none());
    }

    #[test]
    fn prefixes_names() {
        let mut registry = Registry::with_prog("prog");
        assert_eq!(registry.prefixed("a"), "-a");
        assert_eq!(registry.prefixed("a.b"), "-a.b");
        assert_eq!(registry.prefixed("abc"), "--abc");
        registry.set_prefix(Prefix::Short);
        assert_eq!(registry.prefixed("abc"), "-abc");
        registry.set_prefix_str("--").unwrap();
        assert_eq!(registry.prefixed("a"), "--a");
        assert!(matches!(
            registry.set_prefix_str("+"),
            Err(Error::Parse(ParseError::InvalidPrefix(_)))
        ));
    }

    #[test]
    fn to_map_lists_aliases() {
        let mut registry = Registry::with_prog("prog");
        registry.declare("a", 1).unwrap();
        registry.alias("aa", "a").unwrap();
        let map = registry.to_map();
        assert_eq!(map["a"], Value::Int(1));
        assert_eq!(map["aa"], Value::Int(1));
        assert_eq!(map["help"], Value::Bool(false));
    }

    #[test]
    fn detects_bundled_flags() {
        let mut registry = Registry::with_prog("prog");
        for name in ["a", "b", "c"] {
            registry.declare(name, false).unwrap();
        }
        registry.declare("n", 1).unwrap();
        assert!(registry.all_flags("abc"));
        assert!(!registry.all_flags("aab"));
        assert!(!registry.all_flags("abn"));
        assert!(!registry.all_flags("abx"));
    }
}
