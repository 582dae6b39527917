//! Subcommands: a global registry plus one registry per command.
//!
//! The first token that names a command splits the command line. With
//! inheritance on, every global option is also accepted by the command and
//! its value flows back to the global registry after the parse.

use crate::error::{DispatchError, Error, ParseError, Result};
use crate::help::{
    HelpPage, OptionRow, SectionBody, DESCRIPTION_TITLE, OPTIONAL_TITLE, REQUIRED_TITLE,
    USAGE_TITLE,
};
use crate::param::{Param, POSITIONAL};
use crate::parse::ParseOptions;
use crate::registry::{HelpHook, ParamId, Prefix, Registry};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

pub const DEFAULT_HELP_COMMANDS: [&str; 1] = ["help"];
pub const COMMANDS_TITLE: &str = "AVAILABLE COMMANDS";
const HELP_COMMAND_DESC: &str = "Print help message for the command and exit.";

/// Outcome of a successful command-line dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub command: String,
    /// Values of the command's registry, inherited options included.
    pub values: IndexMap<String, Value>,
    pub global: IndexMap<String, Value>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct Commands {
    prog: String,
    desc: Vec<String>,
    global: Registry,
    registries: Vec<Registry>,
    names: IndexMap<String, usize>,
    help_commands: Vec<String>,
    inherit: bool,
    prefix: Prefix,
    help_hook: Option<HelpHook>,
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("prog", &self.prog)
            .field("names", &self.names)
            .field("help_commands", &self.help_commands)
            .field("inherit", &self.inherit)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::new()
    }
}

impl Commands {
    /// Commands named after the running executable.
    pub fn new() -> Self {
        let prog = Registry::new().prog().to_string();
        Self::with_prog(prog)
    }

    pub fn with_prog(prog: impl Into<String>) -> Self {
        let prog = prog.into();
        let mut global = Registry::with_prog(prog.clone());
        global.set_help_on_empty(false);
        let mut commands = Self {
            prog,
            desc: Vec::new(),
            global,
            registries: Vec::new(),
            names: IndexMap::new(),
            help_commands: Vec::new(),
            inherit: true,
            prefix: Prefix::Auto,
            help_hook: None,
        };
        commands.install_help_command(&DEFAULT_HELP_COMMANDS);
        commands
    }

    /// Register the help command under `names`, which must already be valid.
    fn install_help_command<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut registry = Registry::with_prog(self.prog.clone());
        registry
            .set_desc([HELP_COMMAND_DESC])
            .set_help_on_empty(false)
            .set_prefix(self.prefix);
        registry.insert(POSITIONAL, Param::builtin(POSITIONAL, "", "The command."));
        let idx = self.registries.len();
        self.registries.push(registry);
        for name in names {
            self.names.insert(name.as_ref().to_string(), idx);
        }
        self.help_commands = names.iter().map(|n| n.as_ref().to_string()).collect();
        self.refresh_prog(idx);
    }

    pub fn prog(&self) -> &str {
        &self.prog
    }

    /// Rename the program; every registry follows.
    pub fn set_prog(&mut self, prog: impl Into<String>) -> &mut Self {
        self.prog = prog.into();
        self.global.set_prog(self.prog.clone());
        for idx in 0..self.registries.len() {
            self.refresh_prog(idx);
        }
        self
    }

    /// `prog a|b` for a registry known as `a` and `b`.
    fn refresh_prog(&mut self, idx: usize) {
        let names: Vec<&str> = self
            .names
            .iter()
            .filter(|(_, i)| **i == idx)
            .map(|(name, _)| name.as_str())
            .collect();
        if names.is_empty() {
            return;
        }
        let prog = format!("{} {}", self.prog, names.join("|"));
        self.registries[idx].set_prog(prog);
    }

    pub fn desc(&self) -> &[String] {
        &self.desc
    }

    pub fn set_desc<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.desc = lines
            .into_iter()
            .flat_map(|line| {
                line.as_ref()
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        self
    }

    pub fn global(&self) -> &Registry {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut Registry {
        &mut self.global
    }

    pub fn inherit(&self) -> bool {
        self.inherit
    }

    pub fn set_inherit(&mut self, inherit: bool) -> &mut Self {
        self.inherit = inherit;
        self
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    /// Set the prefix of the global registry and of every command.
    pub fn set_prefix(&mut self, prefix: Prefix) -> &mut Self {
        self.prefix = prefix;
        self.global.set_prefix(prefix);
        for registry in &mut self.registries {
            registry.set_prefix(prefix);
        }
        self
    }

    pub fn help_commands(&self) -> &[String] {
        &self.help_commands
    }

    /// Replace the names of the help command.
    pub fn set_help_commands<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&mut Self> {
        if names.is_empty() {
            return Err(Error::name("", "at least one help command name is needed"));
        }
        for name in names {
            validate_command(name.as_ref())?;
        }
        for old in std::mem::take(&mut self.help_commands) {
            self.names.shift_remove(&old);
        }
        self.install_help_command(names);
        Ok(self)
    }

    pub fn set_help_hook(&mut self, hook: impl Fn(&mut HelpPage) + 'static) -> &mut Self {
        self.help_hook = Some(Rc::new(hook));
        self
    }

    fn is_help_command(&self, name: &str) -> bool {
        self.help_commands.iter().any(|h| h == name)
    }

    fn create(&mut self, name: &str) -> usize {
        let mut registry = Registry::with_prog(self.prog.clone());
        registry.set_prefix(self.prefix);
        let idx = self.registries.len();
        self.registries.push(registry);
        self.names.insert(name.to_string(), idx);
        self.refresh_prog(idx);
        idx
    }

    /// The registry of command `name`, created if it does not exist yet.
    pub fn command(&mut self, name: &str) -> Result<&mut Registry> {
        validate_command(name)?;
        let idx = match self.names.get(name) {
            Some(&idx) => idx,
            None => self.create(name),
        };
        Ok(&mut self.registries[idx])
    }

    /// Declare command `name` with its description.
    pub fn add_command<I, S>(&mut self, name: &str, desc: I) -> Result<&mut Registry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = self.command(name)?;
        registry.set_desc(desc);
        Ok(registry)
    }

    pub fn lookup(&self, name: &str) -> Option<&Registry> {
        self.names.get(name).map(|&idx| &self.registries[idx])
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Registry> {
        self.names.get(name).map(|&idx| &mut self.registries[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Make `name` another name of command `existing`.
    pub fn alias(&mut self, name: &str, existing: &str) -> Result<()> {
        validate_command(name)?;
        let Some(&idx) = self.names.get(existing) else {
            return Err(Error::name(existing, "no such command to alias"));
        };
        self.names.insert(name.to_string(), idx);
        self.refresh_prog(idx);
        Ok(())
    }

    /// Command names, aliases included, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Distinct commands in declaration order, each with all of its names.
    fn groups(&self) -> Vec<(usize, Vec<&str>)> {
        let mut groups: IndexMap<usize, Vec<&str>> = IndexMap::new();
        for (name, &idx) in &self.names {
            groups.entry(idx).or_default().push(name);
        }
        groups.into_iter().collect()
    }

    /// Global options a command would inherit: every option but the help
    /// flag, with its non-help names.
    fn inheritable(&self) -> Vec<(ParamId, Vec<String>)> {
        let help_names = self.global.help_names();
        self.global
            .groups()
            .into_iter()
            .map(|(id, names)| {
                let names: Vec<String> = names
                    .into_iter()
                    .filter(|name| !help_names.iter().any(|h| h == name))
                    .map(str::to_string)
                    .collect();
                (id, names)
            })
            .filter(|(_, names)| !names.is_empty())
            .collect()
    }

    fn check_inheritance(&self, command: &str, registry: &Registry) -> Result<()> {
        for (_, names) in self.inheritable() {
            if registry.prefix() != self.global.prefix() {
                return Err(DispatchError::InconsistentPrefix {
                    global: self.global.prefix().to_string(),
                    command: registry.prefix().to_string(),
                }
                .into());
            }
            if let Some(name) = names.iter().find(|name| registry.contains(name)) {
                return Err(Error::name(
                    name,
                    format!(
                        "defined for both global and command '{command}' while commands inherit global options"
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Registry of command `idx` ready for parsing or help: a copy carrying
    /// the global options when inheritance applies.
    fn prepared(&self, command: &str, idx: usize) -> Result<Registry> {
        let mut registry = self.registries[idx].clone();
        if self.inherit && !self.is_help_command(command) {
            self.check_inheritance(command, &registry)?;
            for (id, names) in self.inheritable() {
                registry.insert_group(&names, self.global.param(id).clone());
            }
        }
        Ok(registry)
    }

    /// Copy inherited values from a parsed command registry back into the
    /// global one.
    fn write_back(&mut self, parsed: &Registry) {
        for (id, names) in self.inheritable() {
            if let Some(param) = parsed.lookup(&names[0]) {
                let value = param.value().clone();
                self.global.param_mut(id).set_value_only(value, false);
            }
        }
    }

    /// Dispatch `args`. Help requests and parse failures come back as
    /// [`DispatchError`]s.
    pub fn try_parse<S: AsRef<str>>(&mut self, args: &[S], opts: &ParseOptions) -> Result<ParsedCommand> {
        if self.inherit {
            for (idx, names) in self.groups() {
                if names.iter().any(|name| self.is_help_command(name)) {
                    continue;
                }
                self.check_inheritance(names[0], &self.registries[idx])?;
            }
        }

        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        if args.is_empty() {
            return Err(DispatchError::HelpRequested.into());
        }

        let cmd_idx = if opts.arbitrary {
            if !self.names.contains_key(args[0]) {
                self.create(args[0]);
            }
            0
        } else {
            args.iter()
                .position(|arg| *arg != POSITIONAL && self.names.contains_key(*arg))
                .ok_or(DispatchError::NoCommand)?
        };
        let command = args[cmd_idx].to_string();
        let global_args = &args[..cmd_idx];
        let command_args = &args[cmd_idx + 1..];
        let idx = self.names[&command];
        let is_help = self.is_help_command(&command);
        tracing::debug!(command = %command, global = global_args.len(), "dispatching command");

        let command_error = |error: Error| match error {
            Error::Parse(error) => DispatchError::Command {
                command: command.clone(),
                error,
            }
            .into(),
            other => other,
        };

        let mut warnings = Vec::new();
        if self.inherit && !is_help {
            let mut registry = self.prepared(&command, idx)?;
            let tokens: Vec<&str> = global_args.iter().chain(command_args).copied().collect();
            let parsed = registry.try_parse(&tokens, opts).map_err(command_error)?;
            self.write_back(&registry);
            self.registries[idx] = strip_inherited(registry, &self.registries[idx]);
            warnings.extend(parsed.warnings);
            return Ok(ParsedCommand {
                command,
                values: parsed.values,
                global: self.global.to_map(),
                warnings,
            });
        }

        let global = self
            .global
            .try_parse(global_args, opts)
            .map_err(|error| match error {
                Error::Parse(error) => DispatchError::Global(error).into(),
                other => other,
            })?;
        warnings.extend(global.warnings);

        let parsed = self.registries[idx]
            .try_parse(command_args, opts)
            .map_err(command_error)?;
        warnings.extend(parsed.warnings);

        if is_help && !opts.arbitrary {
            let target = parsed
                .values
                .get(POSITIONAL)
                .map(Value::to_string)
                .unwrap_or_default();
            return Err(if target.is_empty() || self.is_help_command(&target) {
                DispatchError::HelpRequested
            } else if self.contains(&target) {
                DispatchError::CommandHelp(target)
            } else {
                DispatchError::UnknownCommand(target)
            }
            .into());
        }

        Ok(ParsedCommand {
            command,
            values: parsed.values,
            global: global.values,
            warnings,
        })
    }

    /// Dispatch `args` the way a program's entry point does: on help or a
    /// dispatch error the matching help page is printed and the process
    /// exits with status 1.
    pub fn parse<S: AsRef<str>>(&mut self, args: &[S], opts: &ParseOptions) -> Result<ParsedCommand> {
        match self.try_parse(args, opts) {
            Ok(parsed) => Ok(parsed),
            Err(err @ Error::Dispatch(DispatchError::InconsistentPrefix { .. })) => Err(err),
            Err(Error::Dispatch(err)) => {
                eprintln!("{}", self.error_page(&err)?);
                std::process::exit(1);
            }
            Err(other) => Err(other),
        }
    }

    /// [`Commands::parse`] over the process arguments.
    pub fn parse_env(&mut self, opts: &ParseOptions) -> Result<ParsedCommand> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        self.parse(&args, opts)
    }

    /// Help text answering a dispatch error: the command's own page for
    /// command-level failures, the commands page otherwise.
    pub fn error_page(&self, err: &DispatchError) -> Result<String> {
        let message = |error: &ParseError| match error {
            ParseError::HelpRequested => None,
            other => Some(other.to_string()),
        };
        match err {
            DispatchError::CommandHelp(command) => self.command_help_text(command, None),
            DispatchError::Command { command, error } => {
                self.command_help_text(command, message(error).as_deref())
            }
            DispatchError::Global(error) => Ok(self.help_text(message(error).as_deref())),
            DispatchError::HelpRequested => Ok(self.help_text(None)),
            other => Ok(self.help_text(Some(&other.to_string()))),
        }
    }

    /// Help text of one command, inherited options included.
    pub fn command_help_text(&self, command: &str, error: Option<&str>) -> Result<String> {
        let Some(&idx) = self.names.get(command) else {
            return Err(DispatchError::UnknownCommand(command.to_string()).into());
        };
        Ok(self.prepared(command, idx)?.help_text(error))
    }

    /// The commands page: usage, global options and the command list.
    pub fn help_page(&self) -> HelpPage {
        let mut page = HelpPage::new(self.prog.clone());
        if !self.desc.is_empty() {
            page.add(DESCRIPTION_TITLE, SectionBody::Lines(self.desc.clone()));
        }
        let usage = if self.inherit {
            "{prog} <command> [OPTIONS]"
        } else {
            "{prog} [GLOBAL OPTIONS] <command> [COMMAND OPTIONS]"
        };
        page.add(USAGE_TITLE, SectionBody::Lines(vec![usage.to_string()]));

        let global = self.global.help_page();
        for title in [REQUIRED_TITLE, OPTIONAL_TITLE] {
            if let Some(section) = global.section(title) {
                page.add(format!("GLOBAL {title}"), section.body.clone());
            }
        }

        let mut rows = Vec::new();
        let mut help_row = None;
        for (idx, mut names) in self.groups() {
            names.sort_by_key(|name| name.chars().count());
            let row = OptionRow::new(names.join(" | "), "", self.registries[idx].desc().to_vec());
            if names.iter().any(|name| self.is_help_command(name)) {
                help_row = Some(OptionRow {
                    names: self.help_commands.join(" | "),
                    label: "[COMMAND]".to_string(),
                    ..row
                });
            } else {
                rows.push(row);
            }
        }
        rows.extend(help_row);
        page.add(COMMANDS_TITLE, SectionBody::Options(rows));

        if let Some(hook) = &self.help_hook {
            hook(&mut page);
        }
        page
    }

    pub fn help_text(&self, error: Option<&str>) -> String {
        self.help_page().render(error)
    }
}

/// Keep the parsed values of a command's own options, dropping the options
/// it only borrowed for the parse.
fn strip_inherited(parsed: Registry, original: &Registry) -> Registry {
    let mut registry = original.clone();
    for (name, id) in original.names() {
        if let Some(param) = parsed.lookup(name) {
            *registry.param_mut(id) = param.clone();
        }
    }
    registry
}

fn validate_command(name: &str) -> Result<()> {
    if name.is_empty() || name == POSITIONAL || name.chars().any(char::is_whitespace) {
        return Err(Error::name(name, "not a valid command name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands() -> Commands {
        Commands::with_prog("program")
    }

    fn squash(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn values(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        let mut map: IndexMap<String, Value> = ["h", "help", "H"]
            .iter()
            .map(|name| (name.to_string(), Value::Bool(false)))
            .collect();
        for (name, value) in pairs {
            map.insert(name.to_string(), value.clone());
        }
        map
    }

    #[test]
    fn command_aliases_share_a_registry() {
        let mut commands = commands();
        commands.add_command("list", ["List all commands"]).unwrap();
        commands.alias("show", "list").unwrap();
        assert!(commands.lookup("show").unwrap().prog().ends_with("list|show"));
        assert!(commands.alias("x", "missing").is_err());
        assert!(commands.command("_").is_err());

        commands.set_help_commands(&["help", "h"]).unwrap();
        assert_eq!(commands.help_commands(), ["help", "h"]);
        assert!(commands.contains("h"));
    }

    #[test]
    fn help_command_is_installed_by_default() {
        let mut commands = commands();
        let help = commands.lookup("help").unwrap();
        let target = help.lookup(POSITIONAL).unwrap();
        assert_eq!(target.value(), &Value::from(""));
        assert_eq!(target.desc_lines(), ["The command."]);
        assert!(help.prog().ends_with("help"));

        commands.set_help_commands(&["usage"]).unwrap();
        assert!(!commands.contains("help"));
        let target = commands.lookup("usage").unwrap().lookup(POSITIONAL).unwrap();
        assert_eq!(target.desc_lines(), ["The command."]);
        assert!(commands.set_help_commands(&["bad name"]).is_err());
    }

    #[test]
    fn commands_page() {
        let mut commands = commands();
        assert_eq!(
            squash(&commands.help_text(None)),
            "Usage: program <command> [OPTIONS] Global optional options: \
             -h, -H, --help - Show help message and exit. \
             Available commands: help [COMMAND] - Print help message for the command and exit."
        );

        commands.add_command("cmd1", ["Comman 1"]).unwrap();
        commands.add_command("alongcommand", ["A long command"]).unwrap();
        commands.alias("cmd2", "cmd1").unwrap();
        commands.set_help_hook(|page: &mut HelpPage| {
            page.add("Additional", SectionBody::Lines(vec!["demo".into()]));
        });
        commands.global_mut().get("a").unwrap().set_required(true).unwrap();
        commands.set_desc(["Command description"]);
        assert_eq!(
            squash(&commands.help_text(Some("some errors"))),
            "Error: some errors Description: Command description \
             Usage: program <command> [OPTIONS] \
             Global required options: -a <AUTO> - [No description] \
             Global optional options: -h, -H, --help - Show help message and exit. \
             Available commands: cmd1 | cmd2 - Comman 1 alongcommand - A long command \
             help [COMMAND] - Print help message for the command and exit. \
             Additional: demo"
        );
    }

    #[test]
    fn dispatch_without_inheritance() {
        let mut commands = commands();
        commands.set_inherit(false);
        let opts = ParseOptions::default();
        assert!(commands.try_parse::<&str>(&[], &opts).unwrap_err().is_help());
        assert!(commands.try_parse(&["help"], &opts).unwrap_err().is_help());
        assert_eq!(
            commands.try_parse(&["1"], &opts).unwrap_err(),
            Error::from(DispatchError::NoCommand)
        );

        commands.add_command("cmd1", ["First command"]).unwrap();
        commands.alias("cmd2", "cmd1").unwrap();
        commands.command("cmd2").unwrap().get("a").unwrap().set_required(true).unwrap();
        commands.global_mut().get("a").unwrap().set_required(true).unwrap();

        let err = commands.try_parse(&["cmd2"], &opts).unwrap_err();
        assert_eq!(
            err,
            Error::from(DispatchError::Global(ParseError::MissingRequired("-a".into())))
        );
        assert!(commands.help_text(Some(&err.to_string())).contains("Option '-a' is required."));

        let Error::Dispatch(err) = commands.try_parse(&["-a", "cmd2", "0"], &opts).unwrap_err() else {
            panic!("expected a dispatch error");
        };
        assert!(matches!(err, DispatchError::Command { ref command, .. } if command == "cmd2"));
        let page = commands.error_page(&err).unwrap();
        assert!(page.contains("Error: Option '-a' is required."));
        assert!(page.contains("program cmd1|cmd2"));

        let parsed = commands.try_parse(&["-a", "2", "cmd1", "-a", "1"], &opts).unwrap();
        assert_eq!(parsed.command, "cmd1");
        assert_eq!(parsed.values, values(&[("a", Value::Int(1))]));
        assert_eq!(parsed.global, values(&[("a", Value::Int(2))]));
    }

    #[test]
    fn inheritance_checks() {
        let mut commands = commands();
        commands.global_mut().set_prefix(Prefix::Short);
        commands.global_mut().declare("a", 1).unwrap();
        commands.add_command("list", ["List commands"]).unwrap();
        assert!(matches!(
            commands.try_parse::<&str>(&[], &ParseOptions::default()),
            Err(Error::Dispatch(DispatchError::InconsistentPrefix { .. }))
        ));

        commands.global_mut().set_prefix(Prefix::Auto);
        commands.command("list").unwrap().declare("a", true).unwrap();
        assert!(matches!(
            commands.try_parse::<&str>(&[], &ParseOptions::default()),
            Err(Error::Name { .. })
        ));
    }

    #[test]
    fn inherited_options_flow_back() {
        let mut commands = commands();
        commands.global_mut().declare("a", 1).unwrap();
        commands.command("list").unwrap().declare("x", 9).unwrap();
        let opts = ParseOptions::default();

        for args in [
            ["-a", "2", "list", "-x", "1"],
            ["list", "-a", "2", "-x", "1"],
        ] {
            let parsed = commands.try_parse(&args, &opts).unwrap();
            assert_eq!(parsed.command, "list");
            assert_eq!(parsed.values, values(&[("a", Value::Int(2)), ("x", Value::Int(1))]));
            assert_eq!(parsed.global, values(&[("a", Value::Int(2))]));
        }
        // the command keeps only its own options
        assert!(!commands.lookup("list").unwrap().contains("a"));
        assert_eq!(
            commands.lookup("list").unwrap().lookup("x").unwrap().value(),
            &Value::Int(1)
        );
    }

    #[test]
    fn arbitrary_dispatch() {
        let mut commands = commands();
        let parsed = commands
            .try_parse(&["-x", "command", "-a", "1"], &ParseOptions::arbitrary())
            .unwrap();
        assert_eq!(parsed.command, "-x");
        assert_eq!(parsed.global, values(&[]));
        assert_eq!(parsed.values, values(&[("a", Value::Int(1))]));
        assert_eq!(parsed.warnings, ["Unrecognized value: 'command'"]);
    }

    #[test]
    fn help_command() {
        let mut commands = commands();
        let opts = ParseOptions::default();
        assert_eq!(
            commands.try_parse(&["help", "x"], &opts).unwrap_err(),
            Error::from(DispatchError::UnknownCommand("x".into()))
        );
        assert_eq!(
            commands.try_parse(&["help", "x"], &opts).unwrap_err().to_string(),
            "No such command: x"
        );

        commands.add_command("show", ["Show the list."]).unwrap();
        let err = commands.try_parse(&["help", "show"], &opts).unwrap_err();
        assert_eq!(err, Error::from(DispatchError::CommandHelp("show".into())));
        let Error::Dispatch(err) = err else {
            panic!("expected a dispatch error");
        };
        assert!(commands.error_page(&err).unwrap().contains("\n  Show the list."));

        commands.set_help_commands(&["h"]).unwrap();
        assert!(!commands.contains("help"));
        assert_eq!(
            commands.try_parse(&["h", "show"], &opts).unwrap_err(),
            Error::from(DispatchError::CommandHelp("show".into()))
        );
        assert!(commands.try_parse(&["h", "h"], &opts).unwrap_err().is_help());
    }

    #[test]
    fn command_page_lists_inherited_options() {
        let mut commands = commands();
        commands.global_mut().declare("verbose", false).unwrap();
        commands.add_command("run", ["Run it."]).unwrap();
        let text = commands.command_help_text("run", None).unwrap();
        assert!(text.contains("--verbose [BOOL]"));
        assert!(text.starts_with("Description:\n  Run it.\n"));
        assert!(commands.command_help_text("nope", None).is_err());
    }
}
