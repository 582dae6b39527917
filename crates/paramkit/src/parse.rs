//! Parsing a command line against a registry.

use crate::error::{Error, ParseError, Result};
use crate::param::{CallbackOutcome, Param, POSITIONAL};
use crate::preparse::{Preparsed, Slot};
use crate::registry::{ParamId, Prefix, Registry};
use crate::types::Primary;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Knobs for a single parse call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Register options the command line introduces instead of warning
    /// about them.
    pub arbitrary: bool,
}

impl ParseOptions {
    pub fn arbitrary() -> Self {
        Self { arbitrary: true }
    }
}

/// Result of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    /// Every name of the registry, aliases included, with its value.
    pub values: IndexMap<String, Value>,
    pub warnings: Vec<String>,
}

fn invalid(err: Error) -> Error {
    match err {
        Error::Type(err) => ParseError::InvalidValue(err).into(),
        other => other,
    }
}

impl Registry {
    /// Parse `args` and return the values with the warnings collected on the
    /// way. Help requests come back as [`ParseError::HelpRequested`].
    pub fn try_parse<S: AsRef<str>>(&mut self, args: &[S], opts: &ParseOptions) -> Result<Parsed> {
        if self.prefix() == Prefix::Long {
            let verbose = self
                .groups()
                .into_iter()
                .find(|(id, _)| self.param(*id).ty().primary() == Primary::Verbose)
                .map(|(id, _)| self.param(id).name().to_string());
            if let Some(name) = verbose {
                return Err(ParseError::VerboseWithLongPrefix(name).into());
            }
        }
        if args.is_empty() && self.help_on_empty() && !opts.arbitrary {
            return Err(ParseError::HelpRequested.into());
        }

        self.clear_stacks();
        let Preparsed { touched, pending } = self.preparse(args).map_err(invalid)?;
        let mut warnings: Vec<String> = pending
            .iter()
            .map(|value| format!("Unrecognized value: {}", value.repr()))
            .collect();

        // sub-options first: their dict forms feed the roots
        let mut resolved = HashMap::new();
        let mut rest = Vec::new();
        for (name, mut slot) in touched {
            if !name.contains('.') {
                rest.push((name, slot));
                continue;
            }
            let param = match &mut slot {
                Slot::Declared(id) => self.param_mut(*id),
                Slot::Fresh(param) => param,
            };
            warnings.extend(param.checkout().map_err(ParseError::from)?);
            resolved.insert(name, param.dict_form().map_err(ParseError::from)?);
        }

        for (name, slot) in rest {
            if self.help_names().contains(&name) {
                return Err(ParseError::HelpRequested.into());
            }
            let id = match slot {
                Slot::Declared(id) => id,
                Slot::Fresh(param) if opts.arbitrary => self.insert(&name, param),
                Slot::Fresh(param) => {
                    warnings.push(self.unrecognized(&name, &param));
                    continue;
                }
            };
            let param = self.param_mut(id);
            param.substitute_paths(&resolved);
            warnings.extend(param.checkout().map_err(ParseError::from)?);
        }

        let groups: Vec<(ParamId, String)> = self
            .groups()
            .into_iter()
            .map(|(id, names)| (id, names[0].to_string()))
            .collect();
        self.run_callbacks(&groups)?;

        for (id, name) in &groups {
            let param = self.param(*id);
            if param.required()
                && param.value().is_none()
                && param.ty().primary() != Primary::NoneType
            {
                let err = if name == POSITIONAL {
                    ParseError::MissingPositional
                } else {
                    ParseError::MissingRequired(self.prefixed(name))
                };
                return Err(err.into());
            }
        }

        warnings.truncate(self.max_warnings());
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        tracing::debug!(
            prog = self.prog(),
            args = args.len(),
            warnings = warnings.len(),
            "parsed command line"
        );
        Ok(Parsed {
            values: self.to_map(),
            warnings,
        })
    }

    fn unrecognized(&self, name: &str, param: &Param) -> String {
        if name != POSITIONAL {
            return format!(
                "Unrecognized option: {}",
                Value::from(self.prefixed(name)).repr()
            );
        }
        let values: Vec<String> = param
            .stack()
            .last()
            .map(|frame| {
                frame
                    .values
                    .iter()
                    .map(|entry| entry.to_value().repr().to_string())
                    .collect()
            })
            .unwrap_or_default();
        format!("Unrecognized positional values: {}", values.join(", "))
    }

    /// Run each option's callback once. The callback works on a copy that is
    /// written back afterwards, so it can look at the registry meanwhile.
    fn run_callbacks(&mut self, groups: &[(ParamId, String)]) -> Result<()> {
        for (id, name) in groups {
            let Some(callback) = self.param(*id).callback().cloned() else {
                continue;
            };
            tracing::debug!(option = %name, "running callback");
            let mut param = self.param(*id).clone();
            let outcome = callback.call(&mut param, self);
            *self.param_mut(*id) = param;
            let message = match outcome {
                CallbackOutcome::Accept => continue,
                CallbackOutcome::Reject => "Callback error.".to_string(),
                CallbackOutcome::Error(message) => message,
            };
            return Err(ParseError::Callback {
                option: self.prefixed(name),
                message,
            }
            .into());
        }
        Ok(())
    }

    /// Parse `args` the way a program's entry point does: on help or a parse
    /// error the help page is printed and the process exits with status 1.
    /// Warnings are only logged.
    pub fn parse<S: AsRef<str>>(
        &mut self,
        args: &[S],
        opts: &ParseOptions,
    ) -> Result<IndexMap<String, Value>> {
        match self.try_parse(args, opts) {
            Ok(parsed) => Ok(parsed.values),
            Err(Error::Parse(err)) => {
                let message = match err {
                    ParseError::HelpRequested => None,
                    other => Some(other.to_string()),
                };
                eprintln!("{}", self.help_text(message.as_deref()));
                std::process::exit(1);
            }
            Err(other) => Err(other),
        }
    }

    /// [`Registry::parse`] over the process arguments.
    pub fn parse_env(&mut self, opts: &ParseOptions) -> Result<IndexMap<String, Value>> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        self.parse(&args, opts)
    }
}
