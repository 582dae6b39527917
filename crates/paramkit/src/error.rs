//! Error kinds raised while declaring options, coercing values and parsing.

use thiserror::Error;

/// A type descriptor that cannot be normalized, or a value that cannot be
/// coerced to the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The spelling is not a known type, or the primary/secondary pair is invalid.
    #[error("invalid type '{spelling}': {reason}")]
    Descriptor { spelling: String, reason: String },

    /// The value does not fit the target type.
    #[error("unable to coerce value {value} to type '{ty}'")]
    Coerce { value: String, ty: String },

    /// Verbose counters are only meaningful for single-character names.
    #[error("option '{name}' with type 'verbose' must have a single-character name")]
    VerboseName { name: String },

    /// Boolean flags are present-or-absent, never required.
    #[error("bool option '{name}' cannot be set as required")]
    RequiredBool { name: String },

    /// Only dotted names (`a.b.c`) have a dict form.
    #[error("unable to convert option '{name}' into a dict without a dot in its name")]
    NotDotted { name: String },
}

impl TypeError {
    pub(crate) fn descriptor(spelling: &str, reason: impl Into<String>) -> Self {
        Self::Descriptor {
            spelling: spelling.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failures surfaced by a parse call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A help option was given (or the token list was empty).
    #[error("help requested")]
    HelpRequested,

    #[error("Option '{0}' is required.")]
    MissingRequired(String),

    #[error("POSITIONAL option is required.")]
    MissingPositional,

    /// A callback returned `false` or an error message.
    #[error("Option '{option}': {message}")]
    Callback { option: String, message: String },

    #[error("Verbose option '{0}' is not allowed with prefix '--'")]
    VerboseWithLongPrefix(String),

    #[error("Prefix should be one of -, -- and auto, got '{0}'")]
    InvalidPrefix(String),

    /// A value failed coercion while an option was checked out.
    #[error(transparent)]
    InvalidValue(#[from] TypeError),
}

/// Failures of the command layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("help requested")]
    HelpRequested,

    #[error("No command given.")]
    NoCommand,

    #[error("No such command: {0}")]
    UnknownCommand(String),

    /// `help <command>` named a known command.
    #[error("help requested for command '{0}'")]
    CommandHelp(String),

    /// The command's own registry failed to parse its tokens.
    #[error("{error}")]
    Command { command: String, error: ParseError },

    #[error("Cannot inherit global options ({global}) with inconsistent prefix ({command}).")]
    InconsistentPrefix { global: String, command: String },

    /// The global registry failed to parse the tokens before the command.
    #[error("{0}")]
    Global(ParseError),
}

/// Every error this crate returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid option name '{name}': {reason}")]
    Name { name: String, reason: String },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Load(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl Error {
    pub(crate) fn name(name: &str, reason: impl Into<String>) -> Self {
        Self::Name {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error is the help short-circuit rather than a failure.
    pub fn is_help(&self) -> bool {
        matches!(
            self,
            Self::Parse(ParseError::HelpRequested)
                | Self::Dispatch(
                    DispatchError::HelpRequested
                        | DispatchError::CommandHelp(_)
                        | DispatchError::Global(ParseError::HelpRequested)
                        | DispatchError::Command {
                            error: ParseError::HelpRequested,
                            ..
                        }
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
