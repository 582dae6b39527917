//! Declarative command-line options with typed, stack-based value accumulation.
//!
//! Options live in a [`Registry`]. Each one carries a type descriptor
//! (`int`, `list:str`, `verbose`, ...) and collects raw tokens in frames while
//! the command line is scanned; checkout then coerces the collected tokens
//! into the final [`Value`].
//!
//! ```rust,ignore
//! use paramkit::{ParseOptions, Registry};
//!
//! let mut params = Registry::with_prog("demo");
//! params.declare("n", 10)?.set_desc(["Number of rows."])?;
//! params.get("v")?.set_type("verbose")?;
//!
//! let parsed = params.try_parse(&["-n", "20", "-vv"], &ParseOptions::default())?;
//! assert_eq!(parsed.values["n"], 20.into());
//! ```
//!
//! [`Commands`] layers subcommands on top, each with its own registry.

pub mod coerce;
pub mod commands;
pub mod error;
pub mod help;
pub mod literal;
mod load;
pub mod param;
pub mod parse;
mod preparse;
pub mod registry;
pub mod types;
pub mod value;

pub use commands::{Commands, ParsedCommand};
pub use error::{DispatchError, Error, ParseError, Result, TypeError};
pub use help::{HelpPage, OptionRow, Section, SectionBody};
pub use param::{Callback, CallbackOutcome, Entry, Frame, Param, POSITIONAL};
pub use parse::{ParseOptions, Parsed};
pub use registry::{ParamId, Prefix, Registry};
pub use types::{Primary, TypeDescriptor};
pub use value::Value;
