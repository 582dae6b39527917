mod defs;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use paramkit::{Commands, ParseOptions, Prefix, Registry, TypeDescriptor, Value};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use crate::defs::{Definitions, load_definitions, write_default_definitions};

#[derive(Parser)]
#[command(name = "paramkit")]
#[command(version, about = "Parse command lines against declarative option definitions", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter paramkit.json
    Init(InitArgs),

    /// Parse arguments given after `--` and print the values as JSON
    Parse(ParseArgs),

    /// Print the help page of the definitions (or of one command)
    Help(HelpArgs),

    /// Print the canonical form of type descriptors
    Normalize(NormalizeArgs),

    /// Coerce a single raw value to a type and print it as JSON
    Coerce(CoerceArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Replace an existing paramkit.json
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct DefsArgs {
    /// Option definitions (default: ./paramkit.json when present)
    #[arg(short, long, value_name = "FILE")]
    defs: Option<PathBuf>,

    /// Override the option prefix: -, -- or auto
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,
}

#[derive(Parser)]
struct ParseArgs {
    #[command(flatten)]
    defs: DefsArgs,

    /// Accept options that are not defined
    #[arg(long)]
    arbitrary: bool,

    /// Report failures as errors instead of printing the help page
    #[arg(long)]
    no_exit: bool,

    /// Maximum number of warnings to report
    #[arg(long, value_name = "N")]
    max_warnings: Option<usize>,

    /// Arguments to parse
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Parser)]
struct HelpArgs {
    #[command(flatten)]
    defs: DefsArgs,

    /// Show the page of this command
    #[arg(value_name = "COMMAND")]
    command: Option<String>,
}

#[derive(Parser)]
struct NormalizeArgs {
    /// Type descriptors such as `l:i` or `verb`
    #[arg(value_name = "TYPE", required = true)]
    types: Vec<String>,
}

#[derive(Parser)]
struct CoerceArgs {
    /// Target type
    #[arg(short = 't', long = "type", default_value = "auto", value_name = "TYPE")]
    ty: String,

    /// Option name, consulted by the verbose type
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// The raw value
    #[arg(value_name = "VALUE", allow_hyphen_values = true)]
    value: String,
}

/// What `parse` prints.
#[derive(Serialize)]
struct ParseReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    values: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    global: Option<IndexMap<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Init(args) => init(args),
        Command::Parse(args) => parse(args),
        Command::Help(args) => help(args),
        Command::Normalize(args) => normalize(args),
        Command::Coerce(args) => coerce(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let dest = write_default_definitions(&dir, args.force)?;
    eprintln!("Created: {}", dest.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit paramkit.json to declare your options");
    eprintln!("  2. Run: paramkit help");
    eprintln!("  3. Run: paramkit parse -- <ARGS>");
    Ok(())
}

fn definitions(args: &DefsArgs) -> Result<Definitions> {
    Ok(load_definitions(args.defs.as_deref())?.unwrap_or_default())
}

fn prefix_override(args: &DefsArgs) -> Result<Option<Prefix>> {
    args.prefix
        .as_deref()
        .map(|spelling| spelling.parse::<Prefix>())
        .transpose()
        .context("invalid --prefix")
}

fn registry(args: &DefsArgs) -> Result<Registry> {
    let mut registry = definitions(args)?.registry()?;
    if let Some(prefix) = prefix_override(args)? {
        registry.set_prefix(prefix);
    }
    Ok(registry)
}

fn commands(defs: &Definitions, args: &DefsArgs) -> Result<Commands> {
    let mut commands = defs.commands()?;
    if let Some(prefix) = prefix_override(args)? {
        commands.set_prefix(prefix);
    }
    Ok(commands)
}

fn print_json(report: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn parse(args: ParseArgs) -> Result<()> {
    tracing::debug!(args = args.args.len(), "executing parse command");
    let opts = ParseOptions {
        arbitrary: args.arbitrary,
    };
    let defs = definitions(&args.defs)?;

    if defs.has_commands() {
        let mut commands = commands(&defs, &args.defs)?;
        if let Some(max) = args.max_warnings {
            commands.global_mut().set_max_warnings(max);
        }
        let parsed = if args.no_exit {
            commands
                .try_parse(&args.args, &opts)
                .context("failed to parse command line")?
        } else {
            commands.parse(&args.args, &opts)?
        };
        return print_json(&ParseReport {
            command: Some(parsed.command),
            values: parsed.values,
            global: Some(parsed.global),
            warnings: if args.no_exit { parsed.warnings } else { Vec::new() },
        });
    }

    let mut registry = defs.registry()?;
    if let Some(prefix) = prefix_override(&args.defs)? {
        registry.set_prefix(prefix);
    }
    if let Some(max) = args.max_warnings {
        registry.set_max_warnings(max);
    }
    let report = if args.no_exit {
        let parsed = registry
            .try_parse(&args.args, &opts)
            .context("failed to parse command line")?;
        ParseReport {
            command: None,
            values: parsed.values,
            global: None,
            warnings: parsed.warnings,
        }
    } else {
        ParseReport {
            command: None,
            values: registry.parse(&args.args, &opts)?,
            global: None,
            warnings: Vec::new(),
        }
    };
    print_json(&report)
}

fn help(args: HelpArgs) -> Result<()> {
    let defs = definitions(&args.defs)?;
    let text = if defs.has_commands() {
        let commands = commands(&defs, &args.defs)?;
        match &args.command {
            Some(command) => commands.command_help_text(command, None)?,
            None => commands.help_text(None),
        }
    } else {
        if let Some(command) = &args.command {
            bail!("definitions declare no commands, cannot show help for {command}");
        }
        registry(&args.defs)?.help_text(None)
    };
    println!("{text}");
    Ok(())
}

fn normalize(args: NormalizeArgs) -> Result<()> {
    for spelling in &args.types {
        let ty = TypeDescriptor::normalize(spelling)
            .with_context(|| format!("failed to normalize type `{spelling}`"))?;
        println!("{ty}");
    }
    Ok(())
}

fn coerce(args: CoerceArgs) -> Result<()> {
    let ty = TypeDescriptor::normalize(&args.ty)
        .with_context(|| format!("failed to normalize type `{}`", args.ty))?;
    let value = paramkit::coerce::coerce(Value::from(args.value.as_str()), &ty, args.name.as_deref())
        .with_context(|| format!("failed to coerce value to `{ty}`"))?;
    print_json(&value)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
