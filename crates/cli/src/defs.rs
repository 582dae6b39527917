use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use paramkit::{Commands, Prefix, Registry, Value};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DEFS_NAME: &str = "paramkit.json";

/// Option definitions read from a JSON file.
///
/// `options` is the flat map the registry imports: plain keys are values,
/// `name.desc`, `name.type`, `name.alias` and friends are attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definitions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<Vec<String>>,

    /// `-`, `--` or `auto`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "help_names")]
    pub help_names: Option<Vec<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "help_on_empty"
    )]
    pub help_on_empty: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "max_warnings"
    )]
    pub max_warnings: Option<usize>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, Value>,

    /// Subcommands. When present, `options` are the global options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<IndexMap<String, CommandDefs>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<bool>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "help_commands"
    )]
    pub help_commands: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDefs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub desc: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, Value>,
}

impl Definitions {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read definitions: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse definitions JSON: {}", path.display()))
    }

    pub fn has_commands(&self) -> bool {
        self.commands.is_some()
    }

    fn prefix(&self) -> Result<Option<Prefix>> {
        self.prefix
            .as_deref()
            .map(|spelling| spelling.parse::<Prefix>())
            .transpose()
            .context("invalid prefix in definitions")
    }

    /// A registry holding the top-level options.
    pub fn registry(&self) -> Result<Registry> {
        let mut registry = match &self.prog {
            Some(prog) => Registry::with_prog(prog.clone()),
            None => Registry::new(),
        };
        if let Some(usage) = &self.usage {
            registry.set_usage(usage);
        }
        if let Some(desc) = &self.desc {
            registry.set_desc(desc);
        }
        if let Some(prefix) = self.prefix()? {
            registry.set_prefix(prefix);
        }
        if let Some(names) = &self.help_names {
            registry
                .set_help_names(names)
                .context("invalid help option names")?;
        }
        if let Some(help_on_empty) = self.help_on_empty {
            registry.set_help_on_empty(help_on_empty);
        }
        if let Some(max) = self.max_warnings {
            registry.set_max_warnings(max);
        }
        registry
            .load_dict(&self.options, None)
            .context("invalid option definitions")?;
        Ok(registry)
    }

    /// Subcommands with `options` as their global options.
    pub fn commands(&self) -> Result<Commands> {
        let Some(defs) = &self.commands else {
            bail!("definitions declare no commands");
        };
        let mut commands = match &self.prog {
            Some(prog) => Commands::with_prog(prog.clone()),
            None => Commands::new(),
        };
        if let Some(desc) = &self.desc {
            commands.set_desc(desc);
        }
        if let Some(inherit) = self.inherit {
            commands.set_inherit(inherit);
        }
        if let Some(prefix) = self.prefix()? {
            commands.set_prefix(prefix);
        }
        if let Some(names) = &self.help_commands {
            commands
                .set_help_commands(names)
                .context("invalid help command names")?;
        }
        if let Some(max) = self.max_warnings {
            commands.global_mut().set_max_warnings(max);
        }
        commands
            .global_mut()
            .load_dict(&self.options, None)
            .context("invalid global option definitions")?;

        for (name, def) in defs {
            let registry = commands
                .add_command(name, &def.desc)
                .with_context(|| format!("invalid command: {name}"))?;
            if let Some(usage) = &def.usage {
                registry.set_usage(usage);
            }
            if let Some(max) = self.max_warnings {
                registry.set_max_warnings(max);
            }
            registry
                .load_dict(&def.options, None)
                .with_context(|| format!("invalid option definitions for command {name}"))?;
            for alias in &def.aliases {
                commands
                    .alias(alias, name)
                    .with_context(|| format!("invalid alias {alias} for command {name}"))?;
            }
        }
        Ok(commands)
    }
}

/// Definitions from `path`, or from `paramkit.json` in the current directory
/// when no path is given. A missing default file is not an error.
pub fn load_definitions(path: Option<&Path>) -> Result<Option<Definitions>> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let (path, explicit) = match path {
        Some(p) => (resolve_against(&cwd, p), true),
        None => (cwd.join(DEFAULT_DEFS_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("definitions not found: {}", path.display());
        }
        return Ok(None);
    }
    tracing::debug!(path = %path.display(), "loading definitions");
    Definitions::from_file(&path).map(Some)
}

/// Write a starter `paramkit.json` into `dir`. An existing file is kept
/// unless `overwrite` is set.
pub fn write_default_definitions(dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = dir.join(DEFAULT_DEFS_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let prog = guess_prog(dir).unwrap_or_else(|| "my-cli".to_string());
    let mut options = IndexMap::new();
    options.insert("n".to_string(), Value::Int(10));
    options.insert("n.desc".to_string(), Value::from("Number of rows to show."));
    options.insert("nrows.alias".to_string(), Value::from("n"));
    options.insert("v".to_string(), Value::Int(0));
    options.insert("v.type".to_string(), Value::from("verbose"));
    options.insert("v.desc".to_string(), Value::from("Verbosity."));
    options.insert("_".to_string(), Value::List(Vec::new()));
    options.insert("_.desc".to_string(), Value::from("Input files."));

    let defs = Definitions {
        prog: Some(prog),
        desc: Some(vec!["Describe your program here.".to_string()]),
        options,
        ..Default::default()
    };

    let bytes = serde_json::to_vec_pretty(&defs).context("failed to serialize definitions")?;
    let mut out = String::from_utf8(bytes).context("definitions are not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_prog(dir: &Path) -> Option<String> {
    let file_name = dir.file_name().and_then(|s| s.to_str());
    let direct = file_name.filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| s.to_string())
}
