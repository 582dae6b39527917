//! Help page assembly and plain-text rendering.
//!
//! A page is an ordered list of titled sections. Each body is either plain
//! lines (description, usage) or option rows. Registries build their page
//! here; a help hook can then edit it before it is rendered.

use crate::param::{Param, POSITIONAL};
use crate::registry::{ParamId, Registry};
use crate::types::{Primary, TypeDescriptor};
use std::fmt;

/// Widest page, not counting the leading indent.
const MAX_PAGE_WIDTH: usize = 100;
/// Widest name column; longer rows put the description on the next line.
const MAX_OPT_WIDTH: usize = 36;
/// Smallest gap between the name column and the description.
const MIN_DESC_GAP: usize = 5;

pub const DESCRIPTION_TITLE: &str = "DESCRIPTION";
pub const USAGE_TITLE: &str = "USAGE";
pub const REQUIRED_TITLE: &str = "REQUIRED OPTIONS";
pub const OPTIONAL_TITLE: &str = "OPTIONAL OPTIONS";

/// One row of an options section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    /// Display names, already prefixed and joined (`-n, --nrows`).
    pub names: String,
    /// Type label such as `<INT>` or `[BOOL]`; may be empty.
    pub label: String,
    pub desc: Vec<String>,
}

impl OptionRow {
    pub fn new(names: impl Into<String>, label: impl Into<String>, desc: Vec<String>) -> Self {
        Self {
            names: names.into(),
            label: label.into(),
            desc,
        }
    }

    /// An empty row, rendered as a blank line.
    pub fn separator() -> Self {
        Self::new("", "", Vec::new())
    }

    fn is_separator(&self) -> bool {
        self.names.is_empty() && self.label.is_empty()
    }

    /// Whether `name` is one of this row's names, with or without prefix.
    fn answers_to(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        let delimiter = if self.names.contains(" | ") { " | " } else { ", " };
        self.names.split(delimiter).any(|alias| {
            let alias = alias.trim().to_lowercase();
            alias == wanted || alias.trim_start_matches('-') == wanted
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Lines(Vec<String>),
    Options(Vec<OptionRow>),
}

impl SectionBody {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Lines(lines) => lines.is_empty(),
            Self::Options(rows) => rows.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: SectionBody,
}

impl Section {
    /// Index of the option row answering to `name`.
    pub fn find_row(&self, name: &str) -> Option<usize> {
        match &self.body {
            SectionBody::Options(rows) => rows.iter().position(|row| row.answers_to(name)),
            SectionBody::Lines(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpPage {
    prog: String,
    sections: Vec<Section>,
}

impl HelpPage {
    pub fn new(prog: impl Into<String>) -> Self {
        Self {
            prog: prog.into(),
            sections: Vec::new(),
        }
    }

    pub fn prog(&self) -> &str {
        &self.prog
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn position(&self, title: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.title.eq_ignore_ascii_case(title))
    }

    /// Section whose title matches `title`, ignoring case.
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.position(title).map(|idx| &self.sections[idx])
    }

    pub fn section_mut(&mut self, title: &str) -> Option<&mut Section> {
        self.position(title).map(move |idx| &mut self.sections[idx])
    }

    /// Append a section, or replace the body of the one with that title.
    pub fn add(&mut self, title: impl Into<String>, body: SectionBody) -> &mut Self {
        let title = title.into();
        match self.position(&title) {
            Some(idx) => self.sections[idx].body = body,
            None => self.sections.push(Section { title, body }),
        }
        self
    }

    /// Insert a section before `anchor`. Returns `false` when no section
    /// matches `anchor`.
    pub fn insert_before(&mut self, anchor: &str, title: impl Into<String>, body: SectionBody) -> bool {
        let Some(idx) = self.position(anchor) else {
            return false;
        };
        self.sections.insert(
            idx,
            Section {
                title: title.into(),
                body,
            },
        );
        true
    }

    pub fn insert_after(&mut self, anchor: &str, title: impl Into<String>, body: SectionBody) -> bool {
        let Some(idx) = self.position(anchor) else {
            return false;
        };
        self.sections.insert(
            idx + 1,
            Section {
                title: title.into(),
                body,
            },
        );
        true
    }

    pub fn remove(&mut self, title: &str) -> Option<Section> {
        self.position(title).map(|idx| self.sections.remove(idx))
    }

    /// Width of the name column shared by every options section.
    fn name_width(&self) -> usize {
        self.sections
            .iter()
            .filter_map(|section| match &section.body {
                SectionBody::Options(rows) => Some(rows),
                SectionBody::Lines(_) => None,
            })
            .flatten()
            .map(row_width)
            .filter(|width| *width <= MAX_OPT_WIDTH)
            .max()
            .unwrap_or(MAX_OPT_WIDTH)
    }

    /// Render the page, with `error` lines above it.
    pub fn render(&self, error: Option<&str>) -> String {
        let mut out: Vec<String> = Vec::new();
        if let Some(error) = error {
            for line in error.lines() {
                out.push(format!("Error: {}", self.substitute(line.trim())));
            }
        }

        let width = self.name_width();
        for section in &self.sections {
            if section.body.is_empty() {
                continue;
            }
            out.push(format!("{}:", capitalize(&section.title)));
            match &section.body {
                SectionBody::Lines(lines) => {
                    for line in lines {
                        let line = self.substitute(line);
                        out.extend(wrap(&format!("  {line}"), MAX_PAGE_WIDTH));
                    }
                }
                SectionBody::Options(rows) => {
                    for row in rows {
                        self.render_row(row, width, &mut out);
                    }
                }
            }
            out.push(String::new());
        }
        while out.last().is_some_and(String::is_empty) {
            out.pop();
        }
        out.join("\n")
    }

    fn render_row(&self, row: &OptionRow, width: usize, out: &mut Vec<String>) {
        if row.is_separator() {
            out.push(String::new());
            return;
        }
        let desc: Vec<String> = row
            .desc
            .iter()
            .flat_map(|line| wrap(&self.substitute(line), MAX_PAGE_WIDTH.saturating_sub(width)))
            .collect();
        let left = format!("  {} {}", row.names, row.label);
        let mut desc = desc.into_iter();
        match desc.next() {
            Some(first) if row_width(row) <= MAX_OPT_WIDTH => {
                out.push(format!("{left:width$}- {first}"));
            }
            Some(first) => {
                out.push(left.trim_end().to_string());
                out.push(format!("{:width$}- {first}", ""));
            }
            None => out.push(left.trim_end().to_string()),
        }
        for line in desc {
            out.push(format!("{:width$}  {line}", ""));
        }
    }

    fn substitute(&self, line: &str) -> String {
        line.replace("{prog}", &self.prog)
    }
}

impl fmt::Display for HelpPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

fn row_width(row: &OptionRow) -> usize {
    // two leading spaces, one between names and label, five of gap
    row.names.chars().count() + row.label.chars().count() + MIN_DESC_GAP + 3
}

fn capitalize(title: &str) -> String {
    let lower = title.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Greedy word wrap. Broken lines end with ` \` and continue indented like
/// the first line plus two spaces.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.saturating_sub(2).max(10);
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }
    let indent: String = text.chars().take_while(|c| c.is_whitespace()).collect();
    let continued = format!("{indent}  ");
    let mut lines = Vec::new();
    let mut current = indent.clone();
    for word in text.split_whitespace() {
        let fresh = current.trim().is_empty();
        if !fresh && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::replace(&mut current, continued.clone()));
        }
        if !current.trim().is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    lines.push(current);
    let last = lines.len() - 1;
    for line in &mut lines[..last] {
        line.push_str(" \\");
    }
    lines
}

/// Order in which aliases are listed: verbose spellings first, then by
/// length, lowercase before uppercase.
fn alias_key(alias: &str) -> (usize, String) {
    let rank = if alias.contains('|') { 0 } else { alias.chars().count() };
    let mut key = String::new();
    for c in alias.chars() {
        if c.is_uppercase() {
            key.extend(c.to_lowercase());
            key.push('1');
        } else {
            key.push(c);
        }
    }
    (rank, key)
}

fn type_label(param: &Param, aliases: usize, is_help: bool) -> String {
    let ty = param.ty();
    let verbose = ty.primary() == Primary::Verbose;
    if verbose && aliases > 1 {
        "<VERBOSITY>".to_string()
    } else if is_help || verbose {
        String::new()
    } else if ty == TypeDescriptor::BOOL {
        "[BOOL]".to_string()
    } else {
        format!("<{}>", ty.to_string().trim_end_matches(':').to_uppercase())
    }
}

impl Registry {
    /// Row describing option `id` under `names`.
    pub(crate) fn option_row(&self, id: ParamId, names: &[&str], is_help: bool) -> OptionRow {
        let param = self.param(id);
        let mut aliases: Vec<String> = Vec::new();
        for name in names {
            if !aliases.iter().any(|alias| alias == name) {
                aliases.push((*name).to_string());
            }
        }
        let label = type_label(param, aliases.len(), is_help);
        if param.ty().primary() == Primary::Verbose {
            let name = param.name();
            if let Some(own) = aliases.iter_mut().find(|alias| alias.as_str() == name) {
                *own = format!("-{name}|{}|{}", name.repeat(2), name.repeat(3));
            }
        }
        aliases.sort_by_key(|alias| alias_key(alias));
        let names: Vec<String> = aliases
            .iter()
            .map(|alias| {
                if alias == POSITIONAL {
                    "POSITIONAL".to_string()
                } else if alias.starts_with('-') {
                    alias.clone()
                } else {
                    self.prefixed(alias)
                }
            })
            .collect();

        let mut desc = param.description();
        if is_help {
            if let Some(last) = desc.last_mut() {
                if let Some(stripped) = last.strip_suffix("Default: False") {
                    *last = stripped.trim_end().to_string();
                }
            }
            if desc.last().is_some_and(String::is_empty) {
                desc.pop();
            }
        }
        OptionRow::new(names.join(", "), label, desc)
    }

    /// Visible options other than help and positional, split into required
    /// and optional rows.
    pub(crate) fn option_rows(&self) -> (Vec<OptionRow>, Vec<OptionRow>) {
        let mut required = Vec::new();
        let mut optional = Vec::new();
        for (id, names) in self.groups() {
            let param = self.param(id);
            if !param.show() {
                continue;
            }
            let names: Vec<&str> = names
                .into_iter()
                .filter(|name| *name != POSITIONAL && !self.help_names().iter().any(|h| h == name))
                .collect();
            if names.is_empty() {
                continue;
            }
            let row = self.option_row(id, &names, false);
            if param.required() {
                required.push(row);
            } else {
                optional.push(row);
            }
        }
        (required, optional)
    }

    /// Row for the help option, when there is one.
    pub(crate) fn help_row(&self) -> Option<OptionRow> {
        let first = self.help_names().first()?;
        let id = self.id_of(first)?;
        let names: Vec<&str> = self.help_names().iter().map(String::as_str).collect();
        Some(self.option_row(id, &names, true))
    }

    fn default_usage(&self) -> String {
        let mut usage = String::from("{prog}");
        for (id, names) in self.groups() {
            let param = self.param(id);
            if !param.show() || !param.required() || names.contains(&POSITIONAL) {
                continue;
            }
            let ty = param.ty().to_string();
            let ty = ty.trim_end_matches(':');
            let placeholder = if ty.is_empty() { names[0] } else { ty };
            usage.push_str(&format!(
                " <{} {}>",
                self.prefixed(names[0]),
                placeholder.to_uppercase()
            ));
        }
        usage.push_str(" [OPTIONS]");
        if let Some(positional) = self.lookup(POSITIONAL) {
            usage.push_str(if positional.required() {
                " POSITIONAL"
            } else {
                " [POSITIONAL]"
            });
        }
        usage
    }

    /// The help page, after the help hook had its say.
    pub fn help_page(&self) -> HelpPage {
        let mut page = HelpPage::new(self.prog());
        if !self.desc().is_empty() {
            page.add(DESCRIPTION_TITLE, SectionBody::Lines(self.desc().to_vec()));
        }
        let usage = if self.usage().is_empty() {
            vec![self.default_usage()]
        } else {
            self.usage().to_vec()
        };
        page.add(USAGE_TITLE, SectionBody::Lines(usage));

        let (mut required, mut optional) = self.option_rows();
        optional.extend(self.help_row());
        if let Some(id) = self.id_of(POSITIONAL) {
            let target = if self.param(id).required() {
                &mut required
            } else {
                &mut optional
            };
            if !target.is_empty() {
                target.push(OptionRow::separator());
            }
            target.push(self.option_row(id, &[POSITIONAL], false));
        }
        page.add(REQUIRED_TITLE, SectionBody::Options(required));
        page.add(OPTIONAL_TITLE, SectionBody::Options(optional));

        if let Some(hook) = self.help_hook() {
            hook(&mut page);
        }
        page
    }

    /// Rendered help page, with `error` above it.
    pub fn help_text(&self, error: Option<&str>) -> String {
        self.help_page().render(error)
    }
}
