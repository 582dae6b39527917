//! Declaring options from a flat configuration map.
//!
//! Plain keys are option values. Dotted keys set attributes of the option
//! named by the part before the dot: `a.desc`, `a.required`, `a.show`,
//! `a.type`, `a.value`, and `a.alias` to make `a` another name of an
//! existing option.

use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::value::Value;
use indexmap::IndexMap;

const ALIAS_SUFFIX: &str = ".alias";

impl Registry {
    /// Apply `map` to the registry. `show`, when given, overrides the
    /// visibility of every option the map names; an explicit `.show` key
    /// still wins.
    pub fn load_dict(&mut self, map: &IndexMap<String, Value>, show: Option<bool>) -> Result<&mut Self> {
        for (key, value) in map.iter().filter(|(key, _)| !key.contains('.')) {
            let param = match self.id_of(key) {
                Some(id) => self.param_mut(id).set_value(value.clone())?,
                None => self.declare(key, value.clone())?,
            };
            if let Some(show) = show {
                param.set_show(show);
            }
        }

        // options known only through their attributes
        for key in map.keys() {
            if !key.contains('.') || key.ends_with(ALIAS_SUFFIX) {
                continue;
            }
            let Some((name, _)) = key.split_once('.') else {
                continue;
            };
            if self.contains(name) {
                continue;
            }
            let param = self.get(name)?;
            if let Some(show) = show {
                param.set_show(show);
            }
        }

        for (key, target) in map {
            let Some(name) = key.strip_suffix(ALIAS_SUFFIX) else {
                continue;
            };
            let target = match target {
                Value::Str(target) if self.contains(target) => target,
                other => {
                    return Err(Error::Load(format!(
                        "Cannot set alias {} to an undefined option {}",
                        Value::from(name).repr(),
                        other.repr()
                    )));
                }
            };
            self.alias(name, target)?;
        }

        for (key, value) in map {
            if key.ends_with(ALIAS_SUFFIX) {
                continue;
            }
            let Some((name, attribute)) = key.split_once('.') else {
                continue;
            };
            self.set_attribute(name, attribute, value)?;
        }
        tracing::debug!(keys = map.len(), options = self.groups().len(), "loaded option map");
        Ok(self)
    }

    fn set_attribute(&mut self, name: &str, attribute: &str, value: &Value) -> Result<()> {
        let param = self.get(name)?;
        match attribute {
            "desc" => {
                let lines: Vec<String> = match value {
                    Value::List(items) => items.iter().map(Value::to_string).collect(),
                    other => vec![other.to_string()],
                };
                param.set_desc(lines)?;
            }
            "required" => {
                param.set_required(value.is_truthy())?;
            }
            "show" => {
                param.set_show(value.is_truthy());
            }
            "type" => match value {
                Value::Str(spelling) => {
                    param.set_type(spelling)?;
                }
                other => {
                    return Err(Error::Load(format!(
                        "Type of option {} must be a string, got {}",
                        Value::from(name).repr(),
                        other.repr()
                    )));
                }
            },
            "value" => {
                param.set_value(value.clone())?;
            }
            other => {
                return Err(Error::Load(format!(
                    "Unknown attribute {} for option {}",
                    Value::from(other).repr(),
                    Value::from(name).repr()
                )));
            }
        }
        Ok(())
    }
}
