//! First pass over the command line: classify every token as an option or a
//! value and push raw values into the options they belong to. Nothing is
//! coerced here.

use crate::coerce::is_bool_literal;
use crate::error::Result;
use crate::param::{validate_name, Entry, Param, POSITIONAL};
use crate::registry::{ParamId, Prefix, Registry};
use crate::types::{Primary, TypeDescriptor};
use crate::value::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static OPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z@][\w,\._-]*)?(?::([\w:]+))?(?:=(.*))?$")
        .expect("static regex must compile")
});

/// Where the values pushed for a name live.
#[derive(Debug)]
pub(crate) enum Slot {
    /// An option of the registry.
    Declared(ParamId),
    /// An option the command line introduced.
    Fresh(Param),
}

#[derive(Debug, Default)]
pub(crate) struct Preparsed {
    /// Every name the command line touched, in order of first appearance.
    pub touched: IndexMap<String, Slot>,
    /// Values that belong to no option.
    pub pending: Vec<Value>,
}

struct Scan<'r> {
    registry: &'r mut Registry,
    touched: IndexMap<String, Slot>,
    pending: Vec<Value>,
    last: Option<String>,
}

impl Registry {
    /// Push every token of `args` into the option it belongs to.
    pub(crate) fn preparse<S: AsRef<str>>(&mut self, args: &[S]) -> Result<Preparsed> {
        let mut scan = Scan {
            registry: self,
            touched: IndexMap::new(),
            pending: Vec::new(),
            last: None,
        };
        for arg in args {
            let arg = arg.as_ref();
            if arg.starts_with('-') {
                scan.option_candidate(arg)?;
            } else {
                scan.value_candidate(arg);
            }
        }
        let preparsed = scan.finish()?;
        tracing::debug!(
            tokens = args.len(),
            touched = preparsed.touched.len(),
            pending = preparsed.pending.len(),
            "scanned command line"
        );
        Ok(preparsed)
    }
}

impl Scan<'_> {
    fn param_mut(&mut self, name: &str) -> Option<&mut Param> {
        match self.touched.get_mut(name)? {
            Slot::Declared(id) => {
                let id = *id;
                Some(self.registry.param_mut(id))
            }
            Slot::Fresh(param) => Some(param),
        }
    }

    /// Make sure `name` has a slot. `fresh` builds the option when the
    /// registry does not know it.
    fn touch(&mut self, name: &str, fresh: impl FnOnce() -> Result<Param>) -> Result<()> {
        if self.touched.contains_key(name) {
            return Ok(());
        }
        let slot = match self.registry.id_of(name) {
            Some(id) => Slot::Declared(id),
            None => Slot::Fresh(fresh()?),
        };
        self.touched.insert(name.to_string(), slot);
        Ok(())
    }

    fn touch_positional(&mut self) -> Result<()> {
        self.touch(POSITIONAL, || {
            Param::with_value(POSITIONAL, Value::List(Vec::new()))
        })
    }

    fn value_candidate(&mut self, arg: &str) {
        let entry = Entry::from(arg);
        match self.last.clone() {
            Some(last) => {
                if let Some(param) = self.param_mut(&last) {
                    param.push(Some(entry), None);
                }
            }
            None => self.pending.push(entry.into_value()),
        }
    }

    fn option_candidate(&mut self, arg: &str) -> Result<()> {
        let no_prefix = arg.trim_start_matches('-');
        let opt_name = no_prefix.split(['.', ':', '=']).next().unwrap_or_default();
        let name_len = opt_name.chars().count();
        let prefix = &arg[..arg.len() - no_prefix.len()];
        let mode = self.registry.prefix();

        // ---a, or a prefix the mode never produces
        if prefix.len() > 2
            || (mode == Prefix::Short && prefix == "--")
            || (mode == Prefix::Long && prefix == "-")
            || (mode == Prefix::Auto && prefix == "--" && name_len <= 1)
        {
            self.value_candidate(arg);
            return Ok(());
        }

        if matches!(mode, Prefix::Auto | Prefix::Short)
            && prefix == "-"
            && name_len > 1
            && (mode != Prefix::Short || !self.registry.contains(opt_name))
            && !no_prefix.contains('=')
        {
            // -abc with a, b and c all bool flags
            if (!no_prefix.contains(':') || no_prefix.ends_with(":bool"))
                && self.registry.all_flags(opt_name)
            {
                for flag in opt_name.chars() {
                    let flag = flag.to_string();
                    self.touch(&flag, || Param::new(&flag))?;
                    if let Some(param) = self.param_mut(&flag) {
                        param.push(Some(Value::Bool(true).into()), Some(TypeDescriptor::BOOL));
                    }
                }
                self.last = None;
                return Ok(());
            }

            // -n20 or -a1:int reads as `-n 20`
            let mut chars = opt_name.chars();
            let first = chars.next().map(String::from).unwrap_or_default();
            let attached = chars.as_str();
            if self.registry.contains(&first) {
                let ty = match no_prefix.split_once(':') {
                    Some((_, spelling)) => Some(TypeDescriptor::normalize(spelling)?),
                    None => None,
                };
                self.touch(&first, || Param::new(&first))?;
                if let Some(param) = self.param_mut(&first) {
                    let entry = Some(Entry::from(attached));
                    match ty {
                        Some(ty) => param.push(entry, Some(ty)),
                        None => param.push_as_origin(entry),
                    }
                }
                self.last = None;
                return Ok(());
            }

            if mode == Prefix::Auto {
                self.value_candidate(arg);
                return Ok(());
            }
        }

        let Some(caps) = OPT_RE.captures(no_prefix) else {
            self.value_candidate(arg);
            return Ok(());
        };
        let name = caps.get(1).map_or(POSITIONAL, |m| m.as_str());
        if validate_name(name).is_err() {
            self.value_candidate(arg);
            return Ok(());
        }
        let ty = caps
            .get(2)
            .map(|m| TypeDescriptor::normalize(m.as_str()))
            .transpose()?;
        let value = caps
            .get(3)
            .map(|m| m.as_str())
            .filter(|raw| !raw.is_empty())
            .map(Entry::from);

        if name == POSITIONAL && ty.is_none() {
            self.touch_positional()?;
        } else {
            self.touch(name, || Param::new(name))?;
        }
        if let Some(param) = self.param_mut(name) {
            match ty {
                Some(ty) => param.push(value, Some(ty)),
                None => param.push_as_origin(value),
            }
        }
        self.last = Some(name.to_string());

        if let Some((root, _)) = name.split_once('.') {
            self.touch(root, || Param::with_value(root, Value::Dict(IndexMap::new())))?;
            if let Some(param) = self.param_mut(root) {
                param.push(Some(Entry::Path(name.to_string())), Some(TypeDescriptor::DICT));
            }
        }
        Ok(())
    }

    /// Route trailing values. Without any option they are all positional;
    /// after a scalar option only its first value is kept.
    fn finish(mut self) -> Result<Preparsed> {
        let Some(last) = self.last.take() else {
            if !self.pending.is_empty() {
                self.touch_positional()?;
                let pending = std::mem::take(&mut self.pending);
                if let Some(param) = self.param_mut(POSITIONAL) {
                    for value in pending {
                        param.push(Some(Entry::Value(value)), None);
                    }
                }
            }
            return Ok(self.into_preparsed());
        };

        let positional = match self.param_mut(&last) {
            Some(param) => trailing_values(param),
            None => Vec::new(),
        };
        if self.touched.contains_key(POSITIONAL) || positional.is_empty() {
            self.pending
                .extend(positional.into_iter().map(Entry::into_value));
            return Ok(self.into_preparsed());
        }
        self.touch_positional()?;
        if let Some(param) = self.param_mut(POSITIONAL) {
            for entry in positional {
                param.push(Some(entry), None);
            }
        }
        Ok(self.into_preparsed())
    }

    fn into_preparsed(self) -> Preparsed {
        Preparsed {
            touched: self.touched,
            pending: self.pending,
        }
    }
}

/// Values the last option on the line does not take.
fn trailing_values(param: &mut Param) -> Vec<Entry> {
    let Some(top) = param.stack().last() else {
        return Vec::new();
    };
    if top.ty.primary() == Primary::List || top.values.len() < 2 {
        return Vec::new();
    }
    let rejects_first = top.ty == TypeDescriptor::BOOL
        && matches!(&top.values[0], Entry::Value(value) if !is_bool_literal(value));
    param.split_off_top(if rejects_first { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::with_prog("prog")
    }

    /// Raw values of the top frame of every touched option.
    fn pushed(preparsed: &Preparsed, registry: &Registry) -> Vec<(String, String, Value)> {
        preparsed
            .touched
            .iter()
            .map(|(name, slot)| {
                let param = match slot {
                    Slot::Declared(id) => registry.param(*id),
                    Slot::Fresh(param) => param,
                };
                let (ty, values) = match param.stack().last() {
                    Some(frame) => (
                        frame.ty.to_string(),
                        Value::List(
                            frame
                                .values
                                .iter()
                                .map(|entry| match entry {
                                    Entry::Value(value) => value.clone(),
                                    Entry::Path(path) => Value::from(format!("<{path}>")),
                                })
                                .collect(),
                        ),
                    ),
                    None => (String::new(), Value::List(Vec::new())),
                };
                (name.clone(), ty, values)
            })
            .collect()
    }

    fn strs(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn pooled_values_go_positional() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["a", "b"]).unwrap();
        assert!(preparsed.pending.is_empty());
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![("_".into(), "list:".into(), strs(&["a", "b"]))]
        );
    }

    #[test]
    fn scalar_option_keeps_first_value() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["-a", "1", "2", "3"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![
                ("a".into(), "auto:".into(), strs(&["1"])),
                ("_".into(), "list:".into(), strs(&["2", "3"])),
            ]
        );
    }

    #[test]
    fn list_option_takes_all_values() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["-a:list", "1", "2"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![("a".into(), "list:".into(), strs(&["1", "2"]))]
        );
    }

    #[test]
    fn bool_option_rejects_non_bool_value() {
        let mut registry = registry();
        registry.declare("b", false).unwrap();
        let preparsed = registry.preparse(&["-b", "x", "y"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![
                ("b".into(), "bool:".into(), Value::List(Vec::new())),
                ("_".into(), "list:".into(), strs(&["x", "y"])),
            ]
        );

        let preparsed = self::registry().preparse(&["-b:bool", "x"]).unwrap();
        assert_eq!(preparsed.touched.len(), 1);
    }

    #[test]
    fn explicit_positional_keeps_trailing_values_pending() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["-=x", "-a", "1", "2"]).unwrap();
        assert_eq!(preparsed.pending, vec![Value::from("2")]);
    }

    #[test]
    fn bundled_bool_flags() {
        let mut registry = registry();
        for name in ["a", "b", "c"] {
            registry.declare(name, false).unwrap();
        }
        let preparsed = registry.preparse(&["-abc", "x"]).unwrap();
        let pushed = pushed(&preparsed, &registry);
        assert_eq!(pushed.len(), 4);
        for (_, ty, values) in &pushed[..3] {
            assert_eq!(ty, "bool:");
            assert_eq!(values, &Value::List(vec![Value::Bool(true)]));
        }
        assert_eq!(pushed[3], ("_".into(), "list:".into(), strs(&["x"])));
    }

    #[test]
    fn attached_value_after_short_name() {
        let mut registry = registry();
        registry.declare("n", 1).unwrap();
        let preparsed = registry.preparse(&["-n20"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![("n".into(), "int:".into(), strs(&["20"]))]
        );

        let mut registry = Registry::with_prog("prog");
        registry.declare("n", 1).unwrap();
        let preparsed = registry.preparse(&["-n1:float"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![("n".into(), "float:".into(), strs(&["1"]))]
        );
    }

    #[test]
    fn undeclared_bundle_is_a_value_in_auto_mode() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["-xyz"]).unwrap();
        assert!(preparsed.touched.contains_key("_"));
        assert_eq!(
            pushed(&preparsed, &registry)[0].2,
            strs(&["-xyz"])
        );
    }

    #[test]
    fn prefix_shapes() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["--a", "---b"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![("_".into(), "list:".into(), strs(&["--a", "---b"]))]
        );

        let mut registry = Registry::with_prog("prog");
        registry.set_prefix(Prefix::Short);
        let preparsed = registry.preparse(&["-abc", "1", "--x"]).unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![
                ("abc".into(), "auto:".into(), strs(&["1"])),
                ("_".into(), "list:".into(), strs(&["--x"])),
            ]
        );

        let mut registry = Registry::with_prog("prog");
        registry.set_prefix(Prefix::Long);
        let preparsed = registry.preparse(&["-a", "--a=1"]).unwrap();
        assert_eq!(preparsed.pending, vec![Value::from("-a")]);
        assert!(preparsed.touched.contains_key("a"));
    }

    #[test]
    fn typed_and_inline_values() {
        let mut registry = registry();
        let preparsed = registry
            .preparse(&["--abc:int=1", "--def=", "--ghi:list", "2"])
            .unwrap();
        assert_eq!(
            pushed(&preparsed, &registry),
            vec![
                ("abc".into(), "int:".into(), strs(&["1"])),
                ("def".into(), "auto:".into(), Value::List(Vec::new())),
                ("ghi".into(), "list:".into(), strs(&["2"])),
            ]
        );
    }

    #[test]
    fn dotted_names_push_into_root() {
        let mut registry = registry();
        let preparsed = registry.preparse(&["-a.b", "1", "-a.c.d=2"]).unwrap();
        let pushed = pushed(&preparsed, &registry);
        assert_eq!(pushed[0], ("a.b".into(), "auto:".into(), strs(&["1"])));
        assert_eq!(
            pushed[1],
            (
                "a".into(),
                "dict:".into(),
                Value::List(vec![
                    Value::Dict(IndexMap::new()),
                    Value::from("<a.b>"),
                    Value::from("<a.c.d>"),
                ])
            )
        );
        assert_eq!(pushed[2], ("a.c.d".into(), "auto:".into(), strs(&["2"])));
    }

    #[test]
    fn bad_type_in_token_is_an_error() {
        let mut registry = registry();
        assert!(registry.preparse(&["-a:nosuchtype", "1"]).is_err());
    }
}
