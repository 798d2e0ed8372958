//! Translator-specific extra arguments: parsing, validation, and defaults.

use crate::prompt::ArgumentPrompter;
use crate::CoreError;
use dreamlock_runtime::{ExtraArgKind, ExtraArgSpec, ExtraArgValue, TranslatorDescriptor};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Split `key=value` assignments. Later assignments to a key win.
pub fn parse_arg_assignments(raw: &[String]) -> Result<BTreeMap<String, String>, CoreError> {
    let mut out = BTreeMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            return Err(CoreError::InvalidExtraArgument {
                key: item.clone(),
                reason: "expected key=value".to_owned(),
            });
        };
        if key.is_empty() {
            return Err(CoreError::InvalidExtraArgument {
                key: item.clone(),
                reason: "empty argument name".to_owned(),
            });
        }
        out.insert(key.to_owned(), value.to_owned());
    }
    Ok(out)
}

/// Interpret a flag value typed by a user.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

/// Resolve the full argument map `translator` is invoked with.
///
/// Specified values are checked against the translator's declared schema.
/// Anything left unspecified is asked of `prompter`, or taken from its
/// declared default when there is no prompter.
pub fn resolve_extra_args(
    translator: &TranslatorDescriptor,
    specified: &BTreeMap<String, String>,
    prompter: Option<&dyn ArgumentPrompter>,
) -> Result<BTreeMap<String, ExtraArgValue>, CoreError> {
    let unknown: Vec<&str> = specified
        .keys()
        .filter(|k| !translator.extra_args.contains_key(k.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(CoreError::InvalidExtraArgument {
            key: unknown.join(", "),
            reason: format!("not accepted by translator {}", translator.identity()),
        });
    }

    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();
    for (name, spec) in &translator.extra_args {
        let value = match (specified.get(name), prompter) {
            (Some(raw), _) => coerce(name, spec, raw)?,
            (None, Some(prompter)) => ask(prompter, name, spec)?,
            (None, None) => match spec.default.as_ref().and_then(|d| default_value(spec, d)) {
                Some(value) => value,
                None => {
                    missing.push(name.clone());
                    continue;
                }
            },
        };
        debug!("extra argument {name} = {value}");
        resolved.insert(name.clone(), value);
    }

    if !missing.is_empty() {
        return Err(CoreError::MissingRequiredArgument {
            translator: translator.identity(),
            missing,
        });
    }
    Ok(resolved)
}

fn coerce(name: &str, spec: &ExtraArgSpec, raw: &str) -> Result<ExtraArgValue, CoreError> {
    match spec.kind {
        ExtraArgKind::Value => Ok(ExtraArgValue::Value(raw.to_owned())),
        ExtraArgKind::Flag => parse_flag(raw).map(ExtraArgValue::Flag).ok_or_else(|| {
            CoreError::InvalidExtraArgument {
                key: name.to_owned(),
                reason: format!("'{raw}' is not a flag value (use yes/no, y/n, or true/false)"),
            }
        }),
    }
}

fn default_value(spec: &ExtraArgSpec, default: &Value) -> Option<ExtraArgValue> {
    match (spec.kind, default) {
        (ExtraArgKind::Flag, Value::Bool(b)) => Some(ExtraArgValue::Flag(*b)),
        (ExtraArgKind::Flag, Value::String(s)) => parse_flag(s).map(ExtraArgValue::Flag),
        (ExtraArgKind::Flag, _) | (ExtraArgKind::Value, Value::Null) => None,
        (ExtraArgKind::Value, Value::String(s)) => Some(ExtraArgValue::Value(s.clone())),
        (ExtraArgKind::Value, other) => Some(ExtraArgValue::Value(other.to_string())),
    }
}

fn ask(
    prompter: &dyn ArgumentPrompter,
    name: &str,
    spec: &ExtraArgSpec,
) -> Result<ExtraArgValue, CoreError> {
    match spec.kind {
        ExtraArgKind::Flag => prompter.confirm_flag(name, spec).map(ExtraArgValue::Flag),
        ExtraArgKind::Value => loop {
            let answer = prompter.ask_value(name, spec)?;
            if !answer.is_empty() {
                break Ok(ExtraArgValue::Value(answer));
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamlock_runtime::TranslatorKind;
    use std::cell::RefCell;

    fn spec(kind: ExtraArgKind, default: Option<Value>) -> ExtraArgSpec {
        ExtraArgSpec {
            kind,
            description: String::new(),
            examples: Vec::new(),
            default,
        }
    }

    fn translator() -> TranslatorDescriptor {
        TranslatorDescriptor {
            subsystem: "nodejs".to_owned(),
            kind: TranslatorKind::Pure,
            name: "package-lock".to_owned(),
            compatible: true,
            extra_args: BTreeMap::from([
                ("name".to_owned(), spec(ExtraArgKind::Value, None)),
                ("noDev".to_owned(), spec(ExtraArgKind::Flag, Some(Value::Bool(false)))),
                ("nodejs".to_owned(), spec(ExtraArgKind::Value, Some(Value::from("18")))),
            ]),
        }
    }

    fn assignments(items: &[&str]) -> BTreeMap<String, String> {
        let raw: Vec<String> = items.iter().map(|s| (*s).to_owned()).collect();
        parse_arg_assignments(&raw).unwrap()
    }

    /// Answers from a script; records every question asked.
    struct Scripted {
        values: RefCell<Vec<&'static str>>,
        asked: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(values: &[&'static str]) -> Self {
            Self {
                values: RefCell::new(values.iter().rev().copied().collect()),
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArgumentPrompter for Scripted {
        fn choose_translator(&self, _: &[TranslatorDescriptor]) -> Result<usize, CoreError> {
            Ok(0)
        }
        fn confirm_flag(&self, name: &str, _: &ExtraArgSpec) -> Result<bool, CoreError> {
            self.asked.borrow_mut().push(name.to_owned());
            Ok(true)
        }
        fn ask_value(&self, name: &str, _: &ExtraArgSpec) -> Result<String, CoreError> {
            self.asked.borrow_mut().push(name.to_owned());
            self.values
                .borrow_mut()
                .pop()
                .map(str::to_owned)
                .ok_or_else(|| CoreError::Prompt("script exhausted".to_owned()))
        }
    }

    #[test]
    fn assignment_without_equals_rejected() {
        let err = parse_arg_assignments(&["noDev".to_owned()]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidExtraArgument { key, .. } if key == "noDev"));
        assert!(parse_arg_assignments(&["=x".to_owned()]).is_err());
    }

    #[test]
    fn value_may_contain_equals() {
        let map = assignments(&["name=a=b"]);
        assert_eq!(map["name"], "a=b");
    }

    #[test]
    fn unknown_keys_all_reported_sorted() {
        let err =
            resolve_extra_args(&translator(), &assignments(&["zeta=1", "alpha=2", "name=x"]), None)
                .unwrap_err();
        let CoreError::InvalidExtraArgument { key, .. } = err else {
            panic!("expected InvalidExtraArgument");
        };
        assert_eq!(key, "alpha, zeta");
    }

    #[test]
    fn flag_values_coerced() {
        for (raw, expected) in [("YES", true), ("y", true), ("True", true), ("n", false), ("false", false)] {
            let args = resolve_extra_args(
                &translator(),
                &assignments(&["name=app", format!("noDev={raw}").as_str()]),
                None,
            )
            .unwrap();
            assert_eq!(args["noDev"], ExtraArgValue::Flag(expected), "input {raw}");
        }
    }

    #[test]
    fn bad_flag_value_rejected() {
        let err = resolve_extra_args(&translator(), &assignments(&["name=app", "noDev=maybe"]), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidExtraArgument { key, .. } if key == "noDev"));
    }

    #[test]
    fn defaults_fill_non_interactive() {
        let args = resolve_extra_args(&translator(), &assignments(&["name=app"]), None).unwrap();
        assert_eq!(args["noDev"], ExtraArgValue::Flag(false));
        assert_eq!(args["nodejs"], ExtraArgValue::Value("18".to_owned()));
        assert_eq!(args["name"], ExtraArgValue::Value("app".to_owned()));
    }

    #[test]
    fn missing_without_default_is_error() {
        let err = resolve_extra_args(&translator(), &BTreeMap::new(), None).unwrap_err();
        let CoreError::MissingRequiredArgument { translator, missing } = err else {
            panic!("expected MissingRequiredArgument");
        };
        assert_eq!(translator, "nodejs.pure.package-lock");
        assert_eq!(missing, vec!["name"]);
    }

    #[test]
    fn prompter_asked_for_every_missing_argument() {
        let prompter = Scripted::new(&["", "app", "20"]);
        let args = resolve_extra_args(&translator(), &BTreeMap::new(), Some(&prompter)).unwrap();
        assert_eq!(args["name"], ExtraArgValue::Value("app".to_owned()));
        assert_eq!(args["noDev"], ExtraArgValue::Flag(true));
        assert_eq!(args["nodejs"], ExtraArgValue::Value("20".to_owned()));
        assert_eq!(*prompter.asked.borrow(), vec!["name", "name", "noDev", "nodejs"]);
    }

    #[test]
    fn specified_args_not_prompted() {
        let prompter = Scripted::new(&["18"]);
        let args = resolve_extra_args(
            &translator(),
            &assignments(&["name=app", "noDev=no"]),
            Some(&prompter),
        )
        .unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(*prompter.asked.borrow(), vec!["nodejs"]);
    }
}
