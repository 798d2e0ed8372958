//! Structural validation of a lock document before it is written.

use serde_json::{Map, Value};
use thiserror::Error;

/// First structural violation found, with the JSON path where it occurred.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("schema violation at {path}: {reason}")]
pub struct SchemaError {
    pub path: String,
    pub reason: String,
}

impl SchemaError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Validate a serialized lock document.
pub fn validate_lock_value(value: &Value) -> Result<(), SchemaError> {
    let root = as_object(value, "$")?;

    let generic = root
        .get("_generic")
        .ok_or_else(|| SchemaError::new("$", "missing required key '_generic'"))?;
    validate_generic(generic)?;

    let sources = root
        .get("sources")
        .ok_or_else(|| SchemaError::new("$", "missing required key 'sources'"))?;
    validate_sources(sources)?;

    if let Some(deps) = root.get("dependencies") {
        validate_node_table(deps, "$.dependencies")?;
    }
    if let Some(cyclic) = root.get("cyclicDependencies") {
        validate_node_table(cyclic, "$.cyclicDependencies")?;
    }
    Ok(())
}

fn validate_generic(value: &Value) -> Result<(), SchemaError> {
    let generic = as_object(value, "$._generic")?;

    match generic.get("mainPackageName") {
        Some(Value::String(s)) if !s.is_empty() => {}
        Some(Value::String(_)) => {
            return Err(SchemaError::new(
                "$._generic.mainPackageName",
                "must not be empty",
            ))
        }
        Some(_) => {
            return Err(SchemaError::new(
                "$._generic.mainPackageName",
                "expected a string",
            ))
        }
        None => {
            return Err(SchemaError::new(
                "$._generic",
                "missing required key 'mainPackageName'",
            ))
        }
    }
    match generic.get("mainPackageVersion") {
        Some(Value::String(_)) => {}
        Some(_) => {
            return Err(SchemaError::new(
                "$._generic.mainPackageVersion",
                "expected a string",
            ))
        }
        None => {
            return Err(SchemaError::new(
                "$._generic",
                "missing required key 'mainPackageVersion'",
            ))
        }
    }
    for key in ["translatedBy", "translatorParams", "sourcesCombinedHash"] {
        if let Some(v) = generic.get(key) {
            if !v.is_string() {
                return Err(SchemaError::new(
                    format!("$._generic.{key}"),
                    "expected a string",
                ));
            }
        }
    }
    Ok(())
}

fn validate_sources(value: &Value) -> Result<(), SchemaError> {
    let sources = as_object(value, "$.sources")?;
    for (name, versions) in sources {
        let path = format!("$.sources.{name}");
        for (version, spec) in as_object(versions, &path)? {
            let spec_path = format!("{path}.{version}");
            let spec = as_object(spec, &spec_path)?;
            match spec.get("type") {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(SchemaError::new(
                        format!("{spec_path}.type"),
                        "expected a string",
                    ))
                }
                None => {
                    return Err(SchemaError::new(spec_path, "missing required key 'type'"));
                }
            }
            if let Some(hash) = spec.get("hash") {
                if !hash.is_string() {
                    return Err(SchemaError::new(
                        format!("{spec_path}.hash"),
                        "expected a string",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// `name -> version -> [[name, version], ...]`
fn validate_node_table(value: &Value, path: &str) -> Result<(), SchemaError> {
    for (name, versions) in as_object(value, path)? {
        let name_path = format!("{path}.{name}");
        for (version, deps) in as_object(versions, &name_path)? {
            let deps_path = format!("{name_path}.{version}");
            let Value::Array(deps) = deps else {
                return Err(SchemaError::new(deps_path, "expected an array"));
            };
            for (i, dep) in deps.iter().enumerate() {
                let well_formed = matches!(
                    dep,
                    Value::Array(pair) if pair.len() == 2 && pair.iter().all(Value::is_string)
                );
                if !well_formed {
                    return Err(SchemaError::new(
                        format!("{deps_path}[{i}]"),
                        "expected a [name, version] pair of strings",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(path, "expected an object"))
}
