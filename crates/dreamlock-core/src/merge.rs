use dreamlock_runtime::ExtraArgValue;
use dreamlock_schema::{DreamLock, SourceSpec};
use std::collections::BTreeMap;
use tracing::debug;

/// Record the main package's source, overwriting whatever the translator
/// produced. With no known spec the `unknown` placeholder is recorded.
pub fn merge_main_source(lock: &mut DreamLock, spec: Option<SourceSpec>) {
    let key = lock.main_key();
    let spec = spec.unwrap_or_else(SourceSpec::unknown);
    debug!("main source for {key}: type '{}'", spec.fetch_type);
    lock.set_source(&key, spec);
}

/// Render the command-line fragment that reproduces a translation.
///
/// Arguments are sorted by key and flags print as `true`/`false`, so the
/// same inputs always produce the same string.
pub fn translator_params(
    translator: &str,
    combined: bool,
    extra_args: &BTreeMap<String, ExtraArgValue>,
) -> String {
    let mut parts = vec!["--translator".to_owned(), translator.to_owned()];
    if combined {
        parts.push("--combined".to_owned());
    }
    for (key, value) in extra_args {
        parts.push("--arg".to_owned());
        parts.push(format!("{key}={value}"));
    }
    parts.join(" ")
}

/// Stamp `translatedBy` and `translatorParams` into `_generic`.
pub fn stamp_provenance(
    lock: &mut DreamLock,
    translator: &str,
    combined: bool,
    extra_args: &BTreeMap<String, ExtraArgValue>,
) {
    lock.generic.translated_by = Some(translator.to_owned());
    lock.generic.translator_params = Some(translator_params(translator, combined, extra_args));
}
