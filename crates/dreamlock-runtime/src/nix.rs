//! Backend that drives the packaging framework through the `nix` CLI.
//!
//! Every framework function is invoked with its arguments passed as a JSON
//! file, never spliced into the expression, so arbitrary source references
//! cannot break out of the generated nix code.

use crate::backend::{
    Backend, FetchRequest, FetchedSource, HashOracle, SourceFetcher, TemplatePaths,
    TemplateRenderer, TranslatorRegistry, TranslatorRunner,
};
use crate::config::Config;
use crate::process::{run_checked, run_with_timeout};
use crate::translator::{TranslatorDescriptor, TranslatorInput};
use crate::RuntimeError;
use dreamlock_schema::{DreamLock, SourceSpec};
use regex::Regex;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

/// The fixed-output derivation prints its real output hash after this marker
/// when the declared (empty) hash does not match.
const HASH_MARKER_PATTERN: &str = r"FOD_PATH=(.*=)";

pub struct NixBackend {
    nix_bin: String,
    framework_src: PathBuf,
    translator_timeout: Duration,
    oracle_timeout: Duration,
    eval_timeout: Duration,
}

impl NixBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            nix_bin: "nix".to_owned(),
            framework_src: config.framework_src.clone(),
            translator_timeout: config.translator_timeout(),
            oracle_timeout: config.oracle_timeout(),
            eval_timeout: config.translator_timeout(),
        }
    }

    fn framework_expr(&self) -> String {
        format!(
            "(import {} {{}})",
            nix_string(&self.framework_src.to_string_lossy())
        )
    }

    fn function_expr(&self, function: &str, args_file: &Path) -> String {
        format!(
            "{}.{function} (builtins.fromJSON (builtins.readFile {}))",
            self.framework_expr(),
            nix_string(&args_file.to_string_lossy())
        )
    }

    /// Evaluate a framework function and return its JSON result.
    fn call_function(&self, function: &str, args: &Value) -> Result<Value, RuntimeError> {
        let args_file = write_json_temp(args)?;
        let mut cmd = Command::new(&self.nix_bin);
        cmd.args(["eval", "--json", "--impure", "--expr"])
            .arg(self.function_expr(function, args_file.path()));
        let output = run_checked(cmd, self.eval_timeout)?;
        serde_json::from_str(&output.stdout).map_err(|e| RuntimeError::InvalidResponse {
            context: function.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Build a framework function's result and return its store path.
    fn build_function(&self, function: &str, args: &Value) -> Result<PathBuf, RuntimeError> {
        let args_file = write_json_temp(args)?;
        self.build_expr(&self.function_expr(function, args_file.path()), function)
    }

    fn build_attribute(&self, attribute: &str) -> Result<PathBuf, RuntimeError> {
        self.build_expr(&format!("{}.{attribute}", self.framework_expr()), attribute)
    }

    fn build_expr(&self, expr: &str, context: &str) -> Result<PathBuf, RuntimeError> {
        let mut cmd = Command::new(&self.nix_bin);
        cmd.args(["build", "--impure", "--no-link", "--print-out-paths", "--expr"])
            .arg(expr);
        let output = run_checked(cmd, self.translator_timeout)?;
        output
            .stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| PathBuf::from(l.trim()))
            .ok_or_else(|| RuntimeError::InvalidResponse {
                context: context.to_owned(),
                reason: "nix build printed no output path".to_owned(),
            })
    }
}

impl SourceFetcher for NixBackend {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, RuntimeError> {
        match request {
            FetchRequest::Shortcut(shortcut) => {
                info!("fetching source for '{shortcut}'");
                let spec_value =
                    self.call_function("fetchers.translateShortcut", &json!({ "shortcut": shortcut }))?;
                let spec: SourceSpec = serde_json::from_value(spec_value)?;
                let path = self.build_function(
                    "fetchers.fetchShortcut",
                    &json!({ "shortcut": shortcut, "extract": true }),
                )?;
                Ok(FetchedSource { path, spec })
            }
            FetchRequest::Spec(spec) => {
                info!("fetching source of type '{}'", spec.fetch_type);
                let path = self.build_function(
                    "fetchers.fetchSource",
                    &json!({ "source": spec, "extract": true }),
                )?;
                Ok(FetchedSource {
                    path,
                    spec: spec.clone(),
                })
            }
        }
    }
}

impl TranslatorRegistry for NixBackend {
    fn list_translators(&self, source: &Path) -> Result<Vec<TranslatorDescriptor>, RuntimeError> {
        let value = self.call_function(
            "translators.translatorsForInput",
            &json!({ "inputDirectories": [source], "inputFiles": [] }),
        )?;
        Ok(serde_json::from_value(value)?)
    }
}

impl TranslatorRunner for NixBackend {
    fn run_translator(
        &self,
        translator: &TranslatorDescriptor,
        input: &TranslatorInput,
    ) -> Result<(), RuntimeError> {
        let bin = self.build_attribute(&format!(
            "translators.translators.{}.{}.{}.translateBin",
            translator.subsystem, translator.kind, translator.name
        ))?;
        let input_file = write_json_temp(&serde_json::to_value(input)?)?;

        info!("running translator {}", translator.identity());
        let mut cmd = Command::new(bin.join("bin/run"));
        cmd.arg(input_file.path());
        let output = run_checked(cmd, self.translator_timeout)?;
        debug!("translator stderr: {}", output.stderr.trim());

        if !input.output_file.is_file() {
            return Err(RuntimeError::TranslatorOutputMissing(input.output_file.clone()));
        }
        Ok(())
    }
}

impl HashOracle for NixBackend {
    fn combined_hash(&self, lock_path: &Path, _stripped: &DreamLock) -> Result<String, RuntimeError> {
        let expr = format!(
            "{}.fetchSources {{ dreamLock = {}; }}",
            self.framework_expr(),
            nix_string(&lock_path.to_string_lossy())
        );
        let mut cmd = Command::new(&self.nix_bin);
        cmd.args(["build", "--impure", "-L", "--expr"]).arg(expr);

        // The build is expected to fail: the lock declares an empty hash.
        let output = run_with_timeout(cmd, self.oracle_timeout)?;
        extract_hash_marker(&output.stderr).ok_or(RuntimeError::HashMarkerMissing {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl TemplateRenderer for NixBackend {
    fn render_build_template(
        &self,
        lock: &DreamLock,
        paths: &TemplatePaths,
    ) -> Result<String, RuntimeError> {
        let value = self.call_function(
            "apps.apps.cli.templateDefaultNix",
            &json!({
                "dream2nixLocationRelative": paths.framework_relative,
                "dreamLock": lock,
                "sourcePathRelative": paths.source_relative,
            }),
        )?;
        match value {
            Value::String(text) => Ok(text),
            other => Err(RuntimeError::InvalidResponse {
                context: "templateDefaultNix".to_owned(),
                reason: format!("expected a string, got {other}"),
            }),
        }
    }
}

impl Backend for NixBackend {
    fn name(&self) -> &str {
        "nix"
    }

    fn available(&self) -> bool {
        Command::new(&self.nix_bin)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Find the combined hash in oracle diagnostics.
pub fn extract_hash_marker(diagnostics: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(HASH_MARKER_PATTERN).expect("valid marker regex"));
    re.captures(diagnostics)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Quote `s` as a nix double-quoted string literal.
fn nix_string(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "\\${");
    format!("\"{escaped}\"")
}

fn write_json_temp(value: &Value) -> Result<tempfile::NamedTempFile, RuntimeError> {
    let mut file = tempfile::Builder::new()
        .prefix("dreamlock-")
        .suffix(".json")
        .tempfile()?;
    file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
    file.flush()?;
    Ok(file)
}
