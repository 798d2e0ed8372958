use crate::args::{parse_arg_assignments, resolve_extra_args};
use crate::output::{plan_output, OutputPlan};
use crate::prompt::ArgumentPrompter;
use crate::reconcile::{ReconcileInput, Reconciler};
use crate::selection::{select_translator, sort_candidates};
use crate::source::{resolve_source, ResolvedSource};
use crate::CoreError;
use dreamlock_runtime::{
    Backend, Config, ExtraArgValue, TemplatePaths, TranslatorDescriptor, TranslatorInput,
};
use dreamlock_schema::{write_atomic, DependencyEdge, DreamLock, RawLock, LOCK_FILE_NAME};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// One `package` invocation as requested by the user.
#[derive(Debug, Clone, Default)]
pub struct PackageRequest {
    /// Shortcut, path, or existing lock; `None` packages the working directory.
    pub source: Option<String>,
    /// Full `subsystem.kind.name` or bare translator name.
    pub translator: Option<String>,
    pub output: PathBuf,
    pub combined: bool,
    /// Raw `key=value` assignments.
    pub extra_args: Vec<String>,
    pub force: bool,
    pub build_template: bool,
}

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub main_package: String,
    pub translator: String,
    pub lock_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    pub removed_edges: Vec<DependencyEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_hash: Option<String>,
}

/// Drives a whole packaging run against one backend.
pub struct Packager<'a, B: Backend + ?Sized> {
    backend: &'a B,
    cwd: PathBuf,
    framework_src: PathBuf,
    fetcher_names: Vec<String>,
    prompter: Option<&'a dyn ArgumentPrompter>,
}

impl<'a, B: Backend + ?Sized> Packager<'a, B> {
    /// Relative paths in requests are taken from `cwd`.
    pub fn new(backend: &'a B, config: &Config, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        Self {
            backend,
            framework_src: cwd.join(&config.framework_src),
            fetcher_names: config.fetcher_names.clone(),
            cwd,
            prompter: None,
        }
    }

    /// Ask `prompter` for anything the request leaves open.
    #[must_use]
    pub fn with_prompter(mut self, prompter: &'a dyn ArgumentPrompter) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Translators able to handle `source`, in selection order.
    pub fn candidates(&self, source: Option<&str>) -> Result<Vec<TranslatorDescriptor>, CoreError> {
        let source = resolve_source(source, &self.cwd, &self.fetcher_names, self.backend)?;
        Ok(sort_candidates(self.backend.list_translators(&source.path)?))
    }

    pub fn package(&self, request: &PackageRequest) -> Result<PackageReport, CoreError> {
        let plan = plan_output(
            &self.cwd.join(&request.output),
            request.build_template,
            request.force,
        )?;
        info!("packaging into {}", plan.dir.display());

        let source = resolve_source(
            request.source.as_deref(),
            &self.cwd,
            &self.fetcher_names,
            self.backend,
        )?;

        let candidates = sort_candidates(self.backend.list_translators(&source.path)?);
        let translator =
            select_translator(&candidates, request.translator.as_deref(), self.prompter)?;
        if !translator.compatible {
            warn!(
                "translator {} does not report itself compatible with {}",
                translator.identity(),
                source.path.display()
            );
        }

        let specified = parse_arg_assignments(&request.extra_args)?;
        let extra_args = resolve_extra_args(&translator, &specified, self.prompter)?;

        let raw = self.translate(&translator, &source, &plan, &extra_args)?;
        let reconciliation = Reconciler::new(self.backend, &plan.dir).reconcile(ReconcileInput {
            raw,
            main_source: source.spec.clone(),
            translator: translator.identity(),
            extra_args,
            combined: request.combined,
        })?;

        let template = match &plan.template_path {
            Some(path) => Some((
                path,
                self.render_template(&reconciliation.lock, &plan.dir, &source.path)?,
            )),
            None => None,
        };

        reconciliation.write_to(&plan.lock_path)?;
        if let Some((path, text)) = template {
            write_atomic(path, text.as_bytes())?;
            info!("wrote {}", path.display());
        }

        Ok(PackageReport {
            main_package: reconciliation.lock.main_key().to_string(),
            translator: translator.identity(),
            lock_path: plan.lock_path,
            template_path: plan.template_path,
            removed_edges: reconciliation.removed,
            combined_hash: reconciliation.combined_hash,
        })
    }

    /// Run the translator into a scratch directory inside the output
    /// directory and read back what it wrote.
    fn translate(
        &self,
        translator: &TranslatorDescriptor,
        source: &ResolvedSource,
        plan: &OutputPlan,
        extra_args: &BTreeMap<String, ExtraArgValue>,
    ) -> Result<RawLock, CoreError> {
        let scratch = tempfile::Builder::new()
            .prefix(".dreamlock-translate-")
            .tempdir_in(&plan.dir)?;
        let input = TranslatorInput {
            input_files: Vec::new(),
            input_directories: vec![source.path.clone()],
            output_file: scratch.path().join(LOCK_FILE_NAME),
            extra_args: extra_args.clone(),
        };

        info!("translating with {}", translator.identity());
        self.backend
            .run_translator(translator, &input)
            .map_err(|e| CoreError::TranslatorExecutionFailed(e.to_string()))?;
        if !input.output_file.is_file() {
            return Err(CoreError::TranslatorExecutionFailed(format!(
                "{} produced no output",
                translator.identity()
            )));
        }
        let raw = RawLock::from_file(&input.output_file)?;
        debug!("translator output read for {}", raw.main_key());
        Ok(raw)
    }

    fn render_template(
        &self,
        lock: &DreamLock,
        dir: &Path,
        source: &Path,
    ) -> Result<String, CoreError> {
        let framework = std::fs::canonicalize(&self.framework_src)
            .unwrap_or_else(|_| self.framework_src.clone());
        let paths = TemplatePaths {
            framework_relative: relative_path(dir, &framework),
            source_relative: relative_path(dir, source),
        };
        Ok(self.backend.render_build_template(lock, &paths)?)
    }
}

/// Path from directory `from` to `to`; both must be absolute.
fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for part in &to[common..] {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_path(Path::new("/a/b/out"), Path::new("/a/b/src")),
            PathBuf::from("../src")
        );
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/a/b")),
            PathBuf::from(".")
        );
        assert_eq!(
            relative_path(Path::new("/a"), Path::new("/a/b/c")),
            PathBuf::from("b/c")
        );
        assert_eq!(
            relative_path(Path::new("/x/y"), Path::new("/z")),
            PathBuf::from("../../z")
        );
    }
}
