use crate::config::Config;
use crate::translator::{TranslatorDescriptor, TranslatorInput};
use crate::RuntimeError;
use dreamlock_schema::{DreamLock, SourceSpec};
use std::path::{Path, PathBuf};

/// What to fetch: a shortcut string (`github:owner/repo/rev`, a URL, ...)
/// or a structured spec taken from an existing lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Shortcut(String),
    Spec(SourceSpec),
}

/// A fetched source tree and the spec that reproduces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedSource {
    pub path: PathBuf,
    pub spec: SourceSpec,
}

/// Paths the build template needs, relative to the template's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePaths {
    pub framework_relative: PathBuf,
    pub source_relative: PathBuf,
}

pub trait SourceFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, RuntimeError>;
}

pub trait TranslatorRegistry {
    /// Translators that can handle `source`, in no particular order.
    fn list_translators(&self, source: &Path) -> Result<Vec<TranslatorDescriptor>, RuntimeError>;
}

pub trait TranslatorRunner {
    /// Run the translator; it must write `input.output_file`.
    fn run_translator(
        &self,
        translator: &TranslatorDescriptor,
        input: &TranslatorInput,
    ) -> Result<(), RuntimeError>;
}

pub trait HashOracle {
    /// Compute the combined hash of all sources of `stripped`, which has
    /// already been persisted at `lock_path` with every hash emptied.
    fn combined_hash(&self, lock_path: &Path, stripped: &DreamLock) -> Result<String, RuntimeError>;
}

pub trait TemplateRenderer {
    fn render_build_template(
        &self,
        lock: &DreamLock,
        paths: &TemplatePaths,
    ) -> Result<String, RuntimeError>;
}

/// All collaborators of one packaging invocation behind a single object.
pub trait Backend:
    SourceFetcher + TranslatorRegistry + TranslatorRunner + HashOracle + TemplateRenderer + Send + Sync
{
    fn name(&self) -> &str;

    fn available(&self) -> bool;
}

pub fn select_backend(name: &str, config: &Config) -> Result<Box<dyn Backend>, RuntimeError> {
    match name {
        "nix" => Ok(Box::new(crate::nix::NixBackend::new(config))),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_backends() {
        let config = Config::default();
        assert_eq!(select_backend("nix", &config).unwrap().name(), "nix");
        assert_eq!(select_backend("mock", &config).unwrap().name(), "mock");
    }

    #[test]
    fn select_invalid_backend_fails() {
        let config = Config::default();
        assert!(matches!(
            select_backend("nonexistent", &config),
            Err(RuntimeError::BackendUnavailable(_))
        ));
    }
}
