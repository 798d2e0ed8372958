use crate::backend::{
    Backend, FetchRequest, FetchedSource, HashOracle, SourceFetcher, TemplatePaths,
    TemplateRenderer, TranslatorRegistry, TranslatorRunner,
};
use crate::translator::{
    ExtraArgKind, ExtraArgSpec, TranslatorDescriptor, TranslatorInput, TranslatorKind,
};
use crate::RuntimeError;
use dreamlock_schema::{DreamLock, SourceSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File a mock source tree must contain; it is copied verbatim as the
/// translator output.
pub const MOCK_RAW_LOCK: &str = "raw-lock.json";

/// Deterministic, filesystem-only backend.
///
/// Lists a single translator, `mock.pure.raw`, whose run copies
/// `<source>/raw-lock.json` to the requested output. The combined hash is a
/// blake3 digest of the stripped lock's canonical text, so it changes exactly
/// when the locked sources change.
#[derive(Debug, Default)]
pub struct MockBackend {
    shortcut_root: Option<PathBuf>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve shortcuts `mock:<name>` to `<root>/<name>`.
    #[must_use]
    pub fn with_shortcut_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.shortcut_root = Some(root.into());
        self
    }

    pub fn translator() -> TranslatorDescriptor {
        TranslatorDescriptor {
            subsystem: "mock".to_owned(),
            kind: TranslatorKind::Pure,
            name: "raw".to_owned(),
            compatible: true,
            extra_args: BTreeMap::from([(
                "dev".to_owned(),
                ExtraArgSpec {
                    kind: ExtraArgKind::Flag,
                    description: "include development dependencies".to_owned(),
                    examples: Vec::new(),
                    default: Some(serde_json::Value::Bool(false)),
                },
            )]),
        }
    }
}

impl SourceFetcher for MockBackend {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedSource, RuntimeError> {
        let root = self.shortcut_root.as_ref();
        match request {
            FetchRequest::Shortcut(shortcut) => {
                let (Some(root), Some(name)) = (root, shortcut.strip_prefix("mock:")) else {
                    return Err(unsupported(format!("unsupported shortcut '{shortcut}'")));
                };
                let spec = SourceSpec::new("mock")
                    .with_hash(blake3::hash(name.as_bytes()).to_hex().to_string())
                    .with_field("name", name);
                Ok(FetchedSource {
                    path: root.join(name),
                    spec,
                })
            }
            FetchRequest::Spec(spec) => {
                let name = spec.fields.get("name").and_then(serde_json::Value::as_str);
                let (Some(root), Some(name)) = (root, name) else {
                    return Err(unsupported(format!(
                        "cannot fetch source of type '{}'",
                        spec.fetch_type
                    )));
                };
                Ok(FetchedSource {
                    path: root.join(name),
                    spec: spec.clone(),
                })
            }
        }
    }
}

fn unsupported(reason: String) -> RuntimeError {
    RuntimeError::InvalidResponse {
        context: "mock fetcher".to_owned(),
        reason,
    }
}

impl TranslatorRegistry for MockBackend {
    fn list_translators(&self, source: &Path) -> Result<Vec<TranslatorDescriptor>, RuntimeError> {
        let mut t = Self::translator();
        t.compatible = source.join(MOCK_RAW_LOCK).is_file();
        Ok(vec![t])
    }
}

impl TranslatorRunner for MockBackend {
    fn run_translator(
        &self,
        _translator: &TranslatorDescriptor,
        input: &TranslatorInput,
    ) -> Result<(), RuntimeError> {
        let Some(raw) = input
            .input_directories
            .iter()
            .map(|d| d.join(MOCK_RAW_LOCK))
            .find(|p| p.is_file())
        else {
            // Like a real translator that crashed: no output written.
            return Ok(());
        };
        std::fs::copy(raw, &input.output_file)?;
        Ok(())
    }
}

impl HashOracle for MockBackend {
    fn combined_hash(&self, lock_path: &Path, stripped: &DreamLock) -> Result<String, RuntimeError> {
        if !lock_path.is_file() {
            return Err(RuntimeError::HashMarkerMissing {
                stdout: String::new(),
                stderr: format!("error: {} does not exist", lock_path.display()),
            });
        }
        let text = stripped.to_canonical_string()?;
        Ok(format!("blake3-{}=", blake3::hash(text.as_bytes()).to_hex()))
    }
}

impl TemplateRenderer for MockBackend {
    fn render_build_template(
        &self,
        lock: &DreamLock,
        paths: &TemplatePaths,
    ) -> Result<String, RuntimeError> {
        Ok(format!(
            "{{ dream2nix ? import {} {{}} }}:\n\
             dream2nix.makeOutputs {{\n  \
               source = {};\n  \
               dreamLock = ./dream-lock.json;\n  \
               # {}#{}\n\
             }}\n",
            paths.framework_relative.display(),
            paths.source_relative.display(),
            lock.generic.main_package_name,
            lock.generic.main_package_version,
        ))
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamlock_schema::GenericMetadata;

    fn write_raw(dir: &Path) {
        std::fs::write(
            dir.join(MOCK_RAW_LOCK),
            r#"{"_generic": {"mainPackageName": "a", "mainPackageVersion": "1"}, "sources": {}}"#,
        )
        .unwrap();
    }

    #[test]
    fn compatible_only_with_raw_lock() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        assert!(!backend.list_translators(dir.path()).unwrap()[0].compatible);
        write_raw(dir.path());
        assert!(backend.list_translators(dir.path()).unwrap()[0].compatible);
    }

    #[test]
    fn run_copies_raw_lock() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_raw(src.path());
        let input = TranslatorInput {
            input_files: Vec::new(),
            input_directories: vec![src.path().to_path_buf()],
            output_file: out.path().join("dream-lock.json"),
            extra_args: BTreeMap::new(),
        };
        MockBackend::new()
            .run_translator(&MockBackend::translator(), &input)
            .unwrap();
        assert!(input.output_file.is_file());
    }

    #[test]
    fn oracle_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dream-lock.json");
        let lock = DreamLock::new(GenericMetadata::new("a", "1"));
        lock.write_to_file(&path).unwrap();

        let backend = MockBackend::new();
        let h1 = backend.combined_hash(&path, &lock).unwrap();
        let h2 = backend.combined_hash(&path, &lock).unwrap();
        assert_eq!(h1, h2);
        assert!(h1.starts_with("blake3-"));
    }

    #[test]
    fn oracle_fails_without_persisted_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DreamLock::new(GenericMetadata::new("a", "1"));
        let err = MockBackend::new()
            .combined_hash(&dir.path().join("missing.json"), &lock)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::HashMarkerMissing { .. }));
    }

    #[test]
    fn shortcut_resolves_under_root() {
        let root = tempfile::tempdir().unwrap();
        let backend = MockBackend::new().with_shortcut_root(root.path());
        let fetched = backend
            .fetch(&FetchRequest::Shortcut("mock:app".to_owned()))
            .unwrap();
        assert_eq!(fetched.path, root.path().join("app"));
        assert_eq!(fetched.spec.fetch_type, "mock");

        let again = backend.fetch(&FetchRequest::Spec(fetched.spec.clone())).unwrap();
        assert_eq!(again.path, fetched.path);
    }
}
