use crate::CoreError;
use dreamlock_runtime::{FetchRequest, SourceFetcher};
use dreamlock_schema::{DreamLock, SourceSpec, LOCK_FILE_NAME};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a user-supplied source string refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceReference {
    /// Fetcher shortcut or URL, e.g. `github:owner/repo/v1.0`.
    Shortcut(String),
    Path(PathBuf),
    /// An existing lock whose main package source should be re-packaged.
    ExistingLock(PathBuf),
}

/// Classify `reference` without touching the filesystem.
pub fn classify_source(reference: &str, fetcher_names: &[String]) -> SourceReference {
    let scheme = reference.split(':').next().unwrap_or_default();
    let fetcher = scheme.split('+').next().unwrap_or_default();
    if reference.starts_with("http") || fetcher_names.iter().any(|n| n == fetcher) {
        return SourceReference::Shortcut(reference.to_owned());
    }
    let path = PathBuf::from(reference);
    if path.file_name().is_some_and(|n| n == LOCK_FILE_NAME) {
        SourceReference::ExistingLock(path)
    } else {
        SourceReference::Path(path)
    }
}

/// A local source tree ready for translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    /// How to fetch the tree again; `None` for plain local paths.
    pub spec: Option<SourceSpec>,
}

/// Turn a source reference into a local tree, fetching when needed.
///
/// Relative paths are taken from `cwd`; no reference means `cwd` itself.
pub fn resolve_source<F: SourceFetcher + ?Sized>(
    reference: Option<&str>,
    cwd: &Path,
    fetcher_names: &[String],
    fetcher: &F,
) -> Result<ResolvedSource, CoreError> {
    let Some(reference) = reference else {
        return local_path(cwd, cwd);
    };
    match classify_source(reference, fetcher_names) {
        SourceReference::Shortcut(shortcut) => {
            info!("resolving shortcut {shortcut}");
            let fetched = fetcher.fetch(&FetchRequest::Shortcut(shortcut))?;
            Ok(ResolvedSource {
                path: fetched.path,
                spec: Some(fetched.spec),
            })
        }
        SourceReference::Path(path) => local_path(&path, cwd),
        SourceReference::ExistingLock(path) => {
            let path = cwd.join(path);
            if !path.is_file() {
                return Err(CoreError::SourceNotFound(path.display().to_string()));
            }
            let lock = DreamLock::read_from_file(&path)?;
            let main = lock.main_key();
            let spec = lock.source(&main).cloned().ok_or_else(|| {
                CoreError::SourceNotFound(format!(
                    "{} has no source for its main package {main}",
                    path.display()
                ))
            })?;
            info!("re-packaging {main} from {}", path.display());
            let fetched = fetcher.fetch(&FetchRequest::Spec(spec))?;
            Ok(ResolvedSource {
                path: fetched.path,
                spec: Some(fetched.spec),
            })
        }
    }
}

fn local_path(path: &Path, cwd: &Path) -> Result<ResolvedSource, CoreError> {
    let path = cwd.join(path);
    if !path.exists() {
        return Err(CoreError::SourceNotFound(path.display().to_string()));
    }
    let path = std::fs::canonicalize(path)?;
    debug!("using local source {}", path.display());
    Ok(ResolvedSource { path, spec: None })
}
