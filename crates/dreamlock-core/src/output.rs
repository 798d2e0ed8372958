use crate::CoreError;
use dreamlock_schema::LOCK_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const BUILD_TEMPLATE_FILE_NAME: &str = "default.nix";

/// Where one packaging run writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub dir: PathBuf,
    pub lock_path: PathBuf,
    pub template_path: Option<PathBuf>,
}

impl OutputPlan {
    pub fn targets(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.lock_path.as_path()).chain(self.template_path.as_deref())
    }
}

/// Prepare `dir` for a run: create it, and refuse to touch existing
/// artifacts unless `force` is set.
///
/// Forced targets stay in place; the atomic writes at the end of a
/// successful run replace them, so a failed run keeps the previous files.
pub fn plan_output(dir: &Path, with_template: bool, force: bool) -> Result<OutputPlan, CoreError> {
    fs::create_dir_all(dir)?;
    let dir = fs::canonicalize(dir)?;
    let plan = OutputPlan {
        lock_path: dir.join(LOCK_FILE_NAME),
        template_path: with_template.then(|| dir.join(BUILD_TEMPLATE_FILE_NAME)),
        dir,
    };

    let existing: Vec<&Path> = plan.targets().filter(|p| p.exists()).collect();
    if existing.is_empty() {
        debug!("output directory {} is clear", plan.dir.display());
        return Ok(plan);
    }
    if !force {
        return Err(CoreError::OutputConflict {
            dir: plan.dir.clone(),
            files: existing
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        });
    }
    for path in existing {
        warn!("{} will be replaced", path.display());
    }
    Ok(plan)
}
