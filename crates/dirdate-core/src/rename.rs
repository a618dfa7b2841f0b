use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::naming::sanitize_name;

/// Outcome of one rename attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    Renamed { final_name: String, final_path: PathBuf },
    /// Dry run: the name the folder would get
    Planned { final_name: String, final_path: PathBuf },
    Unchanged { name: String },
    Failed { reason: String },
}

/// Performs folder renames, one at a time.
///
/// The free-name probe and the rename happen under a single lock shared by
/// all workers, so two folders racing for the same target name in the same
/// parent cannot both claim it.
#[derive(Debug, Default)]
pub struct RenameExecutor {
    lock: Mutex<()>,
}

impl RenameExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(&self, original: &Path, proposed_name: &str, live: bool) -> RenameOutcome {
        let safe_name = sanitize_name(proposed_name);
        let current_name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if safe_name == current_name {
            return RenameOutcome::Unchanged { name: safe_name };
        }
        if safe_name.is_empty() {
            return RenameOutcome::Failed {
                reason: format!("proposed name {:?} is empty after sanitising", proposed_name),
            };
        }

        let parent = original.parent().unwrap_or_else(|| Path::new(""));
        let base = parent.join(&safe_name);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let final_path = unique_path(&base);
        let final_name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| safe_name.clone());

        if !live {
            return RenameOutcome::Planned { final_name, final_path };
        }

        if fs::symlink_metadata(original).is_err() {
            return RenameOutcome::Failed {
                reason: "source missing".to_string(),
            };
        }
        match fs::rename(original, &final_path) {
            Ok(()) => RenameOutcome::Renamed { final_name, final_path },
            Err(err) => RenameOutcome::Failed { reason: err.to_string() },
        }
    }
}

/// `base` if free, otherwise `base (1)`, `base (2)`, ...
/// Only probes for existence; never creates anything.
pub fn unique_path(base: &Path) -> PathBuf {
    if fs::symlink_metadata(base).is_err() {
        return base.to_path_buf();
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = base.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1u32;
    loop {
        let candidate = parent.join(format!("{} ({})", name, counter));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        counter += 1;
    }
}
