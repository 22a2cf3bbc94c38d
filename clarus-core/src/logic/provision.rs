//! Model Artifact Provisioner
//!
//! A freshly created model volume is empty and hides the artifacts baked into
//! the image. Before the bundle loads, copy any missing artifact in from the
//! seed directory, then insist that every required file exists.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(
        "Model files are missing in {}.\n\
         model_dir='{}' (writable={writable})\n\
         source_dir='{}'\n\
         Missing:\n  - {}\n\n\
         How to fix:\n\
         1) Ensure the seed directory contains the model artifacts \
         (xgb_bin.json, xgb_multi.json, class_mapping.json, features_*.json)\n\
         2) Rebuild and restart the worker container\n\
         3) If the model directory is mounted read-only, make sure the files already exist there.",
        .model_dir.display(),
        .model_dir.display(),
        .source_dir.display(),
        display_paths(.missing)
    )]
    Missing {
        model_dir: PathBuf,
        writable: bool,
        source_dir: PathBuf,
        missing: Vec<PathBuf>,
    },

    #[error("Failed to create model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Every required file was already in place
    AlreadyPresent,
    /// This many files were copied from the seed directory
    Seeded(usize),
}

/// Make sure every path in `required` exists, seeding from `source_dir`.
///
/// Copy failures are logged and surface as missing files in the final check.
pub fn ensure_models_present(
    model_dir: &Path,
    required: &[PathBuf],
    source_dir: &Path,
) -> Result<ProvisionOutcome, ProvisionError> {
    fs::create_dir_all(model_dir).map_err(|source| ProvisionError::CreateDir {
        path: model_dir.to_path_buf(),
        source,
    })?;

    let missing: Vec<&PathBuf> = required.iter().filter(|p| !p.exists()).collect();
    if missing.is_empty() {
        return Ok(ProvisionOutcome::AlreadyPresent);
    }

    let writable = is_dir_writable(model_dir);
    if !writable {
        log::warn!("Model directory {} is not writable", model_dir.display());
    }

    let mut copied = 0;
    for dst in missing {
        let Some(file_name) = dst.file_name() else {
            continue;
        };
        let src = source_dir.join(file_name);

        if src.exists() && writable {
            match fs::copy(&src, dst) {
                Ok(_) => copied += 1,
                Err(e) => log::warn!(
                    "Failed to seed {} from {}: {}",
                    dst.display(),
                    src.display(),
                    e
                ),
            }
        }
    }

    let still_missing: Vec<PathBuf> = required.iter().filter(|p| !p.exists()).cloned().collect();
    if !still_missing.is_empty() {
        return Err(ProvisionError::Missing {
            model_dir: model_dir.to_path_buf(),
            writable,
            source_dir: source_dir.to_path_buf(),
            missing: still_missing,
        });
    }

    log::info!(
        "Seeded {} model file(s) into '{}' from '{}'",
        copied,
        model_dir.display(),
        source_dir.display()
    );

    Ok(ProvisionOutcome::Seeded(copied))
}

/// Best-effort writability check: create and remove a marker file
fn is_dir_writable(dir: &Path) -> bool {
    let marker = dir.join(".write_test");
    let ok = fs::write(&marker, b"ok").is_ok();
    if ok {
        let _ = fs::remove_file(&marker);
    }
    ok
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n  - ")
}
