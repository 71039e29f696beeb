use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use regex::Regex;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombineSummary {
    pub images: usize,
    pub labels: usize,
}

/// `<parent>/combined_<name>` next to the output root.
pub fn default_combined_root(output_root: &Path) -> PathBuf {
    let name = output_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_root
        .parent()
        .unwrap_or(Path::new("."))
        .join(format!("combined_{name}"))
}

/// Copies `attempt_*/<subfolder>/{images,labels}/*` into flat `images/` and `labels/` folders
/// under `combined_root`. Files with the same name overwrite each other.
pub fn combine_attempts(output_root: &Path, combined_root: &Path) -> Result<CombineSummary> {
    let images_out = combined_root.join("images");
    let labels_out = combined_root.join("labels");
    fs::create_dir_all(&images_out)?;
    fs::create_dir_all(&labels_out)?;

    let attempt = Regex::new(r"^attempt_")?;
    let mut summary = CombineSummary::default();
    for attempt_dir in sorted_dirs(output_root)? {
        let is_attempt = attempt_dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| attempt.is_match(n));
        if !is_attempt {
            continue;
        }
        for subfolder in sorted_dirs(&attempt_dir)? {
            summary.images += copy_files(&subfolder.join("images"), &images_out)?;
            summary.labels += copy_files(&subfolder.join("labels"), &labels_out)?;
        }
    }
    log::info!(
        "combined {} images and {} labels into {}",
        summary.images,
        summary.labels,
        combined_root.display()
    );
    Ok(summary)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = vec![];
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn copy_files(from: &Path, to: &Path) -> Result<usize> {
    if !from.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let target = to.join(entry.file_name());
        fs::copy(entry.path(), &target)
            .with_context(|| format!("copying {} to {}", entry.path().display(), target.display()))?;
        copied += 1;
    }
    Ok(copied)
}
