use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use regex::Regex;

use crate::schedule::FrameRequest;

const ATTEMPT_PATTERN: &str = r"^attempt_(\d+)$";

/// Highest `attempt_<N>` directory under `output_root`, 0 when there is none.
pub fn latest_attempt(output_root: &Path) -> Result<u32> {
    if !output_root.exists() {
        return Ok(0);
    }
    let pattern = Regex::new(ATTEMPT_PATTERN)?;
    let mut latest = 0;
    for entry in fs::read_dir(output_root)
        .with_context(|| format!("reading output root {}", output_root.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(captures) = name.to_str().and_then(|n| pattern.captures(n)) else {
            continue;
        };
        if let Ok(n) = captures[1].parse::<u32>() {
            latest = latest.max(n);
        }
    }
    Ok(latest)
}

pub fn next_attempt_number(output_root: &Path) -> Result<u32> {
    Ok(latest_attempt(output_root)? + 1)
}

/// Folder tree of one generation run: `<output_root>/attempt_<N>/<iteration>_<background>/{images,labels}`.
#[derive(Clone, Debug)]
pub struct AttemptLayout {
    attempt: u32,
    seed: u64,
    folder: PathBuf,
}

impl AttemptLayout {
    /// Picks the next free attempt number. The folder is only created when `create` is set.
    pub fn next(output_root: &Path, seed: u64, create: bool) -> Result<Self> {
        let attempt = next_attempt_number(output_root)?;
        let folder = output_root.join(format!("attempt_{attempt}"));
        if create {
            fs::create_dir_all(&folder)
                .with_context(|| format!("creating attempt folder {}", folder.display()))?;
        }
        log::info!("attempt {attempt} -> {}", folder.display());
        Ok(Self {
            attempt,
            seed,
            folder,
        })
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn subfolder(&self, iteration: usize, background: &str) -> PathBuf {
        self.folder.join(subfolder_name(iteration, background))
    }

    pub fn frame_id(&self, request: &FrameRequest) -> String {
        frame_id(self.attempt, self.seed, request)
    }

    pub fn image_path(&self, request: &FrameRequest, background: &str) -> PathBuf {
        self.subfolder(request.iteration, background)
            .join("images")
            .join(format!("{}.jpg", self.frame_id(request)))
    }

    pub fn label_path(&self, request: &FrameRequest, background: &str) -> PathBuf {
        self.subfolder(request.iteration, background)
            .join("labels")
            .join(format!("{}.txt", self.frame_id(request)))
    }
}

/// `<iteration + 1>_<background>`.
pub fn subfolder_name(iteration: usize, background: &str) -> String {
    format!("{}_{background}", iteration + 1)
}

/// `<attempt>(<seed>)_<iteration + 1>_<arrangement + 1>_<picture + 1>`.
pub fn frame_id(attempt: u32, seed: u64, request: &FrameRequest) -> String {
    format!(
        "{attempt}({seed})_{}_{}_{}",
        request.iteration + 1,
        request.arrangement + 1,
        request.picture + 1
    )
}

/// File stem of a background path, up to the first dot.
pub fn background_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}
