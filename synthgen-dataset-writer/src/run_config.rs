use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Serialize;

/// `configs_<attempt>.yaml` inside the attempt folder.
pub struct RunConfigSnapshot {
    path: PathBuf,
}

impl RunConfigSnapshot {
    pub fn write<T: Serialize>(attempt_folder: &Path, attempt: u32, cfg: &T) -> Result<Self> {
        let path = attempt_folder.join(format!("configs_{attempt}.yaml"));
        let yaml = serde_yaml::to_string(cfg)?;
        fs::write(&path, yaml).with_context(|| format!("writing {}", path.display()))?;
        log::info!("run configuration saved to {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `# Total execution time: <secs> seconds` as a YAML comment.
    pub fn append_elapsed(&self, elapsed: Duration) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        writeln!(
            file,
            "\n# Total execution time: {:.2} seconds",
            elapsed.as_secs_f64()
        )?;
        Ok(())
    }
}
