use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One row per rendered frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub frame_id: String,
    pub image_path: String,
    pub label_path: String,
    pub label_count: usize,
    pub camera_x: f64,
    pub camera_y: f64,
    pub camera_z: f64,
    pub background: String,
    pub exposure: f64,
    pub light_x: f64,
    pub light_y: f64,
    pub light_z: f64,
    pub light_energy: u32,
}

pub struct FrameManifest {
    writer: csv::Writer<fs::File>,
    rows: usize,
}

impl FrameManifest {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating manifest {}", path.display()))?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn append(&mut self, row: &ManifestRow) -> Result<()> {
        self.writer.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening manifest {}", path.display()))?;
    let mut rows = vec![];
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
