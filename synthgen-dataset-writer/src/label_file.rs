use std::{
    fs,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use anyhow::{Context, Result};
use visbox::{parse_label_line, YoloRecord};

/// Writes one newline-terminated line per entry, creating the parent folder.
pub fn write_label_file(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

/// Blank lines are skipped.
pub fn read_label_file(path: &Path) -> Result<Vec<YoloRecord>> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut records = vec![];
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_label_line(&line)
            .with_context(|| format!("{}:{}", path.display(), number + 1))?;
        records.push(record);
    }
    Ok(records)
}
