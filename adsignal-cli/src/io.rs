//! JSONL input/output for the pipeline binaries.
//!
//! Records arrive and leave as one JSON object per line. A malformed input
//! line is logged and skipped; it never aborts the run.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use adsignal_core::AdRecord;

/// Read ad records from a JSONL file. Malformed lines are skipped with a
/// warning; the returned count pair is (kept, skipped).
pub fn read_records(path: &Path) -> Result<(Vec<AdRecord>, usize)> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read error in {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AdRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!(
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed input line"
                );
            }
        }
    }
    tracing::info!(
        path = %path.display(),
        records = records.len(),
        skipped,
        "Loaded input records"
    );
    Ok((records, skipped))
}

/// Read any JSONL file of typed rows, strictly. Used for re-reading our own
/// output (enrichment rows going into review).
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read error in {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row: T = serde_json::from_str(&line)
            .with_context(|| format!("{} line {}", path.display(), line_no + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write rows as JSONL, one object per line.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Wrote output");
    Ok(())
}
