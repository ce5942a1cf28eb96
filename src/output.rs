//! Artifact writers
//!
//! Every artifact is written independently: a later failure never undoes an
//! earlier write.

use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Create the output directory if it is absent
///
/// # Errors
/// Returns error if the directory cannot be created
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        Error::StorageError(format!("Failed to create output directory {}: {e}", dir.display()))
    })
}

/// Write a record batch as CSV with a header row; nulls become empty cells
///
/// # Errors
/// Returns error if the file cannot be created or written
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<PathBuf> {
    use arrow::csv::WriterBuilder;

    let file = File::create(path)
        .map_err(|e| Error::StorageError(format!("Failed to create {}: {e}", path.display())))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;

    tracing::info!(path = %path.display(), rows = batch.num_rows(), "wrote csv artifact");
    Ok(path.to_path_buf())
}

/// Write a text artifact
///
/// # Errors
/// Returns error if the file cannot be written
pub fn write_text(text: &str, path: &Path) -> Result<PathBuf> {
    fs::write(path, text)
        .map_err(|e| Error::StorageError(format!("Failed to write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), bytes = text.len(), "wrote text artifact");
    Ok(path.to_path_buf())
}
