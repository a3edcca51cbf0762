//! Discovery and loading of exported task files

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Attachment metadata lists and the directory downloads are stored in
const ATTACHMENTS_FILE: &str = "attachments.json";
const ATTACHMENTS_DIR: &str = "attachments";

/// Every `*.json` file under `dir`, sorted by path.
///
/// Only direct children are considered unless `recursive` is set.
/// Attachment metadata (`attachments.json`) and downloaded attachments are
/// never task lists and are left out.
pub fn collect_task_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "import directory {} does not exist",
            dir.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| !is_attachments_dir(entry));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            match e.into_io_error() {
                Some(io) => Error::io_at(path, io),
                None => Error::Config(format!("filesystem loop at {}", path.display())),
            }
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == "json")
            && entry.file_name() != ATTACHMENTS_FILE
        {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    debug!("Found {} JSON files under {}", files.len(), dir.display());
    Ok(files)
}

fn is_attachments_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ATTACHMENTS_DIR
}

/// Tasks stored in an exported task-list file.
///
/// Returns `None` for JSON files whose top level is not an array, such as
/// single-task exports or the export summary.
pub async fn load_task_list(path: &Path) -> Result<Option<Vec<Value>>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_at(path, e))?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(tasks) => Ok(Some(tasks)),
        _ => {
            warn!("Skipping {}: not a list of tasks", path.display());
            Ok(None)
        }
    }
}
