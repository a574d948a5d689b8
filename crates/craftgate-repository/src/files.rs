//! Low-level file helpers: atomic replace, typed reads, XML records.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::RepositoryError;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// Writes `bytes` to `path` so that no reader ever observes a partial file.
///
/// The data goes to a hidden temp file in the same directory, is synced,
/// and is then renamed over the target. Rename within one directory is
/// atomic on every platform we target.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RepositoryError> {
    let tmp = temp_path_for(path)?;

    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            tracing::debug!(tmp = ?tmp, error = %cleanup, "temp file cleanup failed");
        }
        return Err(RepositoryError::io(path, e));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> Result<PathBuf, RepositoryError> {
    let name = path.file_name().ok_or_else(|| {
        RepositoryError::InvalidInput(format!("{path:?} has no file name"))
    })?;
    let tmp_name = format!(
        ".{}.{:016x}.tmp",
        name.to_string_lossy(),
        rand::random::<u64>()
    );
    Ok(path.with_file_name(tmp_name))
}

/// Returns `true` for the hidden temp files [`write_atomic`] leaves while a
/// write is in flight.
pub(crate) fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}

/// Reads a whole file, mapping a missing file to `NotFound(what)`.
pub(crate) async fn read_bytes(path: &Path, what: &str) -> Result<Vec<u8>, RepositoryError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RepositoryError::NotFound(what.to_string()),
        _ => RepositoryError::io(path, e),
    })
}

/// Reads and parses an XML record.
pub(crate) async fn read_xml<T: DeserializeOwned>(
    path: &Path,
    what: &str,
) -> Result<T, RepositoryError> {
    let bytes = read_bytes(path, what).await?;
    let text = std::str::from_utf8(&bytes).map_err(|e| RepositoryError::CorruptData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    quick_xml::de::from_str(text).map_err(|e| RepositoryError::CorruptData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Serializes a record and writes it atomically.
pub(crate) async fn write_xml<T: Serialize>(path: &Path, value: &T) -> Result<(), RepositoryError> {
    let body = quick_xml::se::to_string(value).map_err(|e| {
        RepositoryError::InvalidInput(format!("record cannot be serialized: {e}"))
    })?;
    let mut doc = String::with_capacity(XML_DECLARATION.len() + body.len() + 1);
    doc.push_str(XML_DECLARATION);
    doc.push_str(&body);
    doc.push('\n');
    write_atomic(path, doc.as_bytes()).await
}
