//! Download artifact helpers
//!
//! Deterministic archive naming, SHA-256 checksums, the dry-run dummy
//! archive and human-readable sizes.

use crate::config::ExportConfig;
use crate::domain::{BackupError, ExportType, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Timestamp layout used in archive names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Build the archive file name for an export
///
/// Layout: `<prefix>-<export_type>[-flattened]_<YYYY-MM-DD_HH-MM-SS>.zip`
/// with the timestamp in UTC.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use notion_backup::core::export::artifact::artifact_filename;
/// use notion_backup::domain::ExportType;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
/// assert_eq!(
///     artifact_filename("notion-export", ExportType::Html, true, at),
///     "notion-export-html-flattened_2024-03-09_07-05-01.zip"
/// );
/// ```
pub fn artifact_filename(
    prefix: &str,
    export_type: ExportType,
    flattened: bool,
    at: DateTime<Utc>,
) -> String {
    let flattened_suffix = if flattened { "-flattened" } else { "" };
    format!(
        "{}-{}{}_{}.zip",
        prefix,
        export_type.as_str(),
        flattened_suffix,
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Format a byte count with binary units and one decimal
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

/// Incremental SHA-256 for data that arrives in chunks
#[derive(Default)]
pub struct StreamingChecksum {
    hasher: Sha256,
}

impl StreamingChecksum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Lowercase hex digest
    pub fn finalize(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

/// SHA-256 of a file on disk, as lowercase hex
///
/// # Errors
///
/// Returns `BackupError::Io` if the file cannot be read.
pub async fn checksum_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut checksum = StreamingChecksum::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        checksum.update(&buffer[..read]);
    }
    Ok(checksum.finalize())
}

/// Write a small placeholder archive for dry runs
///
/// The archive holds a README describing the run and one sample page, so
/// storage and notification paths see a real ZIP file.
///
/// # Errors
///
/// Returns `BackupError::Io` if the file cannot be created or written.
pub fn create_dummy_export(
    dir: &Path,
    filename: &str,
    export: &ExportConfig,
    storage_backend: &str,
    created_at: DateTime<Utc>,
) -> Result<PathBuf> {
    let path = dir.join(filename);
    let timestamp = created_at.format(TIMESTAMP_FORMAT);

    let readme = format!(
        "# Dummy Notion Export (DRY RUN)\n\n\
         This archive was produced by a dry run to exercise storage and\n\
         notifications without contacting the export platform.\n\n\
         - Export Type: {}\n\
         - Flattened: {}\n\
         - Comments: {}\n\
         - Timestamp: {}\n\
         - Storage Backend: {}\n",
        export.export_type, export.flatten_export_filetree, export.export_comments, timestamp,
        storage_backend
    );
    let page = format!(
        "# Sample Notion Page\n\nPlaceholder page content created in dry-run mode at {timestamp}.\n"
    );

    let zip_err = |e: zip::result::ZipError| {
        BackupError::Io(format!("Failed to write dummy archive {}: {}", path.display(), e))
    };

    let file = std::fs::File::create(&path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);

    writer.start_file("README.md", options).map_err(zip_err)?;
    writer.write_all(readme.as_bytes())?;
    writer.start_file("Sample Page.md", options).map_err(zip_err)?;
    writer.write_all(page.as_bytes())?;
    writer.finish().map_err(zip_err)?;

    tracing::info!(
        file = %filename,
        size_bytes = std::fs::metadata(&path)?.len(),
        "Created dummy export archive"
    );

    Ok(path)
}
