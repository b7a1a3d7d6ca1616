//! File handler serving record content from a local content root.
//!
//! The record's opaque `meta` bag carries the content path (`path` key)
//! relative to the configured root. A record without a path, or a path whose
//! file is not on disk, is benign absence (`Ok(None)`), not an error. When an
//! accel prefix is configured the handler emits an offload path so the
//! front-end proxy performs the byte transfer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use xxhash_rust::xxh3::xxh3_64;

use crate::config::Config;
use crate::context::RequestContext;
use crate::delivery::{ContentHandler, ContentMetadata, FileResult};
use crate::error::AppError;
use crate::model::FileRecord;

pub struct DiskFileHandler {
    root: PathBuf,
    accel_prefix: Option<String>,
}

impl DiskFileHandler {
    pub fn new(cfg: &Config) -> Self {
        DiskFileHandler {
            root: cfg.content_root.clone(),
            accel_prefix: cfg.accel_prefix.clone(),
        }
    }

    fn relative_path(record: &FileRecord) -> Option<String> {
        record
            .meta
            .as_ref()
            .and_then(|m| m.get("path"))
            .and_then(|p| p.as_str())
            .map(|p| p.to_string())
    }

    async fn stat(&self, record: &FileRecord) -> Result<Option<(String, PathBuf, ContentMetadata)>, AppError> {
        let Some(rel) = Self::relative_path(record) else {
            return Ok(None);
        };
        validate_content_path(&rel)?;
        let path = self.root.join(&rel);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::internal_from(
                    format!("failed to stat content file {}", path.display()),
                    e,
                ))
            }
        };
        if !meta.is_file() {
            return Ok(None);
        }

        let modified: Option<DateTime<Utc>> = meta.modified().ok().map(DateTime::<Utc>::from);
        let mtime_unix = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let metadata = ContentMetadata {
            content_type: record.media_type.clone(),
            content_length: meta.len(),
            etag: Some(etag_for(&rel, meta.len(), mtime_unix)),
            last_modified: modified,
        };
        Ok(Some((rel, path, metadata)))
    }
}

#[async_trait]
impl ContentHandler<FileRecord> for DiskFileHandler {
    async fn get(
        &self,
        record: &FileRecord,
        _ctx: &RequestContext,
    ) -> Result<Option<FileResult>, AppError> {
        let Some((rel, path, metadata)) = self.stat(record).await? else {
            return Ok(None);
        };
        let accel_path = self
            .accel_prefix
            .as_ref()
            .map(|prefix| format!("{}/{}", prefix.trim_end_matches('/'), rel));
        Ok(Some(FileResult::FilePath { path, metadata, accel_path }))
    }

    async fn head(
        &self,
        record: &FileRecord,
        _ctx: &RequestContext,
    ) -> Result<Option<ContentMetadata>, AppError> {
        Ok(self.stat(record).await?.map(|(_, _, metadata)| metadata))
    }
}

/// Validate a content path from a record's meta bag before joining it under
/// the root:
/// - segments separated by '/', no empty segments (no leading/trailing '/' or '//')
/// - NUL not allowed
/// - '.' and '..' segments not allowed
/// A violation is a data error in the store, not client input.
pub fn validate_content_path(path: &str) -> Result<(), AppError> {
    if path.is_empty() {
        return Err(AppError::internal("content path cannot be empty"));
    }
    if path.chars().any(|c| c == '\u{0000}') {
        return Err(AppError::internal("content path cannot contain NUL characters"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(AppError::internal("leading or trailing '/' is not allowed in content paths"));
    }
    for seg in path.split('/') {
        if seg.is_empty() {
            return Err(AppError::internal("empty segment in content path"));
        }
        if seg == "." || seg == ".." {
            return Err(AppError::internal("segments '.' and '..' are not allowed"));
        }
    }
    Ok(())
}

/// Stable ETag from the path, size and mtime using xxh3_64; fixed-width
/// lowercase hex. Cheap enough to compute per request without reading bytes.
fn etag_for(rel: &str, len: u64, mtime_unix: u64) -> String {
    let h = xxh3_64(format!("{rel}:{len}:{mtime_unix}").as_bytes());
    format!("{h:016x}")
}
