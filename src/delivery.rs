//! Content delivery: a uniform abstraction over redirects, byte streams and
//! on-disk paths, plus the conversion of each to wire behavior.
//!
//! The negotiator knows nothing about storage backends. A pluggable
//! `ContentHandler` produces a `FileResult`; this module only interprets the
//! variant. `Ok(None)` from a handler means "content not currently available"
//! and maps to 404 — deliberately distinct from `Err`, which maps to 500, so
//! a lazily-generated derivative that is not ready yet does not read as an
//! infrastructure failure.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::header::{
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, LOCATION,
};
use axum::http::{HeaderName, StatusCode};
use axum::response::Response;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tokio_util::io::ReaderStream;

use crate::context::RequestContext;
use crate::error::AppError;

pub mod disk;
pub mod rocrate;

pub type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetadata {
    pub content_type: String,
    pub content_length: u64,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// What a content handler resolved a record to.
pub enum FileResult {
    /// Content lives elsewhere; send the client there.
    Redirect { url: String },
    /// Content is produced as a byte stream scoped to this response.
    Stream { stream: ByteStream, metadata: ContentMetadata },
    /// Content is a local file; served directly, or offloaded to the
    /// front-end proxy when `accel_path` is set.
    FilePath { path: PathBuf, metadata: ContentMetadata, accel_path: Option<String> },
}

impl fmt::Debug for FileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileResult::Redirect { url } => f.debug_struct("Redirect").field("url", url).finish(),
            FileResult::Stream { metadata, .. } => {
                f.debug_struct("Stream").field("metadata", metadata).finish_non_exhaustive()
            }
            FileResult::FilePath { path, metadata, accel_path } => f
                .debug_struct("FilePath")
                .field("path", path)
                .field("metadata", metadata)
                .field("accel_path", accel_path)
                .finish(),
        }
    }
}

/// A pluggable content source. `get` resolves full content, `head` resolves
/// metadata only — HEAD requests must never open descriptors or mint signed
/// URLs just to answer.
#[async_trait]
pub trait ContentHandler<R>: Send + Sync {
    async fn get(&self, record: &R, ctx: &RequestContext) -> Result<Option<FileResult>, AppError>;
    async fn head(&self, record: &R, ctx: &RequestContext)
        -> Result<Option<ContentMetadata>, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

impl FromStr for Disposition {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(Disposition::Inline),
            "attachment" => Ok(Disposition::Attachment),
            _ => Err(()),
        }
    }
}

/// Per-request delivery options from the HTTP surface.
#[derive(Debug, Clone, Default)]
pub struct DeliveryOptions {
    /// Client cannot follow redirects; embed the target URL in a 200 body.
    pub no_redirect: bool,
    /// Set on download endpoints only; metadata endpoints never send a
    /// Content-Disposition.
    pub disposition: Option<Disposition>,
    /// Caller-supplied filename override for the disposition header.
    pub filename: Option<String>,
}

/// Convert a handler's `FileResult` into the wire response.
pub async fn respond_content(
    result: FileResult,
    record_filename: Option<&str>,
    opts: &DeliveryOptions,
    accel_header: &str,
) -> Result<Response, AppError> {
    match result {
        FileResult::Redirect { url } => {
            if opts.no_redirect {
                let body = serde_json::to_vec(&json!({ "location": url }))?;
                Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .map_err(|e| AppError::internal_from("failed to build response", e))
            } else {
                Response::builder()
                    .status(StatusCode::FOUND)
                    .header(LOCATION, url)
                    .body(Body::empty())
                    .map_err(|e| AppError::internal_from("failed to build response", e))
            }
        }
        FileResult::Stream { stream, metadata } => {
            let builder = content_headers(&metadata, record_filename, opts);
            builder
                .body(Body::from_stream(stream))
                .map_err(|e| AppError::internal_from("failed to build response", e))
        }
        FileResult::FilePath { path, metadata, accel_path } => {
            let builder = content_headers(&metadata, record_filename, opts);
            match accel_path {
                Some(accel) => {
                    // Byte transfer is the proxy's job: headers only, empty body.
                    let name = HeaderName::try_from(accel_header)
                        .map_err(|e| AppError::internal_from("invalid accel header name", e))?;
                    builder
                        .header(name, accel)
                        .body(Body::empty())
                        .map_err(|e| AppError::internal_from("failed to build response", e))
                }
                None => {
                    let file = tokio::fs::File::open(&path).await.map_err(|e| {
                        AppError::internal_from(
                            format!("failed to open content file {}", path.display()),
                            e,
                        )
                    })?;
                    // The stream owns the descriptor; dropping the body on
                    // disconnect closes it.
                    builder
                        .body(Body::from_stream(ReaderStream::new(file)))
                        .map_err(|e| AppError::internal_from("failed to build response", e))
                }
            }
        }
    }
}

/// Metadata-only response for HEAD requests: same headers, empty body.
pub fn respond_metadata(
    metadata: &ContentMetadata,
    record_filename: Option<&str>,
    opts: &DeliveryOptions,
) -> Result<Response, AppError> {
    content_headers(metadata, record_filename, opts)
        .body(Body::empty())
        .map_err(|e| AppError::internal_from("failed to build response", e))
}

fn content_headers(
    metadata: &ContentMetadata,
    record_filename: Option<&str>,
    opts: &DeliveryOptions,
) -> axum::http::response::Builder {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, metadata.content_type.as_str())
        .header(CONTENT_LENGTH, metadata.content_length);
    if let Some(etag) = &metadata.etag {
        builder = builder.header(ETAG, format!("\"{etag}\""));
    }
    if let Some(modified) = &metadata.last_modified {
        builder = builder.header(LAST_MODIFIED, httpdate(modified));
    }
    if let Some(mode) = opts.disposition {
        let filename = opts.filename.as_deref().or(record_filename);
        if let Some(filename) = filename {
            builder = builder.header(CONTENT_DISPOSITION, disposition_value(mode, filename));
        }
    }
    builder
}

/// RFC 6266 disposition with an ASCII fallback and an RFC 5987 encoded form.
pub fn disposition_value(mode: Disposition, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' { c } else { '_' })
        .collect();
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        mode.as_str(),
        fallback,
        urlencoding::encode(filename)
    )
}

pub fn httpdate(when: &DateTime<Utc>) -> String {
    when.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Wrap an in-memory document as a single-chunk byte stream.
pub fn memory_stream(bytes: Vec<u8>) -> ByteStream {
    futures_util::stream::once(async move { Ok(Bytes::from(bytes)) }).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn disposition_value_escapes_non_ascii() {
        let v = disposition_value(Disposition::Attachment, "tape ånr 7.wav");
        assert!(v.starts_with("attachment; filename=\"tape _nr 7.wav\""));
        assert!(v.contains("filename*=UTF-8''tape%20%C3%A5nr%207.wav"));
        let inline = disposition_value(Disposition::Inline, "plain.wav");
        assert!(inline.starts_with("inline; filename=\"plain.wav\""));
    }

    #[test]
    fn httpdate_is_rfc7231_shaped() {
        let when = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap();
        assert_eq!(httpdate(&when), "Sat, 09 Mar 2024 12:30:05 GMT");
    }
}
