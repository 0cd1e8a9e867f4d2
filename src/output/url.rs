//! Storage locations (object storage or local filesystem)

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Kind of storage a location points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `s3://`, `s3a://`, `s3n://`
    S3,
    /// `gs://`
    Gcs,
    /// Local path or `file://`
    Local,
}

/// A storage location as written in the config file
///
/// Keeps the original text for logging and produces the forms the engine and
/// the object store need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUrl {
    raw: String,
    scheme: Scheme,
}

impl StorageUrl {
    /// Parse a location
    ///
    /// Supported formats:
    /// - `s3://bucket/path/`, `s3a://bucket/path/`, `s3n://bucket/path/`
    /// - `gs://bucket/path/`
    /// - `/local/path/`, `./path/` or `file:///local/path/`
    pub fn parse(url: &str) -> Result<Self> {
        let raw = url.trim();
        if raw.is_empty() {
            return Err(Error::config("Empty storage location"));
        }

        let scheme = match raw.split_once("://") {
            Some(("s3" | "s3a" | "s3n", rest)) => {
                if rest.trim_matches('/').is_empty() {
                    return Err(Error::config(format!("Missing bucket in {raw}")));
                }
                Scheme::S3
            }
            Some(("gs", rest)) => {
                if rest.trim_matches('/').is_empty() {
                    return Err(Error::config(format!("Missing bucket in {raw}")));
                }
                Scheme::Gcs
            }
            Some(("file", _)) | None => Scheme::Local,
            Some((other, _)) => {
                return Err(Error::config(format!(
                    "Unsupported storage scheme '{other}' in {raw}"
                )))
            }
        };

        Ok(Self {
            raw: raw.to_string(),
            scheme,
        })
    }

    /// Original text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Storage kind
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Check if this is object storage (not local)
    pub fn is_remote(&self) -> bool {
        self.scheme != Scheme::Local
    }

    /// Append a relative path, with exactly one separator in between
    pub fn join(&self, relative: &str) -> Self {
        let relative = relative.trim_start_matches('/');
        let base = self.raw.trim_end_matches('/');
        Self {
            raw: format!("{base}/{relative}"),
            scheme: self.scheme,
        }
    }

    /// Location as the engine expects it.
    ///
    /// Hadoop-style `s3a://`/`s3n://` become `s3://`; `file://` is stripped.
    /// `gs://` also becomes `s3://`: the engine reaches GCS through its
    /// S3-compatible endpoint.
    pub fn engine_path(&self) -> String {
        match self.scheme {
            Scheme::S3 | Scheme::Gcs => match self.raw.split_once("://") {
                Some((_, rest)) => format!("s3://{rest}"),
                None => self.raw.clone(),
            },
            Scheme::Local => self
                .raw
                .strip_prefix("file://")
                .unwrap_or(&self.raw)
                .to_string(),
        }
    }

    /// Bucket and key prefix of an object-storage location
    pub fn bucket_and_prefix(&self) -> Option<(&str, &str)> {
        if !self.is_remote() {
            return None;
        }
        let (_, rest) = self.raw.split_once("://")?;
        match rest.split_once('/') {
            Some((bucket, prefix)) => Some((bucket, prefix.trim_matches('/'))),
            None => Some((rest, "")),
        }
    }

    /// Filesystem path of a local location
    pub fn local_path(&self) -> Option<PathBuf> {
        (self.scheme == Scheme::Local).then(|| PathBuf::from(self.engine_path()))
    }
}

impl fmt::Display for StorageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
