//! Output root access through `object_store` (S3, GCS, local)
//!
//! The engine writes the Parquet files itself. This store handles what the
//! engine does not: clearing a relation directory before it is rewritten, and
//! reading the written files back for verification.

use super::url::{Scheme, StorageUrl};
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::sync::Arc;

/// Output root opened as an object store
#[derive(Debug, Clone)]
pub struct OutputStore {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Key prefix of the output root within the bucket
    prefix: String,
    /// Output root as configured
    root: StorageUrl,
}

impl OutputStore {
    /// Open the store behind an output root.
    ///
    /// Object-storage credentials are taken from the process environment.
    pub fn open(root: &StorageUrl) -> Result<Self> {
        match root.scheme() {
            Scheme::S3 => Self::open_s3(root),
            Scheme::Gcs => Self::open_gcs(root),
            Scheme::Local => Self::open_local(root),
        }
    }

    fn open_s3(root: &StorageUrl) -> Result<Self> {
        let (bucket, prefix) = root
            .bucket_and_prefix()
            .ok_or_else(|| Error::config(format!("Invalid S3 location: {root}")))?;

        // AWS_ENDPOINT is read by from_env()
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if std::env::var("AWS_ENDPOINT").is_ok_and(|e| e.starts_with("http://")) {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create S3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: prefix.to_string(),
            root: root.clone(),
        })
    }

    fn open_gcs(root: &StorageUrl) -> Result<Self> {
        let (bucket, prefix) = root
            .bucket_and_prefix()
            .ok_or_else(|| Error::config(format!("Invalid GCS location: {root}")))?;

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: prefix.to_string(),
            root: root.clone(),
        })
    }

    fn open_local(root: &StorageUrl) -> Result<Self> {
        let path = root
            .local_path()
            .ok_or_else(|| Error::config(format!("Invalid local path: {root}")))?;

        // Create directory if it doesn't exist
        std::fs::create_dir_all(&path).map_err(|e| {
            Error::config(format!("Failed to create directory {}: {e}", path.display()))
        })?;

        let store = LocalFileSystem::new_with_prefix(&path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            root: root.clone(),
        })
    }

    /// Output root as configured
    pub fn root(&self) -> &StorageUrl {
        &self.root
    }

    /// Object key of a path relative to the output root
    pub fn object_path(&self, relative: &str) -> ObjectPath {
        let relative = relative.trim_matches('/');
        if self.prefix.is_empty() {
            ObjectPath::from(relative)
        } else {
            ObjectPath::from(format!("{}/{relative}", self.prefix))
        }
    }

    /// List every object under a relative directory, sorted by key.
    ///
    /// A directory that does not exist yet lists as empty.
    pub async fn list(&self, relative: &str) -> Result<Vec<ObjectMeta>> {
        let prefix = self.object_path(relative);
        let mut stream = self.store.list(Some(&prefix));
        let mut objects = Vec::new();

        loop {
            match stream.try_next().await {
                Ok(Some(meta)) => objects.push(meta),
                Ok(None) => break,
                Err(object_store::Error::NotFound { .. }) => break,
                Err(e) => return Err(e.into()),
            }
        }

        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    /// List the Parquet files under a relative directory
    pub async fn list_parquet(&self, relative: &str) -> Result<Vec<ObjectMeta>> {
        Ok(self
            .list(relative)
            .await?
            .into_iter()
            .filter(|meta| meta.location.extension() == Some("parquet"))
            .collect())
    }

    /// Delete every object under a relative directory.
    ///
    /// Returns the number of objects removed.
    pub async fn clear(&self, relative: &str) -> Result<usize> {
        let objects = self.list(relative).await?;
        for meta in &objects {
            self.store
                .delete(&meta.location)
                .await
                .map_err(|e| Error::output(format!("Failed to delete {}: {e}", meta.location)))?;
        }
        Ok(objects.len())
    }

    /// Make sure a single-file target can be written by the engine.
    ///
    /// The engine does not create parent directories on local disk; object
    /// storage has none to create.
    pub fn prepare_file(&self, relative: &str) -> Result<()> {
        let Some(root) = self.root.local_path() else {
            return Ok(());
        };
        let target = root.join(relative.trim_matches('/'));
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // A directory left by an older partitioned layout would block the file
        if target.is_dir() {
            std::fs::remove_dir_all(&target)?;
        }
        Ok(())
    }

    /// Read a whole object
    pub async fn read(&self, location: &ObjectPath) -> Result<Bytes> {
        let result = self
            .store
            .get(location)
            .await
            .map_err(|e| Error::output(format!("Failed to read {location}: {e}")))?;
        Ok(result.bytes().await?)
    }
}

/// Directory part of an object key (`songs/year=2018/data_0.parquet` → `songs/year=2018`)
pub fn parent_dir(location: &ObjectPath) -> String {
    let key = location.as_ref();
    key.rsplit_once('/')
        .map_or_else(String::new, |(dir, _)| dir.to_string())
}
