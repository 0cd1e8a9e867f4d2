//! Output module
//!
//! Handles the output root and the Parquet files the engine writes there.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Parsing storage locations (`s3a://`, `gs://`, local paths)
//! - Opening the output root as an object store (S3, GCS, local)
//! - Clearing relation directories before a rewrite
//! - Reading back Parquet footers to verify what was written

mod cloud;
mod inspect;
mod url;

pub use cloud::{parent_dir, OutputStore};
pub use inspect::{inspect_parquet, ParquetSummary};
pub use url::{Scheme, StorageUrl};
