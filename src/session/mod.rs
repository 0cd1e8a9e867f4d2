//! Session/context provider
//!
//! Establishes the single execution context both pipeline stages run
//! against. DuckDB is the query engine: it ingests JSON, executes SQL, and
//! writes partitioned Parquet to local disk or object storage.

mod context;

pub use context::{quote_literal, ExecutionContext};
