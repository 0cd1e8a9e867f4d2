//! DuckDB-backed execution context
//!
//! One in-memory DuckDB connection carries the whole run. DuckDB reads the
//! JSON inputs, runs the SQL, and writes Parquet directly to the output
//! location (local or cloud) with `COPY ... TO`.

use crate::config::EtlConfig;
use crate::error::{Error, Result};
use crate::output::Scheme;
use crate::schema::schema_from_engine;
use arrow::datatypes::Schema;
use duckdb::Connection;

/// GCS interoperability endpoint, used when no `AWS_ENDPOINT` is set
pub const GCS_ENDPOINT: &str = "storage.googleapis.com";

/// Execution context shared by both pipeline stages
pub struct ExecutionContext {
    /// DuckDB connection
    conn: Connection,
}

impl ExecutionContext {
    /// Create the context for a run.
    ///
    /// Loads the object-storage connector only when an input or output root
    /// is remote; credentials must already be in the process environment
    /// (see [`EtlConfig::export_credentials`]).
    pub fn new(config: &EtlConfig) -> Result<Self> {
        let context = Self::in_memory()?;

        if let Some(threads) = config.threads {
            context.execute(&format!("SET threads = {threads};"))?;
        }

        if let Some(scheme) = config.remote_scheme() {
            context.configure_cloud_storage(scheme)?;
        }

        Ok(context)
    }

    /// Create a bare context with local filesystem access only
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")))?;

        Ok(Self { conn })
    }

    /// Configure cloud storage credentials (S3, R2, MinIO, GCS)
    pub fn configure_cloud_storage(&self, scheme: Scheme) -> Result<()> {
        // Install and load httpfs for cloud storage
        self.conn
            .execute_batch("INSTALL httpfs; LOAD httpfs;")
            .map_err(|e| Error::config(format!("Failed to load httpfs extension: {e}")))?;

        // Configure S3 credentials from environment (HMAC keys for GCS)
        let key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| Error::missing_field("AWS_ACCESS_KEY_ID"))?;
        let secret = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| Error::missing_field("AWS_SECRET_ACCESS_KEY"))?;
        let region =
            std::env::var("AWS_DEFAULT_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        self.conn
            .execute_batch(&format!(
                "SET s3_access_key_id = '{}'; SET s3_secret_access_key = '{}'; SET s3_region = '{}';",
                quote_literal(&key_id),
                quote_literal(&secret),
                quote_literal(&region)
            ))
            .map_err(|e| Error::config(format!("Failed to configure S3: {e}")))?;

        let endpoint = std::env::var("AWS_ENDPOINT").ok();
        if let Some(settings) = endpoint_settings(scheme, endpoint.as_deref()) {
            self.conn
                .execute_batch(&settings)
                .map_err(|e| Error::config(format!("Failed to configure S3 endpoint: {e}")))?;
        }

        tracing::info!(
            "Object storage connector configured for {:?} (region {})",
            scheme,
            region
        );
        Ok(())
    }

    /// Run one or more statements
    pub fn execute(&self, sql: &str) -> Result<()> {
        tracing::debug!("Executing: {}", sql);
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::engine(format!("{e} (while executing: {})", first_line(sql))))
    }

    /// Register a query under a name for later statements
    pub fn create_view(&self, name: &str, query: &str) -> Result<()> {
        self.execute(&format!("CREATE OR REPLACE TEMP VIEW {name} AS {query};"))
    }

    /// Output schema of a query, without running it
    pub fn describe(&self, query: &str) -> Result<Schema> {
        let sql = format!("DESCRIBE {query}");
        tracing::debug!("Executing: {}", sql);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::engine(format!("Failed to describe query: {e}")))?;

        let columns: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| Error::engine(format!("Failed to describe query: {e}")))?
            .collect::<std::result::Result<_, _>>()?;

        schema_from_engine(&columns)
    }

    /// Number of rows a query returns
    pub fn count(&self, query: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM ({query}) AS q");
        tracing::debug!("Executing: {}", sql);

        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| Error::engine(format!("Failed to count rows: {e}")))?;
        Ok(count as usize)
    }

    /// Smallest and largest value of an integer column, `None` when empty
    pub fn bounds(&self, relation: &str, column: &str) -> Result<Option<(i64, i64)>> {
        let sql = format!(
            "SELECT MIN(CAST({column} AS BIGINT)), MAX(CAST({column} AS BIGINT)) FROM {relation}"
        );
        tracing::debug!("Executing: {}", sql);

        let (min, max): (Option<i64>, Option<i64>) = self
            .conn
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| Error::engine(format!("Failed to read bounds of {column}: {e}")))?;
        Ok(min.zip(max))
    }

    /// Write a query result as Parquet (local or cloud).
    ///
    /// With partition columns, `target` is a directory that receives
    /// `key=value/.../data_N.parquet` files and the partition columns are not
    /// stored in the files. Without, `target` is a single file.
    pub fn copy_to_parquet(&self, query: &str, target: &str, partition_by: &[&str]) -> Result<()> {
        let mut options = vec!["FORMAT PARQUET".to_string(), "COMPRESSION 'SNAPPY'".to_string()];
        if !partition_by.is_empty() {
            options.push(format!("PARTITION_BY ({})", partition_by.join(", ")));
            options.push("OVERWRITE_OR_IGNORE true".to_string());
        }

        // Use DuckDB's COPY TO to write directly to Parquet
        let copy_sql = format!(
            "COPY ({query}) TO '{}' ({});",
            quote_literal(target),
            options.join(", ")
        );

        tracing::debug!("Executing: {}", copy_sql);
        self.conn
            .execute_batch(&copy_sql)
            .map_err(|e| Error::engine(format!("Failed to write Parquet to {target}: {e}")))
    }

    /// Run a query and collect every value as text (`NULL` → `None`)
    pub fn query_text(&self, query: &str) -> Result<Vec<Vec<Option<String>>>> {
        let described = self.describe(query)?;
        let width = described.fields().len();
        let casts = described
            .fields()
            .iter()
            .map(|f| format!("CAST(\"{}\" AS VARCHAR)", f.name()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {casts} FROM ({query}) AS q");
        tracing::debug!("Executing: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Escape a value for use inside a single-quoted SQL literal
pub fn quote_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Endpoint statements for the connector: a custom endpoint (R2, MinIO)
/// wins, GCS roots otherwise go to the interoperability endpoint.
fn endpoint_settings(scheme: Scheme, custom: Option<&str>) -> Option<String> {
    let (host, use_ssl) = match (custom, scheme) {
        (Some(endpoint), _) => (
            endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://"),
            !endpoint.starts_with("http://"),
        ),
        (None, Scheme::Gcs) => (GCS_ENDPOINT, true),
        (None, _) => return None,
    };
    Some(format!(
        "SET s3_endpoint = '{}'; SET s3_url_style = 'path'; SET s3_use_ssl = {use_ssl};",
        quote_literal(host)
    ))
}

fn first_line(sql: &str) -> &str {
    sql.trim().lines().next().unwrap_or_default()
}
