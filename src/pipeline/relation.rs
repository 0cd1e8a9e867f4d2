//! Relation writer
//!
//! Writes one relation: checks the query's schema against the declaration,
//! clears the previous output, lets the engine write Parquet, then reads the
//! footers back to confirm schema and row count.

use crate::error::Result;
use crate::output::{inspect_parquet, parent_dir, OutputStore};
use crate::schema::{check_schema, TableDef};
use crate::session::ExecutionContext;
use serde::Serialize;
use std::collections::BTreeSet;

/// What was written for one relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Relation name
    pub relation: String,
    /// Full output location
    pub location: String,
    /// Parquet files written
    pub files: usize,
    /// Rows across all files
    pub rows: usize,
    /// Distinct partition directories (0 when unpartitioned)
    pub partitions: usize,
}

/// Writes relations under the output root
pub struct RelationWriter<'a> {
    ctx: &'a ExecutionContext,
    store: &'a OutputStore,
}

impl<'a> RelationWriter<'a> {
    /// Create a writer over a context and an output store
    pub fn new(ctx: &'a ExecutionContext, store: &'a OutputStore) -> Self {
        Self { ctx, store }
    }

    /// Write the result of `query` as `table`
    pub async fn write(&self, table: &TableDef, query: &str) -> Result<WriteReport> {
        let described = self.ctx.describe(query)?;
        check_schema(table.name, table.schema(), &described)?;

        let target = self.store.root().join(table.path);
        if table.is_partitioned() {
            let removed = self.store.clear(table.path).await?;
            if removed > 0 {
                tracing::debug!("Removed {} previous objects under {}", removed, target);
            }
        } else {
            self.store.prepare_file(table.path)?;
        }

        tracing::info!("Writing {} to {}", table.name, target);
        self.ctx
            .copy_to_parquet(query, &target.engine_path(), table.partition_by)?;

        let report = self.verify(table).await?;
        tracing::info!(
            "Wrote {}: {} rows in {} files",
            table.name,
            report.rows,
            report.files
        );
        Ok(report)
    }

    /// Read back the written files of `table`
    pub async fn verify(&self, table: &TableDef) -> Result<WriteReport> {
        let files = if table.is_partitioned() {
            self.store
                .list_parquet(table.path)
                .await?
                .into_iter()
                .map(|meta| meta.location)
                .collect()
        } else {
            vec![self.store.object_path(table.path)]
        };

        let file_schema = table.file_schema();
        let mut rows = 0;
        let mut partitions = BTreeSet::new();

        for location in &files {
            let summary = inspect_parquet(self.store.read(location).await?)?;
            check_schema(table.name, &file_schema, &summary.schema)?;
            rows += summary.rows;
            if table.is_partitioned() {
                partitions.insert(parent_dir(location));
            }
        }

        Ok(WriteReport {
            relation: table.name.to_string(),
            location: self.store.root().join(table.path).to_string(),
            files: files.len(),
            rows,
            partitions: partitions.len(),
        })
    }
}
