//! ETL pipeline
//!
//! Two stages run in a fixed order against one execution context:
//!
//! ```text
//! session ──► song stage ──► log stage
//!              songs          users
//!              artists        time
//!                             songplays
//! ```
//!
//! There is no resume: if the log stage fails, the song stage outputs stay
//! written and the log stage outputs are absent or partial.

mod logs;
mod relation;
mod songs;
pub mod sql;

pub use logs::process_log_data;
pub use relation::{RelationWriter, WriteReport};
pub use songs::process_song_data;

use crate::config::EtlConfig;
use crate::error::Result;
use crate::output::{OutputStore, StorageUrl};
use crate::schema::TableDef;
use crate::session::ExecutionContext;
use crate::timestamp::TimeZoneSetting;
use serde::Serialize;
use std::time::Instant;

/// Song metadata directory under the input root
pub const SONG_DATA: &str = "song_data/A/A/A";

/// Activity log directory under the input root
pub const LOG_DATA: &str = "log_data/2018/11";

/// What a stage needs to run
pub struct StageEnv<'a> {
    /// Shared execution context
    pub ctx: &'a ExecutionContext,
    /// Writer for the output root
    pub writer: RelationWriter<'a>,
    /// Input root
    pub input_data: &'a StorageUrl,
    /// Row limit for truncated relations
    pub row_limit: Option<usize>,
    /// Time zone `ts` values are decoded in
    pub timezone: TimeZoneSetting,
}

/// Relations written by one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Stage name (`song_data` or `log_data`)
    pub stage: String,
    /// Relations in write order
    pub relations: Vec<WriteReport>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Input root
    pub input_data: String,
    /// Output root
    pub output_data: String,
    /// Stages in run order
    pub stages: Vec<StageReport>,
    /// Wall time of the run
    pub elapsed_ms: u128,
}

impl PipelineReport {
    /// Report for one relation, by name
    pub fn relation(&self, name: &str) -> Option<&WriteReport> {
        self.stages
            .iter()
            .flat_map(|s| s.relations.iter())
            .find(|r| r.relation == name)
    }

    /// Report as a single JSON line
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Row limit to apply to `table`; warns whenever one is set
pub(crate) fn truncation(table: &TableDef, row_limit: Option<usize>) -> Option<usize> {
    if let Some(limit) = row_limit {
        tracing::warn!(
            "Truncating {} to {} rows (set [PIPELINE] ROW_LIMIT = none to write all rows)",
            table.name,
            limit
        );
    }
    row_limit
}

/// A configured run: context and output store opened, stages not yet run
pub struct Pipeline {
    config: EtlConfig,
    ctx: ExecutionContext,
    store: OutputStore,
}

impl Pipeline {
    /// Export credentials, open the execution context and the output root.
    ///
    /// Fails before any stage runs if storage cannot be configured.
    pub fn new(config: EtlConfig) -> Result<Self> {
        config.export_credentials();
        let ctx = ExecutionContext::new(&config)?;
        let store = OutputStore::open(&config.output_data)?;
        Ok(Self { config, ctx, store })
    }

    /// Execution context of this run
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Run the song stage, then the log stage
    pub async fn run(&self) -> Result<PipelineReport> {
        let started = Instant::now();
        tracing::info!(
            "Running pipeline: {} -> {} (time zone {})",
            self.config.input_data,
            self.config.output_data,
            self.config.timezone
        );

        let env = StageEnv {
            ctx: &self.ctx,
            writer: RelationWriter::new(&self.ctx, &self.store),
            input_data: &self.config.input_data,
            row_limit: self.config.row_limit,
            timezone: self.config.timezone,
        };

        let song_stage = process_song_data(&env).await?;
        let log_stage = process_log_data(&env).await?;

        Ok(PipelineReport {
            input_data: self.config.input_data.to_string(),
            output_data: self.config.output_data.to_string(),
            stages: vec![song_stage, log_stage],
            elapsed_ms: started.elapsed().as_millis(),
        })
    }
}

/// Run the whole pipeline for a configuration
pub async fn run(config: EtlConfig) -> Result<PipelineReport> {
    Pipeline::new(config)?.run().await
}
