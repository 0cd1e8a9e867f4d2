//! Declared schemas of the input records and the output relations

use super::types::engine_type;
use crate::error::Result;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// An output relation: name, location under the output root, partitioning
/// and exact schema.
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Relation name
    pub name: &'static str,
    /// Path under the output root
    pub path: &'static str,
    /// Partition columns, outermost first
    pub partition_by: &'static [&'static str],
    schema: SchemaRef,
}

impl TableDef {
    fn new(
        name: &'static str,
        path: &'static str,
        partition_by: &'static [&'static str],
        fields: Vec<Field>,
    ) -> Self {
        Self {
            name,
            path,
            partition_by,
            schema: Arc::new(Schema::new(fields)),
        }
    }

    /// Full relation schema, partition columns included
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Column names in declared order
    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    /// Whether the relation is written as `key=value` subdirectories
    pub fn is_partitioned(&self) -> bool {
        !self.partition_by.is_empty()
    }

    /// Schema of each data file: partition columns live in the path instead
    pub fn file_schema(&self) -> Schema {
        let fields: Vec<Field> = self
            .schema
            .fields()
            .iter()
            .filter(|f| !self.partition_by.contains(&f.name().as_str()))
            .map(|f| f.as_ref().clone())
            .collect();
        Schema::new(fields)
    }
}

fn utf8(name: &str) -> Field {
    Field::new(name, DataType::Utf8, true)
}

fn int32(name: &str) -> Field {
    Field::new(name, DataType::Int32, true)
}

fn int64(name: &str) -> Field {
    Field::new(name, DataType::Int64, true)
}

fn float64(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

// ============================================================================
// Input records
// ============================================================================

/// Schema of a song metadata record.
///
/// Declared rather than inferred so that heterogeneous records type the same
/// way; absent fields read as null.
pub fn song_data_schema() -> Schema {
    Schema::new(vec![
        int32("num_songs"),
        utf8("artist_id"),
        float64("artist_latitude"),
        float64("artist_longitude"),
        utf8("artist_location"),
        utf8("artist_name"),
        utf8("song_id"),
        utf8("title"),
        float64("duration"),
        int32("year"),
    ])
}

/// Engine `columns` argument for reading records with a declared schema:
/// `{'num_songs': 'INTEGER', ...}`
pub fn engine_columns(schema: &Schema) -> Result<String> {
    let columns = schema
        .fields()
        .iter()
        .map(|f| Ok(format!("'{}': '{}'", f.name(), engine_type(f.data_type())?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("{{{}}}", columns.join(", ")))
}

// ============================================================================
// Output relations
// ============================================================================

/// `songs`: one row per song record, partitioned by year and artist
pub fn songs_table() -> TableDef {
    TableDef::new(
        "songs",
        "songs/songs_table.parquet",
        &["year", "artist_id"],
        vec![
            utf8("song_id"),
            utf8("title"),
            utf8("artist_id"),
            int32("year"),
            float64("duration"),
        ],
    )
}

/// `artists`: artist columns of the song records
pub fn artists_table() -> TableDef {
    TableDef::new(
        "artists",
        "artists/artists_table.parquet",
        &[],
        vec![
            utf8("artist_id"),
            utf8("name"),
            utf8("location"),
            float64("latitude"),
            float64("longitude"),
        ],
    )
}

/// `users`: distinct users seen in song plays
pub fn users_table() -> TableDef {
    TableDef::new(
        "users",
        "users/users_table.parquet",
        &[],
        vec![
            utf8("user_id"),
            utf8("first_name"),
            utf8("last_name"),
            utf8("gender"),
            utf8("level"),
        ],
    )
}

/// `time`: distinct play start times broken into calendar units
pub fn time_table() -> TableDef {
    TableDef::new(
        "time",
        "time/time_table.parquet",
        &["year", "month"],
        vec![
            utf8("start_time"),
            int32("hour"),
            int32("day"),
            int32("week"),
            int32("month"),
            int32("year"),
            int32("weekday"),
        ],
    )
}

/// `songplays`: song-play events joined to the song catalog
pub fn songplays_table() -> TableDef {
    TableDef::new(
        "songplays",
        "songplays/songplays_table.parquet",
        &["year", "month"],
        vec![
            int64("songplay_id"),
            Field::new(
                "start_time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                true,
            ),
            int32("year"),
            int32("month"),
            utf8("user_id"),
            utf8("level"),
            utf8("song_id"),
            utf8("artist_id"),
            int64("session_id"),
            utf8("location"),
            utf8("user_agent"),
        ],
    )
}

/// Every output relation, in write order
pub fn all_tables() -> Vec<TableDef> {
    vec![
        songs_table(),
        artists_table(),
        users_table(),
        time_table(),
        songplays_table(),
    ]
}
