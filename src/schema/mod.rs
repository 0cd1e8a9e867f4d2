//! Relation schemas
//!
//! Every relation the pipeline writes has a fixed schema (names, order,
//! types, nullability) that does not depend on the input. This module
//! declares those schemas, the explicit schema of song metadata records, and
//! the mapping between engine type names and Arrow types used to check them.

mod relations;
mod types;

pub use relations::{
    all_tables, artists_table, engine_columns, song_data_schema, songplays_table, songs_table,
    time_table, users_table, TableDef,
};
pub use types::{
    arrow_type, check_schema, describe_schema, engine_type, schema_from_engine, types_compatible,
};

#[cfg(test)]
mod tests;
