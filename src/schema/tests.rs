//! Tests for schema module

use super::*;
use crate::error::Error;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use pretty_assertions::assert_eq;
use test_case::test_case;

// ============================================================================
// Declared Relation Tests
// ============================================================================

#[test_case(songs_table(), &["song_id", "title", "artist_id", "year", "duration"] ; "songs")]
#[test_case(artists_table(), &["artist_id", "name", "location", "latitude", "longitude"] ; "artists")]
#[test_case(users_table(), &["user_id", "first_name", "last_name", "gender", "level"] ; "users")]
#[test_case(time_table(), &["start_time", "hour", "day", "week", "month", "year", "weekday"] ; "time")]
#[test_case(
    songplays_table(),
    &[
        "songplay_id", "start_time", "year", "month", "user_id", "level",
        "song_id", "artist_id", "session_id", "location", "user_agent",
    ]
    ; "songplays"
)]
fn test_declared_columns(table: TableDef, expected: &[&str]) {
    assert_eq!(table.column_names(), expected);
    assert!(table.schema().fields().iter().all(|f| f.is_nullable()));
}

#[test]
fn test_partitioning() {
    assert_eq!(songs_table().partition_by, &["year", "artist_id"]);
    assert_eq!(time_table().partition_by, &["year", "month"]);
    assert_eq!(songplays_table().partition_by, &["year", "month"]);
    assert!(!artists_table().is_partitioned());
    assert!(!users_table().is_partitioned());
}

#[test]
fn test_file_schema_drops_partition_columns() {
    let file_schema = songplays_table().file_schema();
    let names: Vec<_> = file_schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "songplay_id",
            "start_time",
            "user_id",
            "level",
            "song_id",
            "artist_id",
            "session_id",
            "location",
            "user_agent",
        ]
    );

    let file_schema = artists_table().file_schema();
    assert_eq!(file_schema.fields().len(), 5);
}

#[test]
fn test_output_paths_are_distinct() {
    let tables = all_tables();
    let mut paths: Vec<_> = tables.iter().map(|t| t.path).collect();
    paths.sort_unstable();
    paths.dedup();
    assert_eq!(paths.len(), tables.len());
}

#[test]
fn test_song_data_columns() {
    let columns = engine_columns(&song_data_schema()).unwrap();
    assert_eq!(
        columns,
        "{'num_songs': 'INTEGER', 'artist_id': 'VARCHAR', 'artist_latitude': 'DOUBLE', \
         'artist_longitude': 'DOUBLE', 'artist_location': 'VARCHAR', 'artist_name': 'VARCHAR', \
         'song_id': 'VARCHAR', 'title': 'VARCHAR', 'duration': 'DOUBLE', 'year': 'INTEGER'}"
    );
}

// ============================================================================
// Type Mapping Tests
// ============================================================================

#[test_case("VARCHAR", DataType::Utf8)]
#[test_case("integer", DataType::Int32)]
#[test_case("BIGINT", DataType::Int64)]
#[test_case("DOUBLE", DataType::Float64)]
#[test_case("TIMESTAMP", DataType::Timestamp(TimeUnit::Microsecond, None))]
fn test_arrow_type(engine: &str, expected: DataType) {
    assert_eq!(arrow_type(engine), Some(expected.clone()));
    if engine.chars().all(|c| c.is_ascii_uppercase()) {
        assert_eq!(engine_type(&expected).unwrap(), engine);
    }
}

#[test]
fn test_unknown_engine_type() {
    assert_eq!(arrow_type("STRUCT(a INTEGER)"), None);
    assert!(engine_type(&DataType::Binary).is_err());

    let err = schema_from_engine(&[("payload".to_string(), "MAP(VARCHAR, JSON)".to_string())])
        .unwrap_err();
    assert!(err.to_string().contains("payload"));
}

#[test]
fn test_types_compatible() {
    let naive = DataType::Timestamp(TimeUnit::Microsecond, None);
    let utc = DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()));
    let millis = DataType::Timestamp(TimeUnit::Millisecond, None);

    assert!(types_compatible(&naive, &utc));
    assert!(!types_compatible(&naive, &millis));
    assert!(types_compatible(&DataType::Utf8, &DataType::LargeUtf8));
    assert!(!types_compatible(&DataType::Int32, &DataType::Int64));
}

// ============================================================================
// Schema Check Tests
// ============================================================================

fn describe(pairs: &[(&str, &str)]) -> Schema {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(n, t)| ((*n).to_string(), (*t).to_string()))
        .collect();
    schema_from_engine(&owned).unwrap()
}

#[test]
fn test_check_schema_accepts_exact_match() {
    let actual = describe(&[
        ("artist_id", "VARCHAR"),
        ("name", "VARCHAR"),
        ("location", "VARCHAR"),
        ("latitude", "DOUBLE"),
        ("longitude", "DOUBLE"),
    ]);
    check_schema("artists", artists_table().schema(), &actual).unwrap();
}

#[test]
fn test_check_schema_rejects_reordered_columns() {
    let actual = describe(&[
        ("name", "VARCHAR"),
        ("artist_id", "VARCHAR"),
        ("location", "VARCHAR"),
        ("latitude", "DOUBLE"),
        ("longitude", "DOUBLE"),
    ]);
    let err = check_schema("artists", artists_table().schema(), &actual).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { ref relation, .. } if relation == "artists"));
}

#[test]
fn test_check_schema_rejects_wrong_type() {
    let actual = describe(&[
        ("user_id", "BIGINT"),
        ("first_name", "VARCHAR"),
        ("last_name", "VARCHAR"),
        ("gender", "VARCHAR"),
        ("level", "VARCHAR"),
    ]);
    let err = check_schema("users", users_table().schema(), &actual).unwrap_err();
    assert!(err.to_string().contains("user_id: Int64"));
}

#[test]
fn test_check_schema_rejects_missing_column() {
    let declared = Schema::new(vec![
        Field::new("a", DataType::Utf8, true),
        Field::new("b", DataType::Utf8, true),
    ]);
    let actual = Schema::new(vec![Field::new("a", DataType::Utf8, true)]);
    assert!(check_schema("t", &declared, &actual).is_err());
}

#[test]
fn test_check_schema_rejects_nullability_change() {
    let declared = Schema::new(vec![Field::new("a", DataType::Utf8, true)]);
    let actual = Schema::new(vec![Field::new("a", DataType::Utf8, false)]);
    assert!(check_schema("t", &declared, &actual).is_err());
}

#[test]
fn test_describe_schema() {
    let schema = Schema::new(vec![
        Field::new("song_id", DataType::Utf8, true),
        Field::new("year", DataType::Int32, true),
    ]);
    assert_eq!(describe_schema(&schema), "song_id: Utf8, year: Int32");
}
