//! Engine type names and Arrow types

use crate::error::{Error, Result};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

/// Map an engine (DuckDB) column type name to an Arrow type
pub fn arrow_type(engine_type: &str) -> Option<DataType> {
    let normalized = engine_type.trim().to_ascii_uppercase();
    let data_type = match normalized.as_str() {
        "VARCHAR" | "TEXT" | "STRING" => DataType::Utf8,
        "BOOLEAN" => DataType::Boolean,
        "TINYINT" => DataType::Int8,
        "SMALLINT" => DataType::Int16,
        "INTEGER" => DataType::Int32,
        "BIGINT" => DataType::Int64,
        "FLOAT" => DataType::Float32,
        "DOUBLE" => DataType::Float64,
        "DATE" => DataType::Date32,
        "TIMESTAMP" => DataType::Timestamp(TimeUnit::Microsecond, None),
        "TIMESTAMP WITH TIME ZONE" => {
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
        }
        _ => return None,
    };
    Some(data_type)
}

/// Map an Arrow type to the engine column type used in explicit read schemas
pub fn engine_type(data_type: &DataType) -> Result<&'static str> {
    let name = match data_type {
        DataType::Utf8 => "VARCHAR",
        DataType::Boolean => "BOOLEAN",
        DataType::Int8 => "TINYINT",
        DataType::Int16 => "SMALLINT",
        DataType::Int32 => "INTEGER",
        DataType::Int64 => "BIGINT",
        DataType::Float32 => "FLOAT",
        DataType::Float64 => "DOUBLE",
        DataType::Date32 => "DATE",
        DataType::Timestamp(TimeUnit::Microsecond, None) => "TIMESTAMP",
        other => {
            return Err(Error::engine(format!(
                "No engine type for Arrow type {other}"
            )))
        }
    };
    Ok(name)
}

/// Check whether a written type satisfies a declared type.
///
/// Parquet readers may attach a time zone to timestamps and may pick a
/// large or view string encoding; neither changes the column's meaning.
pub fn types_compatible(declared: &DataType, actual: &DataType) -> bool {
    match (declared, actual) {
        (a, b) if a == b => true,
        (DataType::Timestamp(u1, _), DataType::Timestamp(u2, _)) => u1 == u2,
        (DataType::Utf8, DataType::LargeUtf8 | DataType::Utf8View) => true,
        _ => false,
    }
}

/// Build a schema from `(column, engine type)` pairs, as returned by `DESCRIBE`
pub fn schema_from_engine(columns: &[(String, String)]) -> Result<Schema> {
    let fields = columns
        .iter()
        .map(|(name, engine_type)| {
            arrow_type(engine_type)
                .map(|data_type| Field::new(name, data_type, true))
                .ok_or_else(|| {
                    Error::engine(format!(
                        "Unsupported engine type {engine_type} for column {name}"
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

/// Render a schema as `name: Type, ...` for error messages
pub fn describe_schema(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check that `actual` has exactly the declared columns, in order, with
/// compatible types and the same nullability.
pub fn check_schema(relation: &str, declared: &Schema, actual: &Schema) -> Result<()> {
    let matches = declared.fields().len() == actual.fields().len()
        && declared
            .fields()
            .iter()
            .zip(actual.fields().iter())
            .all(|(d, a)| {
                d.name() == a.name()
                    && d.is_nullable() == a.is_nullable()
                    && types_compatible(d.data_type(), a.data_type())
            });

    if matches {
        Ok(())
    } else {
        Err(Error::SchemaMismatch {
            relation: relation.to_string(),
            expected: describe_schema(declared),
            actual: describe_schema(actual),
        })
    }
}
