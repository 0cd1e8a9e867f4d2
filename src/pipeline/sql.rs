//! SQL sent to the engine
//!
//! Every projection casts to the declared output type so the written schema
//! does not depend on what the engine infers from the log files.

use crate::error::Result;
use crate::schema::{engine_columns, song_data_schema};
use crate::session::quote_literal;
use crate::timestamp::{datetime_sql, timestamp_sql, OffsetSchedule};

/// View over the song metadata records
pub const SONGS_VIEW: &str = "songs_view";

/// View over the `NextSong` log events
pub const LOGS_VIEW: &str = "logs_view";

/// `LOGS_VIEW` plus the decoded timestamp columns
pub const TIMED_LOGS_VIEW: &str = "timed_logs_view";

/// Page action that marks a song play
pub const NEXT_SONG: &str = "NextSong";

/// Files read from each input directory
pub const JSON_GLOB: &str = "*.json";

fn glob(dir: &str) -> String {
    format!("{}/{JSON_GLOB}", dir.trim_end_matches('/'))
}

/// Cut a projection to `row_limit` rows.
///
/// The engine emits rows in whatever order its threads finish, so the rows
/// are sorted on every column first and a rerun keeps the same ones.
fn limited(query: String, row_limit: Option<usize>) -> String {
    match row_limit {
        Some(n) => format!("SELECT * FROM ({query}) AS projected ORDER BY ALL LIMIT {n}"),
        None => query,
    }
}

/// Song metadata records under `dir`, typed by the declared record schema
pub fn read_song_data(dir: &str) -> Result<String> {
    Ok(format!(
        "SELECT * FROM read_json('{}', format = 'newline_delimited', columns = {})",
        quote_literal(&glob(dir)),
        engine_columns(&song_data_schema())?
    ))
}

/// Song-play events under `dir`, schema inferred by the engine
pub fn read_log_data(dir: &str) -> String {
    format!(
        "SELECT * FROM read_json_auto('{}', format = 'newline_delimited') WHERE page = '{NEXT_SONG}'",
        quote_literal(&glob(dir))
    )
}

/// Log events plus `event_timestamp` and `event_datetime`
pub fn timed_logs(schedule: &OffsetSchedule) -> String {
    format!(
        "SELECT *, {} AS event_timestamp, {} AS event_datetime FROM {LOGS_VIEW}",
        timestamp_sql("ts", schedule),
        datetime_sql("ts", schedule)
    )
}

/// Events whose `ts` is null
pub fn null_timestamps() -> String {
    format!("SELECT ts FROM {LOGS_VIEW} WHERE ts IS NULL")
}

/// Events whose `ts` is present but not an integer
pub fn non_numeric_timestamps() -> String {
    format!("SELECT ts FROM {LOGS_VIEW} WHERE ts IS NOT NULL AND TRY_CAST(ts AS BIGINT) IS NULL")
}

/// `songs` relation
pub fn songs() -> String {
    format!("SELECT song_id, title, artist_id, year, duration FROM {SONGS_VIEW}")
}

/// `artists` relation (not deduplicated)
pub fn artists(row_limit: Option<usize>) -> String {
    let query = format!(
        "SELECT artist_id, \
                artist_name AS name, \
                artist_location AS location, \
                artist_latitude AS latitude, \
                artist_longitude AS longitude \
         FROM {SONGS_VIEW}"
    );
    limited(query, row_limit)
}

/// `users` relation
pub fn users(row_limit: Option<usize>) -> String {
    let query = format!(
        "SELECT DISTINCT CAST(userId AS VARCHAR) AS user_id, \
                         CAST(firstName AS VARCHAR) AS first_name, \
                         CAST(lastName AS VARCHAR) AS last_name, \
                         CAST(gender AS VARCHAR) AS gender, \
                         CAST(level AS VARCHAR) AS level \
         FROM {LOGS_VIEW}"
    );
    limited(query, row_limit)
}

/// `time` relation; weekday counts from 1 = Sunday
pub fn time(row_limit: Option<usize>) -> String {
    let query = format!(
        "SELECT DISTINCT event_datetime AS start_time, \
                         CAST(hour(event_timestamp) AS INTEGER) AS hour, \
                         CAST(day(event_timestamp) AS INTEGER) AS day, \
                         CAST(weekofyear(event_timestamp) AS INTEGER) AS week, \
                         CAST(month(event_timestamp) AS INTEGER) AS month, \
                         CAST(year(event_timestamp) AS INTEGER) AS year, \
                         CAST(dayofweek(event_timestamp) + 1 AS INTEGER) AS weekday \
         FROM {TIMED_LOGS_VIEW}"
    );
    limited(query, row_limit)
}

/// `songplays` relation: exact title match between events and songs
pub fn songplays(row_limit: Option<usize>) -> String {
    let query = format!(
        "SELECT CAST(l.sessionId AS BIGINT) AS songplay_id, \
                l.event_timestamp AS start_time, \
                CAST(year(l.event_timestamp) AS INTEGER) AS year, \
                CAST(month(l.event_timestamp) AS INTEGER) AS month, \
                CAST(l.userId AS VARCHAR) AS user_id, \
                CAST(l.level AS VARCHAR) AS level, \
                s.song_id, \
                s.artist_id, \
                CAST(l.sessionId AS BIGINT) AS session_id, \
                CAST(l.location AS VARCHAR) AS location, \
                CAST(l.userAgent AS VARCHAR) AS user_agent \
         FROM {TIMED_LOGS_VIEW} AS l \
         JOIN {SONGS_VIEW} AS s ON s.title = CAST(l.song AS VARCHAR)"
    );
    limited(query, row_limit)
}
