//! Event-log stage

use super::{sql, truncation, StageEnv, StageReport, LOG_DATA, SONG_DATA};
use crate::error::{Error, Result};
use crate::schema::{songplays_table, time_table, users_table};
use crate::timestamp::{get_datetime, OffsetSchedule};
use chrono::Utc;

/// Load the activity logs and write `users`, `time` and `songplays`
pub async fn process_log_data(env: &StageEnv<'_>) -> Result<StageReport> {
    let log_data = env.input_data.join(LOG_DATA);
    tracing::info!("Loading log data from {}", log_data);

    // Song plays only
    env.ctx
        .create_view(sql::LOGS_VIEW, &sql::read_log_data(&log_data.engine_path()))?;

    let users = users_table();
    let users_query = sql::users(truncation(&users, env.row_limit));
    let users_report = env.writer.write(&users, &users_query).await?;

    let schedule = offset_schedule(env)?;
    env.ctx
        .create_view(sql::TIMED_LOGS_VIEW, &sql::timed_logs(&schedule))?;

    let time = time_table();
    let time_query = sql::time(truncation(&time, env.row_limit));
    let time_report = env.writer.write(&time, &time_query).await?;

    // Reload the catalog for the join
    let song_data = env.input_data.join(SONG_DATA);
    env.ctx
        .create_view(sql::SONGS_VIEW, &sql::read_song_data(&song_data.engine_path())?)?;

    let songplays = songplays_table();
    let songplays_query = sql::songplays(truncation(&songplays, env.row_limit));
    let songplays_report = env.writer.write(&songplays, &songplays_query).await?;
    if songplays_report.rows == 0 {
        tracing::warn!("No song play matched a catalog title; songplays is empty");
    }

    Ok(StageReport {
        stage: "log_data".to_string(),
        relations: vec![users_report, time_report, songplays_report],
    })
}

/// Refuse to decode a log whose `ts` column has nulls or non-numeric values,
/// then work out the UTC offsets in effect across the events' time span
fn offset_schedule(env: &StageEnv<'_>) -> Result<OffsetSchedule> {
    let nulls = env.ctx.count(&sql::null_timestamps())?;
    if nulls > 0 {
        return Err(Error::timestamp(format!(
            "{nulls} song play events have no ts"
        )));
    }

    let non_numeric = env.ctx.count(&sql::non_numeric_timestamps())?;
    if non_numeric > 0 {
        return Err(Error::timestamp(format!(
            "{non_numeric} song play events have a non-numeric ts"
        )));
    }

    let Some((first, last)) = env.ctx.bounds(sql::LOGS_VIEW, "ts")? else {
        let now = Utc::now().timestamp_millis();
        return env.timezone.schedule(now, now);
    };

    let schedule = env.timezone.schedule(first, last)?;
    tracing::info!(
        "Song plays span {} to {} ({} time zone, {} UTC offset(s))",
        get_datetime(first, &schedule.offset_at(first))?,
        get_datetime(last, &schedule.offset_at(last))?,
        env.timezone,
        schedule.len()
    );
    Ok(schedule)
}
