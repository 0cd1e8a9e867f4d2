//! Song-catalog stage

use super::{sql, truncation, StageEnv, StageReport, SONG_DATA};
use crate::error::Result;
use crate::schema::{artists_table, songs_table};

/// Load the song metadata records and write `songs` and `artists`
pub async fn process_song_data(env: &StageEnv<'_>) -> Result<StageReport> {
    let song_data = env.input_data.join(SONG_DATA);
    tracing::info!("Loading song data from {}", song_data);

    env.ctx
        .create_view(sql::SONGS_VIEW, &sql::read_song_data(&song_data.engine_path())?)?;

    let songs = songs_table();
    let songs_report = env.writer.write(&songs, &sql::songs()).await?;

    let artists = artists_table();
    let artists_query = sql::artists(truncation(&artists, env.row_limit));
    let artists_report = env.writer.write(&artists, &artists_query).await?;

    Ok(StageReport {
        stage: "song_data".to_string(),
        relations: vec![songs_report, artists_report],
    })
}
