//! `TIMEZONE = local` across a daylight saving change
//!
//! Kept in its own test binary: it sets `TZ` for the whole process.

use serde_json::json;
use sparkify_lake::session::ExecutionContext;
use sparkify_lake::{run, EtlConfig};
use std::path::Path;

/// 2018-11-02 01:25:34.796 UTC, daylight time in New York
const BEFORE_FALL_BACK: i64 = 1_541_121_934_796;

/// 2018-11-15 12:00:00 UTC, standard time in New York
const AFTER_FALL_BACK: i64 = 1_542_283_200_000;

const NEW_YORK_ZONEINFO: &str = "/usr/share/zoneinfo/America/New_York";

fn event(user_id: &str, ts: i64) -> serde_json::Value {
    json!({
        "firstName": "Kaylee",
        "gender": "F",
        "lastName": "Summers",
        "level": "free",
        "location": "Phoenix-Mesa-Scottsdale, AZ",
        "page": "NextSong",
        "sessionId": 139,
        "song": "Test Song",
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": user_id,
    })
}

fn write(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn test_local_time_zone_follows_dst() {
    if !Path::new(NEW_YORK_ZONEINFO).exists() {
        println!("Skipping: {NEW_YORK_ZONEINFO} not installed");
        return;
    }
    std::env::set_var("TZ", "America/New_York");

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    let song = json!({
        "num_songs": 1,
        "artist_id": "ARJIE2Y1187B994AB7",
        "artist_name": "Line Renaud",
        "song_id": "SOUPIRU12A6D4FA1E1",
        "title": "Test Song",
        "duration": 152.92036,
        "year": 2018,
    });
    write(
        &input.join("song_data/A/A/A/TRAAAAW128F429D538.json"),
        &format!("{song}\n"),
    );
    write(
        &input.join("log_data/2018/11/2018-11-events.json"),
        &format!(
            "{}\n{}\n",
            event("26", BEFORE_FALL_BACK),
            event("27", AFTER_FALL_BACK)
        ),
    );

    let config = EtlConfig::parse(&format!(
        "[AWS]\nAWS_ACCESS_KEY_ID = AKIAEXAMPLE\nAWS_SECRET_ACCESS_KEY = secret\n\n\
         [LOCAL]\nINPUT = {}\nS3 = {}\nTIMEZONE = local\n\n\
         [PIPELINE]\nROW_LIMIT = none\n",
        input.display(),
        output.display()
    ))
    .unwrap();

    let report = run(config).await.unwrap();
    assert_eq!(report.relation("time").unwrap().rows, 2);
    assert_eq!(report.relation("songplays").unwrap().rows, 2);

    let ctx = ExecutionContext::in_memory().unwrap();
    let start_times = ctx
        .query_text(&format!(
            "SELECT start_time, hour FROM read_parquet('{}/**/*.parquet') ORDER BY ALL",
            output.join("time/time_table.parquet").display()
        ))
        .unwrap();
    assert_eq!(
        start_times,
        vec![
            vec![Some("2018-11-01 21:25:34".to_string()), Some("21".to_string())],
            vec![Some("2018-11-15 07:00:00".to_string()), Some("7".to_string())],
        ]
    );

    let songplays = ctx
        .query_text(&format!(
            "SELECT start_time FROM read_parquet('{}/**/*.parquet') ORDER BY ALL",
            output.join("songplays/songplays_table.parquet").display()
        ))
        .unwrap();
    assert_eq!(
        songplays,
        vec![
            vec![Some("2018-11-01 21:25:34.796".to_string())],
            vec![Some("2018-11-15 07:00:00".to_string())],
        ]
    );
}
