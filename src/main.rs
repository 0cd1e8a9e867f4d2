//! Sparkify Lake CLI
//!
//! Reads `dl.cfg` from the working directory and runs both stages

use sparkify_lake::config::CONFIG_FILE;
use sparkify_lake::{run, EtlConfig};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let result = match EtlConfig::from_file(CONFIG_FILE) {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    match result.and_then(|report| report.to_json()) {
        Ok(json) => tracing::info!("Run report: {}", json),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
