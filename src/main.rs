//! ASTROLABE — NASA data access and correlation core
//!
//! Entry point. Loads configuration, initialises structured logging,
//! and runs one correlated query for a date given on the command line
//! (today when omitted), printing the result as JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use astrolabe::cancel::Cancellation;
use astrolabe::config::AppConfig;
use astrolabe::engine::CorrelationEngine;
use astrolabe::sources::parse_date;

const BANNER: &str = r#"
    _    ____ _____ ____   ___  _        _    ____  _____
   / \  / ___|_   _|  _ \ / _ \| |      / \  | __ )| ____|
  / _ \ \___ \ | | | |_) | | | | |     / _ \ |  _ \|  _|
 / ___ \ ___) || | |  _ <| |_| | |___ / ___ \| |_) | |___
/_/   \_\____/ |_| |_| \_\\___/|_____/_/   \_\____/|_____|

  NASA data access & correlation core
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml");
    init_logging();

    println!("{BANNER}");

    let date = match std::env::args().nth(1) {
        Some(arg) => parse_date("date", &arg)?,
        None => Utc::now().date_naive(),
    };

    info!(
        base_url = %cfg.api.base_url,
        ceiling = cfg.rate_limit.max_requests_per_hour,
        date = %date,
        "ASTROLABE starting up"
    );

    let engine = CorrelationEngine::from_config(&cfg)?;
    let summary = engine
        .summarize_date(date, &Cancellation::none())
        .await
        .with_context(|| format!("Failed to correlate {date}"))?;

    for warning in &summary.warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
