//! delivery-server
//!
//! - `delivery-server` runs the generation scheduler and the notification
//!   worker until Ctrl-C
//! - `delivery-server generate [YYYY-MM-DD]` runs one batch and exits

use delivery_server::utils::time;
use delivery_server::{BackgroundTasks, Config, LogConfig, ServerState, init_logger_with_file};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenv::dotenv();

    let log = LogConfig::from_env();
    init_logger_with_file(Some(&log.level), log.json, log.dir.as_deref());
    let config = Config::from_env();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve(config).await,
        Some("generate") => generate_once(config, args.get(1).map(String::as_str)).await,
        Some(other) => {
            eprintln!("Unknown command '{other}'");
            eprintln!("Usage: delivery-server [serve | generate [YYYY-MM-DD]]");
            std::process::exit(2);
        }
    }
}

async fn serve(config: Config) -> Result<(), BoxError> {
    tracing::info!(
        "Starting delivery-server (env: {}, timezone: {})",
        config.environment,
        config.timezone
    );

    let (state, rx) = ServerState::initialize(&config).await?;

    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(rx, &mut tasks);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    state.db.close().await;
    Ok(())
}

/// Cron entrypoint: one batch for `date` (default: today) as `system`
async fn generate_once(config: Config, date: Option<&str>) -> Result<(), BoxError> {
    let day = match date {
        Some(d) => time::parse_date(d)?,
        None => time::today(config.timezone),
    };

    let (state, rx) = ServerState::initialize(&config).await?;
    // No worker in one-shot mode; the summary goes to stdout
    let _rx = rx;

    let result = state.daily_generator().generate_for_day(day, "system").await;
    state.db.close().await;
    let result = result?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
