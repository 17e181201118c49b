//! CLI entry point for the delay/weather pipeline.
//!
//! Provides subcommands for a full pipeline run, serving the dashboard, and
//! one-off scrape or weather requests for checking the live sources.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use delay_weather::{
    config::PipelineConfig,
    dashboard::{self, DashboardState},
    fetch::BasicClient,
    ingest::{self, WeatherObservation, weather::weather_client},
    output::log_preview,
    pipeline::{Pipeline, PhaseOutcome},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "delay_weather")]
#[command(about = "Train delay and weather analysis for railway line 323", long_about = None)]
struct Cli {
    /// JSON config file; defaults are used for anything it leaves out
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: acquire, clean/merge, analyze, chart, export layers
    Run {
        /// Use the live scraper and weather service instead of sample data
        #[arg(long, default_value_t = false)]
        live: bool,

        /// Write gzip copies of CSV outputs
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Run the pipeline once, then serve the dashboard
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Scrape one origin/destination pair and log the rows found
    Scrape {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Travel date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Fetch weather for one date and print the flattened observation
    Weather {
        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/delay_weather.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("delay_weather.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { live, gzip } => {
            config.live_acquisition |= live;
            config.gzip_outputs |= gzip;
            let report = Pipeline::new(config).run().await?;
            for (phase, outcome) in &report.phases {
                if let PhaseOutcome::Partial(problems) = outcome {
                    for problem in problems {
                        warn!(%phase, problem = %problem, "Step failed");
                    }
                }
            }
            if report.halted() {
                bail!(
                    "pipeline halted: {}",
                    report.summary.error_message.as_deref().unwrap_or("unknown error")
                );
            }
            info!(files = report.written.len(), "Outputs written");
        }
        Commands::Serve { bind } => {
            let report = Pipeline::new(config.clone()).run().await?;
            let state = DashboardState::new(config, Some(report));
            dashboard::serve(state, &bind).await?;
        }
        Commands::Scrape { from, to, date } => {
            let client = BasicClient::with_timeout(Duration::from_secs(config.http_timeout_secs))?;
            let params = [
                ("f", from),
                ("t", to),
                ("date", date.format("%d.%m.%Y").to_string()),
                ("time", "00:00".to_string()),
            ];
            let scraped = ingest::scrape_delays(&client, &config.scrape_url, &params).await?;
            if scraped.is_empty() {
                warn!("No delay rows found");
            } else {
                log_preview("scraped", &scraped.into_table()?, usize::MAX);
            }
        }
        Commands::Weather { date } => {
            if !config.has_weather_key() {
                bail!("weather API key not configured; set WEATHER_API_KEY or weather_api_key in the config file");
            }
            let client = weather_client(&config)?;
            let json = ingest::fetch_weather(client.as_ref(), &config, date).await?;
            let observation = WeatherObservation::from_json(&json, date);
            println!("{}", serde_json::to_string_pretty(&observation)?);
        }
    }

    Ok(())
}
