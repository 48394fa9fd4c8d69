// src/main.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weekly_reports::api::{self, AppState, WeekInfo};
use weekly_reports::clock::{Clock, SystemClock, TestClock};
use weekly_reports::config::{Config, StoreLocation};
use weekly_reports::directory::OrgDirectory;
use weekly_reports::edit_window::EditWindowPolicy;
use weekly_reports::period_key::PeriodKey;
use weekly_reports::repository::{
    InMemoryReportRepository, JsonFileReportRepository, ReportRepository,
};
use weekly_reports::resolver::ReportResolver;

#[derive(Parser, Debug)]
#[command(name = "weekly-reports", version, about = "Weekly business-unit report service")]
struct Cli {
    /// Overrides WEEKLY_REPORTS_SERVER_HOST
    #[arg(long)]
    host: Option<String>,

    /// Overrides WEEKLY_REPORTS_SERVER_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Overrides WEEKLY_REPORTS_STORE_PATH (":memory:" keeps reports in memory)
    #[arg(long)]
    store: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Describe the custom week for a key (Wnn-YYYY, YYYY-Wnn) or a date (YYYY-MM-DD)
    Week { input: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --- Setup ---
    let mut config = Config::from_env().context("Failed to read WEEKLY_REPORTS_* configuration")?;
    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let clock: Arc<dyn Clock> = match config.fixed_today.as_deref() {
        Some(date) => {
            warn!("Clock pinned to {}", date);
            Arc::new(TestClock::at_date(date).context("Invalid WEEKLY_REPORTS_FIXED_TODAY")?)
        }
        None => Arc::new(SystemClock),
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Week { input } => describe_week(&input, clock.as_ref()),
        Command::Serve => serve(config, clock).await,
    }
}

fn describe_week(input: &str, clock: &dyn Clock) -> Result<()> {
    let key = PeriodKey::parse(input)?;
    let info = WeekInfo::describe(key, &EditWindowPolicy::default(), clock.today())?;
    println!("{}  {}", info.key, info.label);
    println!("  start:    {}", info.start);
    println!("  end:      {}", info.end);
    println!("  decision: {:?}", info.decision);
    Ok(())
}

async fn serve(config: Config, clock: Arc<dyn Clock>) -> Result<()> {
    let directory = match &config.directory_path {
        Some(path) => OrgDirectory::load(path)
            .with_context(|| format!("Failed to load directory {}", path.display()))?,
        None => OrgDirectory::default(),
    };
    info!("Directory has {} business unit(s)", directory.units().len());

    let repository: Arc<dyn ReportRepository> = match config.store() {
        StoreLocation::InMemory => {
            warn!("Using the in-memory report store; reports are lost on exit.");
            Arc::new(InMemoryReportRepository::new())
        }
        StoreLocation::File(path) => Arc::new(
            JsonFileReportRepository::open(&path)
                .with_context(|| format!("Failed to open report store {}", path.display()))?,
        ),
    };

    let resolver = ReportResolver::new(repository, Arc::new(directory), clock);
    let app = api::router(AppState::new(resolver));

    let addr = config
        .socket_addr()
        .with_context(|| format!("Invalid listen address {}:{}", config.server_host, config.server_port))?;

    // --- Run Web Server ---
    match config.tls() {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to load TLS cert/key from {} and {}",
                        cert_path.display(),
                        key_path.display()
                    )
                })?;
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Starting server on http://{}", addr);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}
