use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use seatwarden_client::{
    format_countdown, ClientError, Endpoints, HttpSession, LibraryClient,
};
use seatwarden_core::{AppConfig, ReservationRequest};
use seatwarden_sandbox::SandboxedCaller;
use seatwarden_scheduler::{CheckInWatchdog, CronTrigger, RetryScheduler, WatchdogState};
use tracing::{error, info, warn};

type Client = LibraryClient<HttpSession>;

#[derive(Debug, Parser)]
#[command(name = "seatwarden", version, about = "Scheduled library seat reservation with check-in protection")]
struct Cli {
    /// Config file (TOML, or JSON when the name ends in `.json`).
    /// Falls back to SEATWARDEN_CONFIG, then ~/.seatwarden/seatwarden.toml.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reserve every day at the configured time (default).
    Run,
    /// Make one reservation run right now.
    Reserve,
    /// Print the current reservation state.
    Status,
    /// Print the time left to check in.
    Countdown,
    /// Cancel the current reservation.
    Cancel,
    /// Only run the auto-cancel watchdog.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seatwarden=info,seatwarden_scheduler=info,seatwarden_client=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > SEATWARDEN_CONFIG env > ~/.seatwarden/seatwarden.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("SEATWARDEN_CONFIG").ok());
    let config = AppConfig::load(config_path.as_deref()).context("loading configuration")?;

    let client = Arc::new(build_client(&config)?);

    // An expired session is fatal: nothing gets scheduled.
    match client.nickname().await {
        Ok(name) => info!("welcome, {name}"),
        Err(ClientError::AuthExpired) => {
            error!("session expired; obtain a fresh sessid");
            anyhow::bail!(ClientError::AuthExpired);
        }
        Err(e) => return Err(e).context("checking session"),
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_daily(&config, client).await,
        Command::Reserve => {
            let retry = RetryScheduler::new(client);
            let outcome = retry.run(&request(&config), config.attempt_budget()).await;
            if outcome.success {
                info!("seat reserved");
            } else {
                warn!(reason = outcome.message.as_deref().unwrap_or("unknown"), "reservation failed");
            }
            Ok(())
        }
        Command::Status => {
            let state = client.status().await?;
            info!(%state, "current reservation state");
            Ok(())
        }
        Command::Countdown => {
            let secs = client.countdown().await?;
            if secs >= 0 {
                info!(countdown_secs = secs, "check in within {}", format_countdown(secs));
            } else {
                info!("no active check-in deadline");
            }
            Ok(())
        }
        Command::Cancel => {
            let outcome = client.cancel().await?;
            if outcome.success {
                info!("reservation cancelled");
            } else {
                warn!(reason = outcome.message.as_deref().unwrap_or("state still not idle"), "cancellation failed, try again");
            }
            Ok(())
        }
        Command::Watch => watch_only(&config, client).await,
    }
}

fn build_client(config: &AppConfig) -> anyhow::Result<Client> {
    let session = HttpSession::new(
        &config.sessid,
        &config.http.user_agent,
        Duration::from_millis(config.http.timeout_ms),
    )?;
    Ok(LibraryClient::new(
        Arc::new(session),
        Endpoints::new(&config.http.base_url),
        SandboxedCaller::new(Duration::from_millis(config.sandbox.time_limit_ms)),
        config.offset()?,
    ))
}

fn request(config: &AppConfig) -> ReservationRequest {
    ReservationRequest::new(config.room_id.clone(), config.seat_no.clone())
}

async fn run_daily(config: &AppConfig, client: Arc<Client>) -> anyhow::Result<()> {
    let state = client.status().await?;
    info!(%state, "current reservation state");

    let watchdog = config.auto_cancel.then(|| {
        Arc::new(CheckInWatchdog::new(
            Arc::clone(&client) as _,
            config.watchdog_config(),
        ))
    });

    let trigger = CronTrigger::new(
        config.fire_time()?,
        config.offset()?,
        request(config),
        config.attempt_budget(),
        RetryScheduler::new(Arc::clone(&client) as _),
        watchdog.clone(),
    );

    // spawn the trigger loop; Ctrl-C stops it and the watchdog
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let trigger_task = tokio::spawn(async move { trigger.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    if let Some(watchdog) = watchdog {
        watchdog.disable().await;
    }
    trigger_task.await?;
    Ok(())
}

async fn watch_only(config: &AppConfig, client: Arc<Client>) -> anyhow::Result<()> {
    let watchdog = CheckInWatchdog::new(client, config.watchdog_config());
    if watchdog.enable().await? == WatchdogState::Inactive {
        return Ok(());
    }

    let finished = async {
        while watchdog.state().await == WatchdogState::Active {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    };
    tokio::select! {
        _ = finished => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    watchdog.disable().await;
    Ok(())
}
