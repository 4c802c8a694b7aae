//! Family Guard monitor - the child-device agent.
//!
//! This is the entry point for the `family-guard-monitor` binary.

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use domain::models::alert::TamperAlertRequest;
use domain::models::pairing_code::LinkDeviceRequest;
use domain::models::TamperKind;
use family_guard_monitor::app_labels::{AppLabels, CommandAppLabels};
use family_guard_monitor::binding::{BindingStore, DeviceBinding};
use family_guard_monitor::block_screen::{BlockScreen, CommandBlockScreen, LoggingBlockScreen};
use family_guard_monitor::config::{ForegroundStrategy, MonitorConfig};
use family_guard_monitor::foreground::{
    FocusedWindowForeground, ForegroundSource, UsageStatsForeground,
};
use family_guard_monitor::logging::init_logging;
use family_guard_monitor::monitor::UsageMonitor;
use family_guard_monitor::remote::{ApiClient, PolicyRemote};
use family_guard_monitor::usage_stats::{
    aggregate_foreground_time, DumpsysUsageStats, UsageStatsProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use validator::Validate;

/// Family Guard monitor - enforces parental rules on this device.
#[derive(Parser, Debug)]
#[command(name = "family-guard-monitor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to config/monitor.toml when present).
    #[arg(long, global = true, env = "FGM_CONFIG")]
    config: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the fast and slow monitoring loops until interrupted.
    Run,

    /// Link this device to a parent account with a pairing code.
    Link {
        /// Six-digit pairing code shown on the parent device.
        #[arg(long)]
        code: String,

        /// Name shown to the parent for this device.
        #[arg(long)]
        device_name: String,

        #[arg(long)]
        device_model: Option<String>,

        /// Confirms that monitoring consent was given on this device.
        #[arg(long)]
        accept_consent: bool,
    },

    /// Report tampering to the parent.
    TamperAlert {
        /// device_admin_disabled, usage_access_revoked or uninstall_attempt
        #[arg(long)]
        kind: TamperKind,

        #[arg(long)]
        detail: Option<String>,
    },

    /// Print per-app foreground time over the usage lookback window.
    Usage,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config =
        MonitorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging, args.verbose).context("Failed to initialize logging")?;

    match args.command {
        Command::Run => run(&config).await,
        Command::Link {
            code,
            device_name,
            device_model,
            accept_consent,
        } => {
            link(
                &config,
                LinkDeviceRequest {
                    code,
                    device_name,
                    device_model,
                    consent_accepted: accept_consent,
                },
            )
            .await
        }
        Command::TamperAlert { kind, detail } => tamper_alert(&config, kind, detail).await,
        Command::Usage => usage(&config).await,
    }
}

fn command_timeout(config: &MonitorConfig) -> Duration {
    Duration::from_millis(config.device.command_timeout_ms)
}

fn usage_stats_provider(config: &MonitorConfig) -> Arc<dyn UsageStatsProvider> {
    Arc::new(DumpsysUsageStats::new(
        config.device.usage_stats_command.clone(),
        command_timeout(config),
    ))
}

fn authed_client(config: &MonitorConfig) -> anyhow::Result<(ApiClient, DeviceBinding)> {
    let binding = BindingStore::new(&config.device.binding_path).require()?;
    let client = ApiClient::new(
        config.api.base_url.clone(),
        Duration::from_millis(config.api.timeout_ms),
    )?
    .with_device_token(binding.device_token.clone());
    Ok((client, binding))
}

async fn run(config: &MonitorConfig) -> anyhow::Result<()> {
    let (client, binding) = authed_client(config)?;
    let remote: Arc<dyn PolicyRemote> = Arc::new(client);
    let usage_stats = usage_stats_provider(config);

    let foreground: Arc<dyn ForegroundSource> = match config.device.foreground_strategy {
        ForegroundStrategy::UsageStats => Arc::new(UsageStatsForeground::new(
            usage_stats.clone(),
            config.loops.foreground_window(),
        )),
        ForegroundStrategy::FocusedWindow => Arc::new(FocusedWindowForeground::new(
            config.device.focused_window_command.clone(),
            command_timeout(config),
        )),
    };

    let block_screen: Arc<dyn BlockScreen> = match &config.device.block_screen_command {
        Some(template) => Arc::new(CommandBlockScreen::new(
            template.clone(),
            command_timeout(config),
        )),
        None => Arc::new(LoggingBlockScreen),
    };

    let labels = Arc::new(match &config.device.app_label_command {
        Some(template) => AppLabels::new(Arc::new(CommandAppLabels::new(
            template.clone(),
            command_timeout(config),
        ))),
        None => AppLabels::disabled(),
    });

    info!(
        child_id = %binding.child_id,
        api = %config.api.base_url,
        strategy = ?config.device.foreground_strategy,
        "Starting Family Guard monitor"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = UsageMonitor::new(
        &config.loops,
        foreground,
        usage_stats,
        remote,
        block_screen,
        labels,
    )
    .spawn(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Monitor loop panicked");
        }
    }

    info!("Monitor stopped");
    Ok(())
}

async fn link(config: &MonitorConfig, request: LinkDeviceRequest) -> anyhow::Result<()> {
    if !request.consent_accepted {
        anyhow::bail!("Monitoring consent is required; pass --accept-consent");
    }
    request.validate()?;

    let store = BindingStore::new(&config.device.binding_path);
    if let Some(existing) = store.load()? {
        tracing::warn!(child_id = %existing.child_id, "Replacing existing binding");
    }

    let client = ApiClient::new(
        config.api.base_url.clone(),
        Duration::from_millis(config.api.timeout_ms),
    )?;
    let response = client
        .link_device(&request)
        .await
        .context("Linking failed")?;

    store.save(&DeviceBinding {
        parent_id: response.parent_id,
        child_id: response.child_id,
        device_token: response.device_token,
        linked_at: response.linked_at,
    })?;

    info!(child_id = %response.child_id, path = %store.path().display(), "Device linked");
    println!("Linked as child {}", response.child_id);
    Ok(())
}

async fn tamper_alert(
    config: &MonitorConfig,
    kind: TamperKind,
    detail: Option<String>,
) -> anyhow::Result<()> {
    let (client, _) = authed_client(config)?;
    let request = TamperAlertRequest {
        kind,
        detail,
        occurred_at: Utc::now(),
    };
    request.validate()?;

    let response = client.tamper_alert(&request).await?;
    println!(
        "Tamper alert sent ({})",
        if response.notified {
            "parent notified"
        } else {
            "parent not notified"
        }
    );
    Ok(())
}

async fn usage(config: &MonitorConfig) -> anyhow::Result<()> {
    let now = Local::now().naive_local();
    let since = now - config.loops.usage_lookback();
    let events = usage_stats_provider(config).events(since, now).await?;

    for app in aggregate_foreground_time(&events, since, now) {
        println!(
            "{:<50} {:>6} min",
            app.package_name,
            app.duration_ms / 60_000
        );
    }
    Ok(())
}
