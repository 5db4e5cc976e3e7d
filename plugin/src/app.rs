use crate::config::PluginConfig;
use crate::connection::connect;
use crate::error::PluginError;
use crate::launch::LaunchArgs;
use crate::plugin::Plugin;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub fn run() -> ExitCode {
    // Load environment variables from a .env file next to the plugin
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match LaunchArgs::parse_from_host(std::env::args()) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(args, PluginConfig::from_env())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Plugin stopped with an error");
            ExitCode::FAILURE
        }
    }
}

/// Connect to the host and process events until the connection closes
pub async fn serve(args: LaunchArgs, config: PluginConfig) -> Result<(), PluginError> {
    let host = args.host_info();
    info!(
        host_version = %host.application.version,
        platform = %host.application.platform,
        plugin_version = %host.plugin.version,
        devices = host.devices.len(),
        "Starting web query plugin"
    );
    info!(config = ?config, "Plugin config loaded");

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (plugin, internal_rx) = Plugin::new(config, command_tx)?;

    // Create cancellation token for graceful shutdown
    let shutdown = CancellationToken::new();
    let events = connect(
        args.port,
        &args.plugin_uuid,
        &args.register_event,
        command_rx,
        shutdown.clone(),
    )
    .await?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, initiating graceful shutdown");
            signal_token.cancel();
        }
    });

    plugin.run(internal_rx, events, shutdown).await;
    Ok(())
}
