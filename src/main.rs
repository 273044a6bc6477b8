//! videohub-emu - Blackmagic Videohub control-protocol emulator
//!
//! Serves the Videohub text protocol over TCP and keeps every connected
//! control client synchronized with the shared routing/label/lock state.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use videohub_emu::{DeviceType, HubEvent, ServerConfig, VideoHubServer};

/// Videohub Emulator - crosspoint router control server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "VIDEOHUB_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Listen port
    #[arg(short, long, env = "VIDEOHUB_PORT", default_value = "9990")]
    port: u16,

    /// Number of video inputs
    #[arg(long, default_value = "40")]
    inputs: usize,

    /// Number of video outputs
    #[arg(long, default_value = "40")]
    outputs: usize,

    /// Device type to emulate
    #[arg(long, value_enum, default_value = "videohub-server")]
    device_type: DeviceType,

    /// Friendly name (defaults to the model name)
    #[arg(long, env = "VIDEOHUB_NAME")]
    name: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Videohub emulator...");
    info!(
        "Device: {} ({}x{})",
        args.device_type.model_name(),
        args.inputs,
        args.outputs
    );

    let config = ServerConfig {
        device_type: args.device_type,
        input_count: args.inputs,
        output_count: args.outputs,
        bind: args.bind,
        port: args.port,
        friendly_name: args.name,
        host_id: None,
    };

    let handle = VideoHubServer::start(config).await?;
    info!("Listening on {}", handle.local_addr());

    // Log every committed change; a hosting application would hook real
    // hardware or an interlock in here instead.
    let _ = handle
        .subscribe(|event: &HubEvent| match event {
            HubEvent::NameChanged { new, old } => {
                info!(%new, %old, "Friendly name changed");
            }
            HubEvent::RoutingChanged {
                output,
                new_input,
                old_input,
            } => {
                info!(output, new_input, old_input, "Routing changed");
            }
            HubEvent::LabelChanged { kind, index, new, .. } => {
                info!(?kind, index, label = new.as_str(), "Label changed");
            }
            HubEvent::LockChanged { output, locked } => {
                info!(output, locked, "Lock changed");
            }
        })
        .await;

    shutdown_signal().await;

    handle.stop();
    info!("Videohub emulator shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
