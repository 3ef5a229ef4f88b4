//! # Queue-Sync CLI
//!
//! Command-line interface for the queue synchronization client.
//!
//! This module provides CLI commands for:
//! - Watching a queue and printing updates as they arrive
//! - Probing transport capabilities
//! - Validating and inspecting configuration
//!
//! Command output goes to stdout; logs go to stderr so the output stays
//! machine-readable in the `json` and `yaml` formats.

use clap::{CommandFactory, Parser, Subcommand};
use queue_sync_client::{CapabilityProbe, QueueSyncClient, SyncState};
use queue_sync_core::{
    InMemoryMetrics, MetricsSnapshot, QueueEntry, QueueIdentity, SyncClientConfig, SyncMetrics,
    ValidationError,
};
use queue_sync_transport::{CapabilityReport, HttpTransport, QueueTransport, TransportError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

// ============================================================================
// CLI Structure
// ============================================================================

/// Queue-Sync CLI - Live queue views from the terminal
#[derive(Parser)]
#[command(name = "queue-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Follow remotely-managed queues over push or polling delivery")]
#[command(
    long_about = "Queue-Sync keeps a local view of a remotely-managed queue current, \
preferring push delivery and degrading to periodic polling when push is unavailable"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "QUEUE_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Watch a queue and print every update
    Watch {
        /// Identifier of the observing participant
        #[arg(short, long)]
        subject_id: String,

        /// Identifier of the queue-owning aggregate
        #[arg(short, long)]
        parent_id: String,

        /// Base URL of the queue service
        #[arg(short, long, env = "QUEUE_SYNC_ENDPOINT")]
        endpoint: String,

        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Probe the capabilities of a queue service
    Probe {
        /// Base URL of the queue service
        #[arg(short, long, env = "QUEUE_SYNC_ENDPOINT")]
        endpoint: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate configuration
    Config {
        /// Configuration file to validate
        #[arg(long)]
        file: Option<PathBuf>,

        /// Show the resolved configuration
        #[arg(short, long)]
        show: bool,

        /// Output format for configuration
        #[arg(short, long, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Output format options
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output rendering failed: {message}")]
    Render { message: String },
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Initialize logging
    initialize_logging(&cli)?;

    // Load configuration
    let config = load_configuration(cli.config.as_ref())?;

    // Execute command
    match cli.command {
        Commands::Watch {
            subject_id,
            parent_id,
            endpoint,
            duration,
            format,
        } => {
            execute_watch_command(subject_id, parent_id, endpoint, duration, format, &config).await
        }
        Commands::Probe { endpoint, format } => {
            execute_probe_command(endpoint, format, &config).await
        }
        Commands::Config { file, show, format } => {
            // The subcommand's --file wins over the global --config.
            execute_config_command(file.or(cli.config), show, format).await
        }
        Commands::Completions { shell } => execute_completions_command(shell).await,
    }
}

// ============================================================================
// Logging and Configuration
// ============================================================================

/// Initialize logging based on CLI arguments.
///
/// `RUST_LOG` takes precedence over `--log-level` when set.
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    let initialized = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    initialized.map_err(|e| CliError::CommandFailed {
        message: format!("Failed to initialize logging: {}", e),
    })
}

/// Load client configuration from files and the environment.
///
/// Sources (applied in order - later sources override earlier ones):
///  1. Built-in defaults from [`SyncClientConfig::default`]
///  2. ./queue-sync.{yaml,json,toml}, when present
///  3. The file given by `--config` / `QUEUE_SYNC_CONFIG`, which must exist
///  4. Environment variables prefixed `QUEUE_SYNC__` (double-underscore
///     separator), e.g. `QUEUE_SYNC__POLLING__INTERVAL_SECONDS=30`
pub fn load_configuration(config_path: Option<&PathBuf>) -> Result<SyncClientConfig, ConfigError> {
    let defaults = config::Config::try_from(&SyncClientConfig::default())?;

    let mut builder = config::Config::builder()
        .add_source(defaults)
        .add_source(config::File::with_name("queue-sync").required(false));

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path: path.clone() });
        }
        builder = builder.add_source(config::File::from(path.clone()).required(true));
    }

    let resolved = builder
        .add_source(config::Environment::with_prefix("QUEUE_SYNC").separator("__"))
        .build()?;

    let client_config: SyncClientConfig = resolved.try_deserialize()?;
    client_config.validate()?;

    Ok(client_config)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Execute watch command
async fn execute_watch_command(
    subject_id: String,
    parent_id: String,
    endpoint: String,
    duration: Option<u64>,
    format: OutputFormat,
    config: &SyncClientConfig,
) -> Result<(), CliError> {
    let identity = QueueIdentity::new(subject_id, parent_id);
    identity
        .validate()
        .map_err(|e| CliError::InvalidArgument {
            arg: "subject-id/parent-id".to_string(),
            message: e.to_string(),
        })?;

    let transport = build_transport(&endpoint)?;
    let metrics = Arc::new(InMemoryMetrics::new());
    let client = QueueSyncClient::new(identity, transport, config.clone(), metrics.clone());

    info!(
        queue = %client.identity(),
        endpoint = %endpoint,
        duration = ?duration,
        "Watching queue"
    );

    let mut updates = client.subscribe();
    client.start().await;

    let current = updates.borrow_and_update().clone();
    render_state(&current, &format)?;

    let follow = async {
        loop {
            if updates.changed().await.is_err() {
                break;
            }
            let state = updates.borrow_and_update().clone();
            render_state(&state, &format)?;
        }
        Ok::<(), CliError>(())
    };

    match duration {
        Some(seconds) => {
            tokio::select! {
                result = follow => result?,
                _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
                signal = tokio::signal::ctrl_c() => signal?,
            }
        }
        None => {
            tokio::select! {
                result = follow => result?,
                signal = tokio::signal::ctrl_c() => signal?,
            }
        }
    }

    client.dispose();
    render_watch_summary(&metrics.snapshot(), &format)?;

    Ok(())
}

/// Execute probe command
async fn execute_probe_command(
    endpoint: String,
    format: OutputFormat,
    config: &SyncClientConfig,
) -> Result<(), CliError> {
    info!(endpoint = %endpoint, "Probing queue service capabilities");

    let transport = build_transport(&endpoint)?;
    let probe = CapabilityProbe::from_config(transport, &config.probe);
    let report = probe.probe().await;

    render_report(&report, &format)?;

    if !report.errors.is_empty() {
        return Err(CliError::CommandFailed {
            message: format!("capability probe reported {} error(s)", report.errors.len()),
        });
    }

    Ok(())
}

/// Execute config command
async fn execute_config_command(
    file: Option<PathBuf>,
    show: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    info!(file = ?file, show = show, "Validating configuration");

    let resolved = load_configuration(file.as_ref())?;

    if show {
        render_config(&resolved, &format)?;
    } else {
        println!("Configuration is valid");
    }

    Ok(())
}

/// Execute completions command
async fn execute_completions_command(shell: clap_complete::Shell) -> Result<(), CliError> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

/// Build an HTTP transport for the given endpoint URL
fn build_transport(endpoint: &str) -> Result<Arc<dyn QueueTransport>, CliError> {
    let base_url = Url::parse(endpoint).map_err(|e| CliError::InvalidArgument {
        arg: "endpoint".to_string(),
        message: e.to_string(),
    })?;

    let transport = HttpTransport::new(base_url)?;
    Ok(Arc::new(transport))
}

// ============================================================================
// Output Rendering
// ============================================================================

/// Print one sync state update in the requested format
fn render_state(state: &SyncState, format: &OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => {
            let status = state.connection_status.as_str();
            match &state.snapshot {
                Some(snapshot) => {
                    println!(
                        "[{}] {}/{}: {} entries (updated {})",
                        status,
                        snapshot.parent_id,
                        snapshot.subject_id,
                        snapshot.len(),
                        snapshot.last_updated,
                    );
                    for entry in &snapshot.ordered_entries {
                        println!("  {}", describe_entry(entry));
                    }
                }
                None => println!("[{}] no snapshot yet", status),
            }
            if let Some(error) = &state.last_error {
                println!("  last error: {}", error);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&state_to_value(state)?).map_err(render_failure)?
            );
        }
        OutputFormat::Yaml => {
            print!(
                "{}",
                serde_yaml::to_string(&state_to_value(state)?).map_err(render_failure)?
            );
        }
    }

    Ok(())
}

/// Print a capability report in the requested format
fn render_report(report: &CapabilityReport, format: &OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => {
            println!(
                "subscriptions: {}",
                availability(report.subscriptions_available)
            );
            println!("mutations:     {}", availability(report.mutations_available));
            for error in &report.errors {
                println!("error: {}", error);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(report).map_err(render_failure)?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(report).map_err(render_failure)?);
        }
    }

    Ok(())
}

/// Print the resolved configuration in the requested format
fn render_config(config: &SyncClientConfig, format: &OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(config).map_err(render_failure)?
            );
        }
        OutputFormat::Text | OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(config).map_err(render_failure)?);
        }
    }

    Ok(())
}

/// Print the session metrics recorded while watching
fn render_watch_summary(snapshot: &MetricsSnapshot, format: &OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => {
            println!(
                "session summary: {} connection attempt(s), {} established, \
{} fallback activation(s), {} update(s) delivered",
                snapshot.connection_attempts,
                snapshot.connection_successes,
                snapshot.fallback_activations,
                snapshot.notifications_delivered,
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(snapshot).map_err(render_failure)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(snapshot).map_err(render_failure)?);
        }
    }

    Ok(())
}

/// Serializable view of a sync state update
fn state_to_value(state: &SyncState) -> Result<serde_json::Value, CliError> {
    let snapshot = state
        .snapshot
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(render_failure)?;

    Ok(serde_json::json!({
        "connectionStatus": state.connection_status,
        "snapshot": snapshot,
        "lastError": state.last_error.as_ref().map(|e| e.to_string()),
    }))
}

/// One-line description of a queue entry
fn describe_entry(entry: &QueueEntry) -> String {
    let position = entry
        .position
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut line = format!("{:>3}. {}", position, entry.entry_id);
    if let Some(status) = &entry.status {
        line.push_str(&format!(" [{}]", status));
    }
    if let Some(title) = &entry.title {
        line.push_str(&format!(" {}", title));
    }
    if let Some(owner) = &entry.owner {
        line.push_str(&format!(" ({})", owner));
    }
    line
}

fn availability(available: bool) -> &'static str {
    if available {
        "available"
    } else {
        "unavailable"
    }
}

fn render_failure(error: impl std::fmt::Display) -> CliError {
    CliError::Render {
        message: error.to_string(),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
