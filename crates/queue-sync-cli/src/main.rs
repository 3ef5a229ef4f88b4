use queue_sync_cli::run_cli;
use tracing::error;

#[tokio::main]
async fn main() {
    // Run CLI and handle errors
    if let Err(e) = run_cli().await {
        error!("CLI error: {}", e);

        // Exit with appropriate code based on error type
        let exit_code = match e {
            queue_sync_cli::CliError::Configuration(_) => 1,
            queue_sync_cli::CliError::Transport(_) => 2,
            queue_sync_cli::CliError::CommandFailed { .. } => 3,
            queue_sync_cli::CliError::InvalidArgument { .. } => 4,
            queue_sync_cli::CliError::Io(_) => 5,
            queue_sync_cli::CliError::Render { .. } => 6,
        };

        std::process::exit(exit_code);
    }
}
