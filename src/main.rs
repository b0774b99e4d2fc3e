use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mastery_advisor::{
    cli::{execute_command, Commands},
    config::{Config, LogFormat},
    langbase::LangbaseClient,
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

/// Mastery tracking and next-topic recommendations over MCP.
#[derive(Parser, Debug)]
#[command(name = "mastery-advisor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Mastery advisor starting..."
    );

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize Langbase client
    let langbase =
        match LangbaseClient::new(&config.langbase, &config.pipes, config.request.clone()) {
            Ok(c) => {
                info!(base_url = %config.langbase.base_url, "Langbase client initialized");
                c
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize Langbase client");
                return Err(e.into());
            }
        };

    let state = Arc::new(AppState::new(config, storage, langbase));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state).await,
        command => {
            let result = execute_command(command, &state).await;
            if result.exit_code == 0 {
                println!("{}", result.message);
            } else {
                eprintln!("{}", result.message);
            }
            std::process::exit(result.exit_code);
        }
    }
}

async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    // Provisioning failures are not fatal.
    if state.langbase.is_configured() {
        info!(pipe = %state.config.pipes.advisor, "Ensuring advisor pipe exists...");
        if let Err(e) = state.langbase.ensure_advisor_pipe().await {
            warn!(error = %e, "Failed to ensure advisor pipe exists");
        }
    } else {
        warn!("LANGBASE_API_KEY not set, recommendations will use the fallback");
    }

    let server = McpServer::new(Arc::clone(&state));

    info!("Server ready, waiting for requests on stdin...");

    let result = server.run().await;
    state.storage.pool().close().await;

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
