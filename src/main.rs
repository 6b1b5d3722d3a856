use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slidegate::config::{LogFormat, LoggingConfig, SlidegateConfig, StoreBackend};
use slidegate::grpc::GrpcServer;
use slidegate::ratelimit::{RateLimitRules, RateLimiter};
use slidegate::store::{CounterStore, MemoryStore, RedisStore};

#[derive(Parser, Debug)]
#[command(name = "slidegate", version, about = "Sliding-window rate limiting service")]
struct Cli {
    /// Configuration file (YAML or TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gRPC decision service
    Serve {
        /// Override the configured gRPC listen address
        #[arg(long)]
        grpc_addr: Option<SocketAddr>,
    },
    /// Evaluate a single request and print the outcome as JSON
    Check {
        #[arg(long)]
        scope: String,
        #[arg(long)]
        identity: String,
        /// Requests per second; falls back to the configured rules
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long, default_value_t = 1)]
        increment: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = SlidegateConfig::load(cli.config.as_deref())?;

    init_tracing(&config.logging);

    info!("Starting Slidegate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let rate_limiter = Arc::new(build_rate_limiter(&config).await?);

    match cli.command {
        Command::Serve { grpc_addr } => {
            let addr = grpc_addr.unwrap_or(config.server.grpc_addr);
            let grpc_server = GrpcServer::new(addr, rate_limiter);

            grpc_server.serve_with_shutdown(shutdown_signal()).await?;

            info!("Slidegate stopped");
        }
        Command::Check {
            scope,
            identity,
            limit,
            increment,
        } => {
            let outcome = rate_limiter.check(&scope, &identity, limit, increment).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn build_rate_limiter(config: &SlidegateConfig) -> anyhow::Result<RateLimiter> {
    let store: Arc<dyn CounterStore> = match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory counter store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.store.redis_url).await?),
    };

    let rules = match &config.rate_limiting.rules_path {
        Some(path) => RateLimitRules::from_file(path)?,
        None => RateLimitRules::new(),
    };
    info!(
        scopes = rules.scopes.len(),
        namespace = %config.store.namespace,
        default_limit = config.rate_limiting.default_limit_per_second,
        "Rate limiter initialized"
    );

    Ok(RateLimiter::new(store)
        .with_namespace(config.store.namespace.clone())
        .with_default_limit(config.rate_limiting.default_limit_per_second)
        .with_rules(rules))
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
