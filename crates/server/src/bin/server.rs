//! `gateway-server`: the HTTP surface entrypoint (C9). Loads config,
//! builds the boot-time registries and `GatewayContext`, starts the C8
//! catalog refresh scheduler, and binds the HTTP listener.

use clap::Parser;
use gateway_core::{BackendRegistry, GatewayContext, PrincipalMap, ToolRegistry};
use gateway_llm::{Connector, HighAvailabilityStrategy};
use gateway_orchestrator::OrchestratorConfig;
use gateway_server::state::AppState;
use gateway_tasks::{share_receiver, InProcessTaskQueue, TaskStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "gateway-server", about = "LLM API gateway HTTP server")]
struct Args {
    /// Path to a config file (TOML/YAML/JSON); env vars always override.
    #[arg(long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory to write rotated log files into, in addition to stdout.
    #[arg(long, env = "GATEWAY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = gateway_config::load(args.config.as_deref())?;

    let _log_guard = init_logging(args.log_dir.or_else(|| settings.log_dir.clone().map(PathBuf::from)), args.verbose);

    // gateway_config::load already ran GatewaySettings::validate.
    let backends = BackendRegistry::new(settings.llm_backends.clone())?;
    let tools = ToolRegistry::new(settings.available_tools.clone());
    let principals = PrincipalMap::new(settings.users.clone());
    let http_client = reqwest::Client::new();
    let context = GatewayContext::new(backends, tools, principals, http_client);

    let ha_strategy = match settings.high_availability_strategy {
        gateway_config::HighAvailabilityStrategy::None => HighAvailabilityStrategy::None,
        gateway_config::HighAvailabilityStrategy::Failover => HighAvailabilityStrategy::Failover,
    };
    let connector = Arc::new(Connector::new(
        context.http_client.clone(),
        context.backends.clone(),
        ha_strategy,
        Duration::from_secs(settings.llm_backend_timeout_seconds),
    ));

    let store = Arc::new(TaskStore::new(Duration::from_secs(settings.task_retention_seconds)));
    let (queue, receiver) = InProcessTaskQueue::new(Arc::clone(&store), 1024);
    gateway_tasks::spawn_pool(share_receiver(receiver), store, settings.worker_count);

    gateway_orchestrator::refresh_catalog(&connector, &context.backends, &context.catalog).await;
    let _refresh_handle = gateway_tasks::schedule_periodic(
        Duration::from_secs(settings.llm_cache_update_interval_minutes * 60),
        {
            let connector = Arc::clone(&connector);
            let context = context.clone();
            move || {
                let connector = Arc::clone(&connector);
                let context = context.clone();
                async move {
                    gateway_orchestrator::refresh_catalog(&connector, &context.backends, &context.catalog).await;
                }
            }
        },
    );

    let orchestrator_config = Arc::new(AppState::orchestrator_config_from(&settings));
    let metrics_handle = gateway_server::init_metrics();

    let state = AppState {
        context,
        connector,
        queue: Arc::new(queue),
        settings: Arc::new(settings.clone()),
        orchestrator_config,
        rate_limiters: Arc::new(dashmap::DashMap::new()),
        metrics_handle,
    };

    let app = gateway_server::create_router(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    tracing::info!(address = %settings.bind_address, "gateway-server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(log_dir: Option<PathBuf>, verbose: u8) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "gateway-server.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init();
            None
        }
    }
}
