//! SQL Gateway - token-addressed MySQL sessions over HTTP.

use std::sync::Arc;

use anyhow::Context;
use sql_gateway::auth::CredentialCodec;
use sql_gateway::cli::Cli;
use sql_gateway::config::Config;
use sql_gateway::db::{Connector, MockDatabase, MySqlConnector};
use sql_gateway::logging::init_logging;
use sql_gateway::server::{router, GatewayState};
use sql_gateway::session::{spawn_reaper, SessionRegistry};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let config = load_config(&cli)?;

    init_logging(&config.logging.level);
    info!(
        listen = %config.server.listen,
        token_ttl_hours = config.auth.token_ttl_hours,
        enforce_expiry = config.auth.enforce_expiry,
        mock_db = cli.mock_db,
        "Starting SQL gateway"
    );

    let connector: Arc<dyn Connector> = if cli.mock_db {
        warn!("Serving sessions from the in-memory mock database");
        Arc::new(MockDatabase::demo())
    } else {
        Arc::new(MySqlConnector::new(
            config.sessions.connect_timeout(),
            config.sessions.statement_timeout(),
        ))
    };
    let registry = Arc::new(SessionRegistry::new(connector));

    let secret = config
        .auth
        .secret
        .as_deref()
        .context("auth.secret must be set")?;
    let codec = CredentialCodec::new(
        secret,
        config.auth.token_ttl(),
        config.auth.enforce_expiry,
    );

    let reaper = config.sessions.idle_timeout().map(|max_idle| {
        info!(?max_idle, "Idle session reaper enabled");
        spawn_reaper(
            registry.clone(),
            max_idle,
            config.sessions.reap_interval(),
        )
    });

    let state = GatewayState::new(registry.clone(), codec, &config.downloads);
    let app = router(state);

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!("HTTP server listening on {}", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    if let Some(reaper) = reaper {
        reaper.abort();
    }
    registry.close_all().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves configuration with precedence CLI > environment > file > defaults.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)
        .with_context(|| format!("Loading config from {}", config_path.display()))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
