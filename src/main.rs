use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hyperdag_gateway::auth::ApiKeyStore;
use hyperdag_gateway::config::Args;
use hyperdag_gateway::grants::GrantCatalog;
use hyperdag_gateway::rate_limit::RateLimiter;
use hyperdag_gateway::state::AppState;
use hyperdag_gateway::{router, sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hyperdag_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting hyperdag-gateway v{}", env!("CARGO_PKG_VERSION"));

    let keys = ApiKeyStore::new();
    if let Some(path) = &args.keys_file {
        let count = keys.load_file(path)?;
        info!("loaded {} api keys from {}", count, path.display());
    }
    if args.dev_keys {
        for (raw, record) in keys.seed_dev() {
            info!("seeded dev key {} ({}): {}", record.id, record.name, raw);
        }
    }
    if keys.is_empty() {
        warn!("no api keys configured, every /api/v1 request will get 401");
    }

    let grants = match &args.grants_file {
        Some(path) => {
            let catalog = GrantCatalog::from_file(path)?;
            info!("loaded {} grants from {}", catalog.len(), path.display());
            catalog
        }
        None => GrantCatalog::seed(),
    };

    let state = Arc::new(AppState {
        keys,
        limiter: RateLimiter::new(args.fail_open),
        grants,
    });

    // background sweep of expired quota entries
    let sweep_state = state.clone();
    let sweep_interval = Duration::from_secs(args.sweep_interval);
    tokio::spawn(async move {
        sweeper::run(sweep_state, sweep_interval).await;
    });

    let app = router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("gateway listening on http://{}", addr);
    info!(
        "rate limiting: tiered per key, fail-open: {}, sweep every {}s",
        args.fail_open, args.sweep_interval
    );
    axum::serve(listener, app).await?;
    Ok(())
}
