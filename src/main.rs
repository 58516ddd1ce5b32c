//! League season engine binary entrypoint wiring configuration, storage and the REST layer.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use league_season_engine::{
    config::AppConfig,
    dao::league_store::memory::MemoryLeagueStore,
    routes,
    services::bootstrap_service,
    state::{AppState, SharedState},
};

const STORE_ENV: &str = "LEAGUE_ENGINE_STORE";
const BOOTSTRAP_RETRY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    if config.trigger_secret().is_none() {
        warn!("no trigger secret configured; cron endpoints will reject every request");
    }
    let app_state = AppState::new(config);

    match StoreBackend::from_env()? {
        StoreBackend::Memory => {
            info!("using in-memory league store; data is lost on restart");
            app_state
                .set_league_store(Arc::new(MemoryLeagueStore::new()))
                .await;
        }
        StoreBackend::Mongo => spawn_mongo_supervisor(app_state.clone()),
    }

    tokio::spawn(bootstrap_when_ready(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Storage backend selected through [`STORE_ENV`].
enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    fn from_env() -> anyhow::Result<Self> {
        match env::var(STORE_ENV).as_deref() {
            Err(_) | Ok("mongo") => Ok(Self::Mongo),
            Ok("memory") => Ok(Self::Memory),
            Ok(other) => {
                anyhow::bail!("unknown {STORE_ENV} value `{other}` (expected `mongo` or `memory`)")
            }
        }
    }
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) {
    use league_season_engine::dao::{
        league_store::{
            LeagueStore,
            mongodb::{MongoConfig, MongoLeagueStore},
        },
        storage::StorageError,
    };
    use league_season_engine::services::storage_supervisor;

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoLeagueStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn LeagueStore>)
        }
    }));
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: SharedState) {
    warn!("built without the `mongo-store` feature; staying in degraded mode");
}

/// Create missing tier leagues as soon as storage is available.
async fn bootstrap_when_ready(state: SharedState) {
    let mut degraded = state.degraded_watcher();
    loop {
        let is_degraded = *degraded.borrow_and_update();
        if !is_degraded {
            match bootstrap_service::ensure_tier_leagues(&state).await {
                Ok(created) => {
                    info!(created, "tier leagues ready");
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "failed to bootstrap tier leagues; retrying");
                    sleep(BOOTSTRAP_RETRY).await;
                    continue;
                }
            }
        }
        if degraded.changed().await.is_err() {
            return;
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
