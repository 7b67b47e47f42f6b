//! Gateway server setup
//!
//! Provides the WebSocket endpoint, the inbound invocation endpoint and the
//! wiring between configuration and the lobby core.

mod handler;
mod state;

pub use handler::{ws_handler, DISCONNECT_REASON};
pub use state::GatewayState;

use axum::{
    routing::{get, post},
    Router,
};
use lobby_cache::{RedisChannelStore, RedisPool};
use lobby_common::{AppConfig, AppError, SchedulerKind, StoreBackend};
use lobby_core::{
    BufferedConfig, BufferedScheduler, ChannelService, ChannelStore, DirectScheduler, MemoryStore,
    PushHandler, PushScheduler, ServerDirectory, SessionRegistry, SessionRegistryConfig,
    StaticDirectory,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::rpc::{rpc_handler, HttpRemoteInvoker, RPC_PATH};

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route(RPC_PATH, post(rpc_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn create_store(config: &AppConfig) -> Result<Option<Arc<dyn ChannelStore>>, AppError> {
    match config.channel.store {
        StoreBackend::None => Ok(None),
        StoreBackend::Memory => Ok(Some(Arc::new(MemoryStore::new()))),
        StoreBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .ok_or_else(|| AppError::Config("CHANNEL_STORE=redis requires REDIS_URL".into()))?;
            tracing::info!("Connecting to Redis...");
            let pool = RedisPool::from_config(redis).map_err(|e| AppError::Cache(e.to_string()))?;
            // Unreachable Redis surfaces in the restore report
            match pool.health_check().await {
                Ok(()) => tracing::info!("Redis connection established"),
                Err(e) => tracing::warn!(error = %e, "Redis is not reachable yet"),
            }
            Ok(Some(Arc::new(RedisChannelStore::new(pool))))
        }
    }
}

fn create_scheduler(config: &AppConfig, sessions: &SessionRegistry) -> Arc<dyn PushScheduler> {
    match config.push.scheduler {
        SchedulerKind::Direct => Arc::new(DirectScheduler::new(sessions.clone())),
        SchedulerKind::Buffered => Arc::new(BufferedScheduler::new(
            sessions.clone(),
            BufferedConfig {
                flush_interval: config.push.flush_interval(),
                max_batch: config.push.max_batch,
            },
        )),
    }
}

/// Wire registries, scheduler and channel service around an optional store
///
/// Must be called inside a Tokio runtime.
pub fn assemble_state(
    config: AppConfig,
    store: Option<Arc<dyn ChannelStore>>,
) -> Result<GatewayState, AppError> {
    let sessions = SessionRegistry::new(SessionRegistryConfig {
        single_session: config.session.single_session,
        ..SessionRegistryConfig::default()
    });
    let scheduler = create_scheduler(&config, &sessions);
    let push_handler = Arc::new(PushHandler::new(sessions.clone(), scheduler.clone()));

    let directory: Arc<dyn ServerDirectory> = Arc::new(StaticDirectory::new(
        config.cluster.with_local(config.server.server_info()),
    ));
    let invoker = HttpRemoteInvoker::new(directory.clone(), config.rpc.timeout())
        .map_err(|e| AppError::Server(format!("Failed to build HTTP client: {e}")))?;

    let mut builder = ChannelService::builder(config.server.id.clone())
        .prefix(config.channel.prefix.clone())
        .directory(directory)
        .local_handler(push_handler.clone())
        .invoker(Arc::new(invoker));
    if let Some(store) = store {
        builder = builder.store(store);
    }

    Ok(GatewayState::new(
        sessions,
        builder.build(),
        push_handler,
        scheduler,
        config,
    ))
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let store = create_store(&config).await?;
    assemble_state(config, store)
}

/// Run the gateway server until `shutdown` resolves
pub async fn run_server<F>(app: Router, addr: &str, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| AppError::Server(e.to_string()))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.server.address();

    let state = create_gateway_state(config).await?;
    state.start().await?;

    let app = create_app(state.clone());
    let result = run_server(app, &addr, shutdown_signal()).await;

    state.shutdown().await;
    result
}
