use adapter::{
    document::{
        google::GoogleDocumentStoreFactory,
        memory::{InMemoryDocumentStore, InMemoryDocumentStoreFactory},
    },
    oauth::GoogleOAuthClient,
    persistence::{self, DurableStore},
    repository::{session::spawn_reaper, shop::ShopRepositoryImpl},
};
use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use kernel::repository::{document::DocumentStoreFactory, shop::ShopRepository};
use registry::AppRegistry;
use shared::config::{AppConfig, DocumentStoreKind};
use shared::env::{which, Environment};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

fn cors_layer(frontend_url: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = frontend_url
        .parse()
        .with_context(|| format!("invalid FRONTEND_URL: {frontend_url}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;

    let store = DurableStore::new(app_config.storage.data_dir.clone());
    let snapshot = store.load().context("failed to load persisted shops")?;

    let (save_requests, save_rx) = persistence::save_channel();
    let shops: Arc<dyn ShopRepository> = Arc::new(
        ShopRepositoryImpl::new(app_config.auth.employer_emails.clone(), snapshot)
            .with_save_notifier(save_requests),
    );
    let writer = persistence::spawn_writer(store, shops.clone(), save_rx);

    let http = reqwest::Client::new();
    let documents: Arc<dyn DocumentStoreFactory> = match app_config.storage.document_store {
        DocumentStoreKind::Google => Arc::new(GoogleDocumentStoreFactory::new(http.clone())),
        DocumentStoreKind::Memory => {
            tracing::warn!("using the in-process document store; documents are not persisted");
            Arc::new(InMemoryDocumentStoreFactory::new(InMemoryDocumentStore::new()))
        }
    };
    let identity = Arc::new(GoogleOAuthClient::new(http, app_config.oauth.clone()));

    let cors = cors_layer(&app_config.server.frontend_url)?;
    let request_timeout = app_config.server.request_timeout;
    let reap_interval = app_config.auth.session_reap_interval;
    let port = app_config.server.port;

    let registry = AppRegistry::new(app_config, shops.clone(), documents, identity);
    let reaper = spawn_reaper(registry.session_repository(), reap_interval);

    let app = api::route::routes()
        .layer(cors)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(registry);

    let addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Unexpected error happened in server")
        .inspect_err(|e| {
            tracing::error!(
                error.cause_chain = ?e,error.message = %e, "Unexpected error"
            )
        });

    reaper.abort();
    writer
        .shutdown()
        .await
        .context("failed to persist shops on shutdown")?;
    tracing::info!("registry flushed");

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error.message = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
