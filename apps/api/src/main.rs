mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod notify;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod voice;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::RedisCache;
use crate::config::Config;
use crate::db::create_pool;
use crate::interview::service::ServiceSettings;
use crate::interview::InterviewService;
use crate::llm_client::LlmClient;
use crate::notify::ResendClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;
use crate::voice::sdk::VoiceSettings;
use crate::voice::VoiceSessions;

const VOICE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, config.database_max_connections).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize Redis
    let cache = Arc::new(
        RedisCache::connect(&config.redis_url)
            .await
            .context("Failed to connect to Redis")?,
    );

    // Initialize LLM client
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        Duration::from_secs(config.generation_timeout_secs),
    )
    .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    // Initialize email notifications
    let notifier = Arc::new(ResendClient::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));

    let interviewer = Arc::new(InterviewService::new(
        store,
        cache,
        Arc::new(llm),
        notifier,
        ServiceSettings {
            app_url: config.app_url.clone(),
            cache_ttl_secs: config.assessment_cache_ttl_secs,
        },
    ));

    let voice_settings = VoiceSettings::from_config(&config);
    info!(
        "Voice sessions use {}",
        match &voice_settings.assistant_id {
            Some(id) => format!("assistant {id}"),
            None => "the inline interviewer model".to_string(),
        }
    );

    let voice = Arc::new(VoiceSessions::new(
        voice_settings,
        Duration::from_secs(config.voice_session_ttl_secs),
    ));
    voice.spawn_sweeper(VOICE_SWEEP_INTERVAL);

    // Build app state
    let state = AppState { interviewer, voice };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
