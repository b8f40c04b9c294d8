//! storyATL relay server
//!
//! Serves the persona relay endpoints the story's live chat posts to.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyatl::config::{Config, PersonaRegistry};
use storyatl::core::RelayEngine;
use storyatl::providers::openai_compat::{OpenAICompatConfig, OpenAICompatProvider};
use storyatl::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyatl=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    if config.credential().is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; relay endpoints will answer 503");
    }

    // Prompts are assembled once and reused for every request
    let personas = PersonaRegistry::builtin()?;
    tracing::info!("Assembled {} persona prompt(s)", personas.len());

    let provider = OpenAICompatProvider::new(OpenAICompatConfig::from_config(&config))?;
    let relay = Arc::new(RelayEngine::new(config, personas, Arc::new(provider)));

    let state = AppState { relay };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("storyATL relay running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
