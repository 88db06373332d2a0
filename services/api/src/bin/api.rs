//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CachedLinkFinder, OpenAiGateway, PdfTextExtractor, WebSolutionLinkFinder},
    config::Config,
    error::ApiError,
    web::{router, state::AppState, ApiDoc, SessionRegistry},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());
    if let Some(base_url) = &config.llm_base_url {
        info!("Using LLM endpoint {}", base_url);
        openai_config = openai_config.with_api_base(base_url.clone());
    }
    let openai_client = Client::with_config(openai_config);

    let llm = Arc::new(OpenAiGateway::new(
        openai_client,
        config.chat_model.clone(),
        config.quiz_model.clone(),
        config.exam_name.clone(),
    ));
    let extractor = Arc::new(PdfTextExtractor::new());
    let web_finder =
        WebSolutionLinkFinder::new(config.link_lookup_timeout, config.exam_name.clone())
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let link_finder = Arc::new(CachedLinkFinder::new(web_finder, config.solution_cache_ttl));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        llm,
        extractor,
        link_finder,
        sessions: SessionRegistry::new(config.session_idle_ttl),
    });

    let cors = match &config.cors_origin {
        Some(origin) => {
            let origin = origin.parse::<HeaderValue>().map_err(|_| {
                ApiError::Internal(format!("Invalid CORS_ORIGIN value: '{}'", origin))
            })?;
            CorsLayer::new().allow_origin(origin)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
    .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
