mod batch;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod ranking;
mod routes;
mod source;
mod state;
mod store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::batch::controller::{BatchController, Extractors};
use crate::config::{Config, S3Settings};
use crate::db::create_pool;
use crate::extraction::{DirectSkillExtractor, LlmSkillExtractor};
use crate::llm_client::LlmClient;
use crate::ranking::justification::LlmJustifier;
use crate::ranking::similarity::LlmSimilarityService;
use crate::ranking::TalentRankingEngine;
use crate::routes::build_router;
use crate::source::FeedReader;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skills API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let store = Arc::new(PgStore::new(create_pool(&config.database_url).await?));

    // Initialize S3 / MinIO, only when a bucket is configured
    let s3 = match &config.s3 {
        Some(settings) => {
            let client = build_s3_client(settings).await;
            info!(bucket = %settings.bucket, "S3 client initialized");
            Some((client, settings.bucket.clone()))
        }
        None => None,
    };

    // Initialize LLM client
    let llm = LlmClient::new(config.llm_api_url.clone(), config.llm_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let batch = BatchController::new(
        store.clone(),
        store.clone(),
        Arc::new(FeedReader::new(reqwest::Client::new(), s3)),
        Extractors {
            ai: Arc::new(LlmSkillExtractor::new(llm.clone())),
            direct: Arc::new(DirectSkillExtractor),
        },
        config.batch.clone(),
        config.default_email_domain.clone(),
    );
    let ranking = TalentRankingEngine::new(
        store,
        Arc::new(LlmSimilarityService::new(llm.clone())),
        Arc::new(LlmJustifier::new(llm)),
        config.ranking.clone(),
    );

    // Build router
    let app = build_router(AppState { batch, ranking })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for MinIO (explicit endpoint) or AWS.
async fn build_s3_client(settings: &S3Settings) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &settings.access_key_id,
        &settings.secret_access_key,
        None,
        None,
        "skills-api-static",
    );

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials);
    if let Some(endpoint) = &settings.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let shared = loader.load().await;

    // MinIO needs path-style addressing.
    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(settings.endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
