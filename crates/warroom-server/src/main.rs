mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use warroom_api::auth::{AppState, AppStateInner};
use warroom_api::router::router;
use warroom_api::session::QuotaPolicy;
use warroom_api::trigger::TriggerPolicy;
use warroom_llm::{GeminiClient, ModelChain};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warroom=debug,tower_http=debug".into()),
        )
        .init();

    // Config: fails closed when required secrets are missing
    let config = Config::from_env()?;

    // Init database (migrations run at open, never at request time)
    let db = warroom_db::Database::open(&config.db_path)?;

    // Model fallback chain
    let client = GeminiClient::new(config.gemini_api_key.clone())
        .context("failed to build the LLM HTTP client")?;
    let llm = ModelChain::new(client, config.model_chain.clone());
    info!("Model chain: {}", config.model_chain.join(" -> "));

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        llm,
        jwt_secret: config.jwt_secret.clone(),
        trigger: TriggerPolicy::new(config.trigger_keywords.clone(), config.solo_room_auto_reply),
        quota: QuotaPolicy::new(config.quota_ceiling, config.quota_allow_list.clone()),
        upload_dir: config.upload_dir.clone(),
    });

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("War Room server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
