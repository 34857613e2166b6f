use std::sync::Arc;

use mindcare_server::{
    config::Config,
    db,
    llm::ChatClient,
    models::AppState,
    routes,
    wallet::{PgWalletStore, WalletEngine},
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url).await?;

    let wallet = WalletEngine::new(Arc::new(PgWalletStore::new(pool.clone())));
    let chat = ChatClient::new(
        cfg.llm_api_url,
        cfg.llm_api_key,
        cfg.llm_model,
        cfg.llm_timeout_secs,
    )?;

    let state = AppState {
        db: pool,
        session_ttl_hours: cfg.session_ttl_hours,
        wallet,
        chat,
        chat_history_limit: cfg.chat_history_limit,
        chat_history_ttl_minutes: cfg.chat_history_ttl_minutes,
    };

    // DEV ONLY: allow browser/WebView clients to call the API without a
    // reverse proxy in front. Fixes OPTIONS preflight (CORS).
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
