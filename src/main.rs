use std::env;

use anyhow::Context;
use tokio::net::TcpListener;

use kb_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize().context("startup failed")?;
    kb_backend::logging::init(&state.paths);

    tracing::info!("corpus directory: {}", state.paths.corpus_dir.display());
    tracing::info!("index directory: {}", state.paths.index_dir.display());

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8080);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app = kb_backend::server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
