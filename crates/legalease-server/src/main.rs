mod routes;

use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use legalease_agent::GeminiBackend;
use legalease_core::{
    analysis::AnalysisClient,
    config::Config,
    extract::{LopdfParser, TesseractOcr, TextExtractor},
    session::Session,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub session: Session,
    /// `.env` file re-read by the setup recheck.
    pub dotenv_path: PathBuf,
    pub max_upload_bytes: usize,
}

/// Analysis client for the configured Gemini model.
pub(crate) fn build_client(config: &Config) -> AnalysisClient {
    let backend = GeminiBackend::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .with_base_url(config.gemini_base_url.clone())
        .with_timeout(config.gemini_timeout_s);
    AnalysisClient::new(Arc::new(backend))
}

pub(crate) fn build_extractor(config: &Config) -> TextExtractor {
    TextExtractor::new(
        Arc::new(LopdfParser),
        Arc::new(TesseractOcr::new(config.ocr_bin.clone(), config.ocr_lang.clone())),
    )
}

/// API routes only; `main` adds static files and outer layers.
pub(crate) fn api_router(state: Arc<AppState>) -> Router {
    // Multipart framing adds a little on top of the file itself.
    let body_limit = state.max_upload_bytes.saturating_add(64 * 1024);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/state", get(routes::get_state))
        .route("/api/document", put(routes::put_document))
        .route("/api/document/sample", post(routes::load_sample))
        .route("/api/upload", post(routes::upload))
        .route("/api/analyze", post(routes::analyze))
        .route("/api/tab", post(routes::select_tab))
        .route("/api/error", delete(routes::dismiss_error))
        .route("/api/setup/recheck", post(routes::recheck_setup))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ── main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "legalease_server=info,legalease_core=info,legalease_agent=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let dotenv_path = PathBuf::from(".env");
    let config = Config::from_env_with(&dotenv_path)?;

    if !config.api_key_valid() {
        tracing::warn!("GEMINI_API_KEY is missing or still the placeholder; setup screen active");
    }

    let session = Session::new(build_extractor(&config), build_client(&config));

    let state = Arc::new(AppState {
        session,
        dotenv_path,
        max_upload_bytes: config.max_upload_bytes,
    });

    let dist_dir = config.web_dist_dir.clone();
    let serve_dir =
        ServeDir::new(&dist_dir).fallback(ServeFile::new(format!("{dist_dir}/index.html")));

    let app = api_router(state)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.web_bind, config.web_port);
    info!(model = %config.gemini_model, "Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
