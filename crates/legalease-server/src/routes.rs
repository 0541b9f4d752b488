use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use legalease_core::{
    config::Config,
    controller::{Tab, ViewState},
    error::ControllerError,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{build_client, AppState};

// ── Error helper ──────────────────────────────────────────────────────────

/// Status plus a message for the browser's banner.
pub(crate) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(e: ControllerError) -> Self {
        let status = match e {
            ControllerError::SetupRequired => StatusCode::PRECONDITION_REQUIRED,
            ControllerError::Busy(_) => StatusCode::CONFLICT,
            ControllerError::EmptyDocument | ControllerError::NoAnalysis => {
                StatusCode::UNPROCESSABLE_ENTITY
            },
        };
        Self(status, e.to_string())
    }
}

pub(crate) fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("internal error: {e}");
    ApiError(StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
}

type ApiResult = Result<Json<ViewState>, ApiError>;

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct DocumentBody {
    pub text: String,
}

#[derive(Deserialize)]
pub(crate) struct TabBody {
    pub tab: Tab,
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn get_state(State(state): State<Arc<AppState>>) -> Json<ViewState> {
    Json(state.session.view().await)
}

pub(crate) async fn put_document(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DocumentBody>,
) -> ApiResult {
    Ok(Json(state.session.set_text(body.text).await?))
}

pub(crate) async fn load_sample(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(state.session.load_sample_document().await?))
}

pub(crate) async fn select_tab(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TabBody>,
) -> ApiResult {
    Ok(Json(state.session.select_tab(body.tab).await?))
}

pub(crate) async fn dismiss_error(State(state): State<Arc<AppState>>) -> Json<ViewState> {
    Json(state.session.dismiss_error().await)
}

pub(crate) async fn analyze(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Json(state.session.analyze().await?))
}

/// Takes the first part named `file`. Its declared content type picks the
/// extraction path; a part without one is treated as unsupported.
pub(crate) async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError(e.status(), e.body_text()))?;

        if bytes.len() > state.max_upload_bytes {
            return Err(ApiError(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("file exceeds {} bytes", state.max_upload_bytes),
            ));
        }

        info!(file = %file_name, content_type = %content_type, size = bytes.len(), "upload received");
        return Ok(Json(state.session.upload(&content_type, bytes.to_vec()).await?));
    }
    Err(ApiError(
        StatusCode::BAD_REQUEST,
        "multipart field `file` is required".into(),
    ))
}

/// Re-read configuration and swap in a fresh client, so a key added to
/// `.env` takes effect without a restart.
pub(crate) async fn recheck_setup(State(state): State<Arc<AppState>>) -> ApiResult {
    let config = Config::from_env_with(&state.dotenv_path).map_err(internal)?;
    info!(key_valid = config.api_key_valid(), "setup recheck");
    Ok(Json(state.session.reconfigure(build_client(&config)).await))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request},
        Router,
    };
    use legalease_core::{
        agent::ModelBackend,
        analysis::AnalysisClient,
        error::ExtractError,
        extract::{LopdfParser, OcrEngine, TextExtractor},
        session::Session,
    };
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::*;
    use crate::api_router;

    // ── helpers ──────────────────────────────────────────────────────────

    const MINIMAL: &str = r#"{"documentType":"Lease","riskLevel":"high","plainSummary":"ok"}"#;

    struct StubBackend {
        key: String,
        gate: Option<Arc<(Notify, Notify)>>,
    }

    #[async_trait]
    impl ModelBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        fn api_key(&self) -> &str {
            &self.key
        }

        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            if let Some(gate) = &self.gate {
                gate.0.notify_one();
                gate.1.notified().await;
            }
            Ok(MINIMAL.into())
        }
    }

    struct StubOcr;

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<String, ExtractError> {
            Ok("text from scan".into())
        }
    }

    fn state_with(
        key: &str,
        gate: Option<Arc<(Notify, Notify)>>,
        dotenv_path: PathBuf,
        max_upload_bytes: usize,
    ) -> Arc<AppState> {
        let client = AnalysisClient::new(Arc::new(StubBackend {
            key: key.into(),
            gate,
        }));
        let extractor = TextExtractor::new(Arc::new(LopdfParser), Arc::new(StubOcr));
        Arc::new(AppState {
            session: Session::new(extractor, client),
            dotenv_path,
            max_upload_bytes,
        })
    }

    fn app(key: &str) -> Router {
        api_router(state_with(key, None, PathBuf::from("/nonexistent/.env"), 1024))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
        Request::post("/api/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    // ── tests ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(&app("key"), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn only_app_routes_are_served() {
        let (status, _) = send(&app("key"), get("/api/logs")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn setup_screen_blocks_mutations() {
        let app = app("");
        let (_, state) = send(&app, get("/api/state")).await;
        assert_eq!(state["screen"], "setup");

        let (status, body) =
            send(&app, json_req("PUT", "/api/document", json!({"text": "x"}))).await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, post("/api/analyze")).await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        let (status, _) = send(&app, multipart("image/png", b"png")).await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
    }

    #[tokio::test]
    async fn edit_then_analyze_switches_to_analysis_tab() {
        let app = app("key");
        let (status, view) = send(
            &app,
            json_req("PUT", "/api/document", json!({"text": "Rent is $1,000."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["can_analyze"], true);

        let (status, view) = send(&app, post("/api/analyze")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["tab"], "analysis");
        assert_eq!(view["analysis"]["documentType"], "Lease");
        assert_eq!(view["analysis"]["riskLevel"], "high");
        assert_eq!(view["showing_sample"], false);

        let (status, view) =
            send(&app, json_req("POST", "/api/tab", json!({"tab": "upload"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["tab"], "upload");
        assert_eq!(view["document_text"], "Rent is $1,000.");
    }

    #[tokio::test]
    async fn empty_document_and_missing_analysis_are_422() {
        let app = app("key");
        let (status, _) = send(&app, post("/api/analyze")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) =
            send(&app, json_req("POST", "/api/tab", json!({"tab": "analysis"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn sample_document_loads() {
        let app = app("key");
        let (status, view) = send(&app, post("/api/document/sample")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(view["document_text"]
            .as_str()
            .unwrap()
            .contains("RESIDENTIAL LEASE AGREEMENT"));
    }

    #[tokio::test]
    async fn image_upload_replaces_text() {
        let app = app("key");
        let (status, view) = send(&app, multipart("image/png", b"\x89PNG")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["document_text"], "text from scan");
    }

    #[tokio::test]
    async fn unsupported_upload_shows_banner_then_dismisses() {
        let app = app("key");
        send(&app, json_req("PUT", "/api/document", json!({"text": "keep me"}))).await;

        let (status, view) = send(&app, multipart("text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["document_text"], "keep me");
        assert!(view["error"]
            .as_str()
            .unwrap()
            .contains("Unsupported file type"));

        let resp = app
            .clone()
            .oneshot(Request::delete("/api/error").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let (_, view) = send(&app, get("/api/state")).await;
        assert!(view["error"].is_null());
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let app = app("key");
        let (status, _) = send(&app, multipart("image/png", &[0u8; 2048])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() {
        let app = app("key");
        let req = Request::post("/api/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(
                "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--XBOUNDARY--\r\n",
            ))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_analyze_while_busy_is_409() {
        let gate = Arc::new((Notify::new(), Notify::new()));
        let app = api_router(state_with(
            "key",
            Some(gate.clone()),
            PathBuf::from("/nonexistent/.env"),
            1024,
        ));
        send(&app, json_req("PUT", "/api/document", json!({"text": "terms"}))).await;

        let first = tokio::spawn({
            let app = app.clone();
            async move { app.oneshot(post("/api/analyze")).await.unwrap().status() }
        });
        gate.0.notified().await;

        let (status, body) = send(&app, post("/api/analyze")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("analyzing"));

        gate.1.notify_one();
        assert_eq!(first.await.unwrap(), StatusCode::OK);
    }

    #[tokio::test]
    async fn recheck_picks_up_key_from_dotenv() {
        if std::env::var("GEMINI_API_KEY").is_ok() || std::env::var("VITE_GEMINI_API_KEY").is_ok()
        {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "GEMINI_API_KEY=your_gemini_api_key_here\n").unwrap();

        let app = api_router(state_with("", None, path.clone(), 1024));
        let (_, view) = send(&app, post("/api/setup/recheck")).await;
        assert_eq!(view["screen"], "setup");

        std::fs::write(&path, "GEMINI_API_KEY=AIza-real-key\n").unwrap();
        let (status, view) = send(&app, post("/api/setup/recheck")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["screen"], "main");
    }
}
