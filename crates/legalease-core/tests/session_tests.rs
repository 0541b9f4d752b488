// Session: async flows through the controller with real locking.

use std::sync::Arc;

use async_trait::async_trait;
use legalease_core::{
    agent::ModelBackend,
    analysis::AnalysisClient,
    controller::{Activity, Screen, Tab},
    error::{ControllerError, ExtractError},
    extract::{LopdfParser, OcrEngine, TextExtractor},
    samples::sample_analysis,
    session::Session,
};
use tokio::sync::Notify;

// ── helpers ──────────────────────────────────────────────────────────────────

const MINIMAL: &str = r#"{"documentType":"Lease","riskLevel":"low","plainSummary":"ok"}"#;

/// Blocks inside `generate` until released.
struct GatedBackend {
    key: String,
    entered: Notify,
    release: Notify,
}

impl GatedBackend {
    fn new(key: &str) -> Arc<Self> {
        Arc::new(Self {
            key: key.into(),
            entered: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl ModelBackend for GatedBackend {
    fn name(&self) -> &str {
        "gated"
    }

    fn api_key(&self) -> &str {
        &self.key
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(MINIMAL.into())
    }
}

struct EchoBackend {
    key: String,
    reply: Result<String, String>,
}

#[async_trait]
impl ModelBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn api_key(&self) -> &str {
        &self.key
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        self.reply.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

struct FixedOcr(&'static str);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, ExtractError> {
        Ok(self.0.to_string())
    }
}

fn extractor() -> TextExtractor {
    TextExtractor::new(Arc::new(LopdfParser), Arc::new(FixedOcr("scanned lease text")))
}

fn echo(key: &str, reply: Result<&str, &str>) -> AnalysisClient {
    AnalysisClient::new(Arc::new(EchoBackend {
        key: key.into(),
        reply: reply.map(str::to_string).map_err(str::to_string),
    }))
}

// ── flows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_analyze_is_rejected_as_busy() {
    let backend = GatedBackend::new("key-123");
    let session = Arc::new(Session::new(
        extractor(),
        AnalysisClient::new(backend.clone()),
    ));
    session.set_text("Tenant pays rent.".into()).await.unwrap();

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.analyze().await }
    });
    backend.entered.notified().await;

    assert_eq!(session.view().await.activity, Activity::Analyzing);
    assert!(!session.view().await.can_analyze);
    assert_eq!(
        session.analyze().await.unwrap_err(),
        ControllerError::Busy(Activity::Analyzing)
    );
    assert_eq!(
        session.upload("image/png", vec![1]).await.unwrap_err(),
        ControllerError::Busy(Activity::Analyzing)
    );

    backend.release.notify_one();
    let view = first.await.unwrap().unwrap();
    assert_eq!(view.activity, Activity::Idle);
    assert_eq!(view.tab, Tab::Analysis);
    assert_eq!(view.analysis.unwrap().document_type, "Lease");
}

#[tokio::test]
async fn image_upload_replaces_text() {
    let session = Session::new(extractor(), echo("key-123", Ok(MINIMAL)));
    session.set_text("old text".into()).await.unwrap();
    let view = session.upload("image/jpeg", vec![0xff, 0xd8]).await.unwrap();
    assert_eq!(view.document_text, "scanned lease text");
    assert!(view.error.is_none());
    assert!(view.can_analyze);
}

#[tokio::test]
async fn unsupported_upload_sets_banner_and_keeps_text() {
    let session = Session::new(extractor(), echo("key-123", Ok(MINIMAL)));
    session.set_text("old text".into()).await.unwrap();
    let view = session.upload("text/plain", b"hello".to_vec()).await.unwrap();
    assert_eq!(view.document_text, "old text");
    assert_eq!(view.activity, Activity::Idle);
    assert!(view.error.unwrap().contains("Unsupported file type"));
}

#[tokio::test]
async fn backend_failure_falls_back_to_sample() {
    let session = Session::new(extractor(), echo("key-123", Err("Gemini error 500: down")));
    session.load_sample_document().await.unwrap();
    let view = session.analyze().await.unwrap();
    assert!(view.showing_sample);
    assert_eq!(view.analysis, Some(sample_analysis()));
    assert_eq!(view.error.as_deref(), Some("Analysis failed: Gemini error 500: down"));

    let view = session.dismiss_error().await;
    assert!(view.error.is_none());
}

#[tokio::test]
async fn empty_document_is_rejected_without_state_change() {
    let session = Session::new(extractor(), echo("key-123", Ok(MINIMAL)));
    assert_eq!(
        session.analyze().await.unwrap_err(),
        ControllerError::EmptyDocument
    );
    let view = session.view().await;
    assert_eq!(view.activity, Activity::Idle);
    assert!(view.analysis.is_none());
}

#[tokio::test]
async fn reconfigure_moves_between_setup_and_main() {
    let session = Session::new(extractor(), echo("", Ok(MINIMAL)));
    assert_eq!(session.view().await.screen, Screen::Setup);
    assert_eq!(
        session.set_text("x".into()).await.unwrap_err(),
        ControllerError::SetupRequired
    );

    let view = session.reconfigure(echo("key-123", Ok(MINIMAL))).await;
    assert_eq!(view.screen, Screen::Main);
    assert!(view.setup_instructions.is_empty());

    session.set_text("terms".into()).await.unwrap();
    let view = session.analyze().await.unwrap();
    assert!(!view.showing_sample);

    let view = session
        .reconfigure(echo("your_gemini_api_key_here", Ok(MINIMAL)))
        .await;
    assert_eq!(view.screen, Screen::Setup);
    assert_eq!(view.document_text, "terms");
}

#[tokio::test]
async fn tab_selection_round_trips() {
    let session = Session::new(extractor(), echo("key-123", Ok(MINIMAL)));
    assert_eq!(
        session.select_tab(Tab::Analysis).await.unwrap_err(),
        ControllerError::NoAnalysis
    );
    session.set_text("terms".into()).await.unwrap();
    session.analyze().await.unwrap();
    let view = session.select_tab(Tab::Upload).await.unwrap();
    assert_eq!(view.tab, Tab::Upload);
    assert!(view.analysis.is_some());
}
