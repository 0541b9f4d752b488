use std::sync::RwLock;

use tokio::sync::Mutex;
use tracing::info;

use crate::{
    analysis::AnalysisClient,
    controller::{Controller, Tab, ViewState},
    error::ControllerError,
    extract::TextExtractor,
};

/// Owns the controller plus the services it drives.
///
/// Long-running work follows begin → await → finish: the controller lock is
/// released while extraction or the model call is in flight, so readers see
/// the busy state and duplicate requests are rejected by the controller.
pub struct Session {
    controller: Mutex<Controller>,
    extractor: TextExtractor,
    client: RwLock<AnalysisClient>,
}

impl Session {
    pub fn new(extractor: TextExtractor, client: AnalysisClient) -> Self {
        let key_valid = client.is_configured();
        info!(backend = %client.backend_name(), key_valid, "session created");
        Self {
            controller: Mutex::new(Controller::new(key_valid)),
            extractor,
            client: RwLock::new(client),
        }
    }

    fn client(&self) -> AnalysisClient {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn view(&self) -> ViewState {
        self.controller.lock().await.view()
    }

    pub async fn set_text(&self, text: String) -> Result<ViewState, ControllerError> {
        let mut c = self.controller.lock().await;
        c.set_document_text(text)?;
        Ok(c.view())
    }

    pub async fn load_sample_document(&self) -> Result<ViewState, ControllerError> {
        let mut c = self.controller.lock().await;
        c.load_sample_document()?;
        Ok(c.view())
    }

    pub async fn select_tab(&self, tab: Tab) -> Result<ViewState, ControllerError> {
        let mut c = self.controller.lock().await;
        c.select_tab(tab)?;
        Ok(c.view())
    }

    pub async fn dismiss_error(&self) -> ViewState {
        let mut c = self.controller.lock().await;
        c.dismiss_error();
        c.view()
    }

    /// Swap in a freshly configured client and re-run the key check, as the
    /// browser does when the app re-mounts.
    pub async fn reconfigure(&self, client: AnalysisClient) -> ViewState {
        let key_valid = client.is_configured();
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = client;
        let mut c = self.controller.lock().await;
        c.recheck_key(key_valid);
        c.view()
    }

    /// Extract text from an uploaded file into the document. Extraction
    /// failures land in the error banner, not in the return value.
    pub async fn upload(
        &self,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<ViewState, ControllerError> {
        self.controller.lock().await.begin_extraction()?;

        let result = self.extractor.extract(content_type, bytes).await;

        let mut c = self.controller.lock().await;
        c.finish_extraction(result);
        Ok(c.view())
    }

    /// Analyze the current document text. Analysis failures fall back to the
    /// sample analysis and land in the error banner.
    pub async fn analyze(&self) -> Result<ViewState, ControllerError> {
        let text = self.controller.lock().await.begin_analysis()?;

        let result = self.client().analyze(&text).await;

        let mut c = self.controller.lock().await;
        c.finish_analysis(result);
        Ok(c.view())
    }
}
