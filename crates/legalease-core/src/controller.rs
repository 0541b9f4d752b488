use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::setup_instructions,
    error::{AnalysisError, ControllerError, ExtractError},
    samples::{sample_analysis, SAMPLE_DOCUMENT},
    types::DocumentAnalysis,
};

// ── State enums ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// No usable API key; only setup instructions are shown.
    Setup,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Upload,
    Analysis,
}

/// What the controller is waiting on, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Extracting,
    Analyzing,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Analyzing => "analyzing",
        })
    }
}

// ── View snapshot ────────────────────────────────────────────────────────

/// Everything the browser needs to render the current screen.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub screen: Screen,
    pub tab: Tab,
    pub activity: Activity,
    pub document_text: String,
    pub analysis: Option<DocumentAnalysis>,
    /// True when `analysis` is the built-in sample substituted after a failure.
    pub showing_sample: bool,
    pub error: Option<String>,
    pub analysis_tab_enabled: bool,
    pub can_analyze: bool,
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub setup_instructions: Vec<String>,
}

// ── Controller ───────────────────────────────────────────────────────────

/// UI state for one user. All mutation goes through the transition methods
/// below; a rejected transition leaves the state untouched.
#[derive(Debug, Clone)]
pub struct Controller {
    key_valid: bool,
    tab: Tab,
    activity: Activity,
    document_text: String,
    analysis: Option<DocumentAnalysis>,
    showing_sample: bool,
    error: Option<String>,
    analyzed_at: Option<DateTime<Utc>>,
}

impl Controller {
    pub fn new(key_valid: bool) -> Self {
        Self {
            key_valid,
            tab: Tab::Upload,
            activity: Activity::Idle,
            document_text: String::new(),
            analysis: None,
            showing_sample: false,
            error: None,
            analyzed_at: None,
        }
    }

    pub fn screen(&self) -> Screen {
        if self.key_valid {
            Screen::Main
        } else {
            Screen::Setup
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }

    pub fn analysis(&self) -> Option<&DocumentAnalysis> {
        self.analysis.as_ref()
    }

    pub fn showing_sample(&self) -> bool {
        self.showing_sample
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Re-evaluate the key on re-mount. Existing document text and results
    /// are kept.
    pub fn recheck_key(&mut self, key_valid: bool) {
        if key_valid != self.key_valid {
            info!(key_valid, "api key status changed");
        }
        self.key_valid = key_valid;
    }

    pub fn can_analyze(&self) -> bool {
        self.key_valid
            && self.activity == Activity::Idle
            && !self.document_text.trim().is_empty()
    }

    fn require_main(&self) -> Result<(), ControllerError> {
        if self.key_valid {
            Ok(())
        } else {
            Err(ControllerError::SetupRequired)
        }
    }

    fn require_idle(&self) -> Result<(), ControllerError> {
        match self.activity {
            Activity::Idle => Ok(()),
            busy => Err(ControllerError::Busy(busy)),
        }
    }

    pub fn set_document_text(&mut self, text: impl Into<String>) -> Result<(), ControllerError> {
        self.require_main()?;
        self.document_text = text.into();
        Ok(())
    }

    pub fn load_sample_document(&mut self) -> Result<(), ControllerError> {
        self.set_document_text(SAMPLE_DOCUMENT)
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn select_tab(&mut self, tab: Tab) -> Result<(), ControllerError> {
        self.require_main()?;
        if tab == Tab::Analysis && self.analysis.is_none() {
            return Err(ControllerError::NoAnalysis);
        }
        self.tab = tab;
        Ok(())
    }

    // Extraction

    pub fn begin_extraction(&mut self) -> Result<(), ControllerError> {
        self.require_main()?;
        self.require_idle()?;
        self.activity = Activity::Extracting;
        self.error = None;
        Ok(())
    }

    pub fn finish_extraction(&mut self, result: Result<String, ExtractError>) {
        self.activity = Activity::Idle;
        match result {
            Ok(text) => {
                info!(chars = text.len(), "document text replaced from upload");
                self.document_text = text;
            }
            Err(e) => {
                warn!("extraction failed: {e}");
                self.error = Some(e.to_string());
            }
        }
    }

    // Analysis

    /// Enter the analyzing state and hand back the text to send.
    pub fn begin_analysis(&mut self) -> Result<String, ControllerError> {
        self.require_main()?;
        self.require_idle()?;
        if self.document_text.trim().is_empty() {
            return Err(ControllerError::EmptyDocument);
        }
        self.activity = Activity::Analyzing;
        self.error = None;
        Ok(self.document_text.clone())
    }

    /// Store the result, or substitute the sample analysis on failure. Either
    /// way the analysis tab becomes active.
    pub fn finish_analysis(&mut self, result: Result<DocumentAnalysis, AnalysisError>) {
        self.activity = Activity::Idle;
        match result {
            Ok(analysis) => {
                self.analysis = Some(analysis);
                self.showing_sample = false;
            }
            Err(e) => {
                warn!("analysis failed, showing sample: {e}");
                self.error = Some(e.to_string());
                self.analysis = Some(sample_analysis());
                self.showing_sample = true;
            }
        }
        self.analyzed_at = Some(Utc::now());
        self.tab = Tab::Analysis;
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            screen: self.screen(),
            tab: self.tab,
            activity: self.activity,
            document_text: self.document_text.clone(),
            analysis: self.analysis.clone(),
            showing_sample: self.showing_sample,
            error: self.error.clone(),
            analysis_tab_enabled: self.analysis.is_some(),
            can_analyze: self.can_analyze(),
            analyzed_at: self.analyzed_at,
            setup_instructions: if self.key_valid {
                Vec::new()
            } else {
                setup_instructions()
            },
        }
    }
}
