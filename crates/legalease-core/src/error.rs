use thiserror::Error;

use crate::controller::Activity;

/// Failure turning an uploaded file into plain text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type ({0}). Please upload a PDF or image.")]
    UnsupportedType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Failure producing a `DocumentAnalysis` from document text.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Gemini API key not configured. Please add your API key to the .env file.")]
    NotConfigured,

    /// Transport, HTTP status or model-side failure.
    #[error("Analysis failed: {0}")]
    Model(String),

    /// The reply held no parsable JSON object.
    #[error("Analysis failed: Invalid response format from AI ({0})")]
    Format(String),

    #[error("Analysis failed: Incomplete analysis received from AI (missing {})", .0.join(", "))]
    Incomplete(Vec<&'static str>),
}

/// A UI transition that is not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Gemini API key is not configured")]
    SetupRequired,

    #[error("another operation is already in flight ({0})")]
    Busy(Activity),

    #[error("document text is empty")]
    EmptyDocument,

    #[error("no analysis available yet")]
    NoAnalysis,
}
