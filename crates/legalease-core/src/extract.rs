use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ExtractError;

/// Which extraction path a declared MIME type takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

/// Map a declared content type to an extraction path. Parameters such as
/// `; charset=binary` and letter case are ignored.
pub fn classify(content_type: &str) -> Result<FileKind, ExtractError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if essence == "application/pdf" {
        Ok(FileKind::Pdf)
    } else if essence.starts_with("image/") {
        Ok(FileKind::Image)
    } else {
        Err(ExtractError::UnsupportedType(content_type.to_string()))
    }
}

// ── Engines ──────────────────────────────────────────────────────────────

/// Splits a PDF into per-page text, in page order.
pub trait PdfParser: Send + Sync {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Recognizes text in a raster image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, ExtractError>;
}

/// Pure-Rust PDF text extraction via `lopdf`.
pub struct LopdfParser;

impl PdfParser for LopdfParser {
    fn page_texts(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        if doc.is_encrypted() {
            return Err(ExtractError::Pdf("document is encrypted".into()));
        }

        // BTreeMap keyed by 1-based page number, so iteration is page order.
        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        for page_num in pages.keys() {
            let text = doc
                .extract_text(&[*page_num])
                .map_err(|e| ExtractError::Pdf(format!("page {page_num}: {e}")))?;
            texts.push(text);
        }
        Ok(texts)
    }
}

/// OCR through the `tesseract` command-line tool.
pub struct TesseractOcr {
    pub bin: String,
    pub lang: String,
}

impl TesseractOcr {
    pub fn new(bin: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            lang: lang.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, ExtractError> {
        let file = tempfile::Builder::new()
            .prefix("legalease-ocr-")
            .tempfile()
            .map_err(|e| ExtractError::Ocr(format!("failed to create temp file: {e}")))?;
        tokio::fs::write(file.path(), image)
            .await
            .map_err(|e| ExtractError::Ocr(format!("failed to write temp file: {e}")))?;

        let output = tokio::process::Command::new(&self.bin)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractError::Ocr(format!("failed to run {}: {e}", self.bin)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            warn!(bin = %self.bin, status = %output.status, "ocr stderr: {}", stderr.trim());
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.bin,
                output.status,
                stderr.trim()
            )));
        }
        if !stderr.trim().is_empty() {
            warn!(bin = %self.bin, "ocr stderr: {}", stderr.trim());
        }

        String::from_utf8(output.stdout)
            .map_err(|_| ExtractError::Ocr("recognized text is not valid UTF-8".into()))
    }
}

// ── Extractor ────────────────────────────────────────────────────────────

/// Turns an uploaded file into plain document text.
#[derive(Clone)]
pub struct TextExtractor {
    pdf: Arc<dyn PdfParser>,
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(pdf: Arc<dyn PdfParser>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { pdf, ocr }
    }

    pub async fn extract(&self, content_type: &str, bytes: Vec<u8>) -> Result<String, ExtractError> {
        let kind = classify(content_type)?;
        info!(content_type, size = bytes.len(), kind = ?kind, "extracting document text");

        let text = match kind {
            FileKind::Pdf => {
                let pdf = Arc::clone(&self.pdf);
                let pages = tokio::task::spawn_blocking(move || pdf.page_texts(&bytes))
                    .await
                    .map_err(|e| ExtractError::Pdf(format!("parser task failed: {e}")))??;
                info!(pages = pages.len(), "pdf text extracted");
                join_pages(&pages)
            }
            FileKind::Image => {
                let text = self.ocr.recognize(&bytes).await?;
                info!(chars = text.len(), "ocr text recognized");
                text
            }
        };
        Ok(text)
    }
}

/// One line per page: the page's tokens joined by single spaces, `\n`
/// terminated.
pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for page in pages {
        let mut first = true;
        for token in page.split_whitespace() {
            if !first {
                out.push(' ');
            }
            out.push_str(token);
            first = false;
        }
        out.push('\n');
    }
    out
}
