use thiserror::Error;

use crate::extract::ReceiptParser;
use crate::preprocess;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::ParsedReceipt;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Raw OCR text output, kept alongside the receipt for later re-parsing.
    pub ocr_text: String,
    pub parsed: ParsedReceipt,
}

/// Orchestrates: decode → preprocess → OCR → parse.
///
/// Every step is CPU-bound and synchronous; async callers should run it on a
/// blocking thread.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    parser: ReceiptParser,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, parser: ReceiptParser) -> Self {
        Self { recognizer, parser }
    }

    /// Process an uploaded image given as base64 or a `data:` URL.
    pub fn process_base64(&self, payload: &str) -> Result<OcrResult, PipelineError> {
        let bytes = preprocess::decode_base64_image(payload)?;
        self.process_bytes(&bytes)
    }

    /// Process raw image bytes.
    pub fn process_bytes(&self, data: &[u8]) -> Result<OcrResult, PipelineError> {
        let image_bytes = preprocess::prepare_for_ocr_from_bytes(data)?;
        let ocr_text = self.recognizer.recognize(&image_bytes)?;
        tracing::debug!(raw = %ocr_text, "OCR output");

        let parsed = self.parser.parse(&ocr_text);
        tracing::info!(
            store = %parsed.store_name,
            store_known = parsed.is_store_known(),
            items = parsed.items.len(),
            total = %parsed.total,
            "receipt parsed"
        );

        Ok(OcrResult { ocr_text, parsed })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
