use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available; build with the `tesseract` feature")]
    NotAvailable,
}

/// Abstraction over an OCR backend.
/// Implementations accept raw PNG/JPEG image bytes and return the recognized text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes)
    }
}

/// Settings handed to the OCR engine. The defaults match what grocery
/// receipts need: English, a whitelist of the characters that appear on
/// them, and 300 DPI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizerConfig {
    /// Directory containing `<lang>.traineddata`; engine default when `None`.
    pub data_path: Option<String>,
    pub lang: String,
    pub char_whitelist: String,
    pub dpi: u32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            lang: "eng".to_string(),
            char_whitelist:
                "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz.$-:/() ".to_string(),
            dpi: 300,
        }
    }
}

/// Pick the best backend compiled into this build.
#[cfg(feature = "tesseract")]
pub fn default_backend(config: RecognizerConfig) -> Box<dyn OcrBackend> {
    Box::new(tesseract_backend::TesseractRecognizer::new(config))
}

/// Pick the best backend compiled into this build.
#[cfg(not(feature = "tesseract"))]
pub fn default_backend(config: RecognizerConfig) -> Box<dyn OcrBackend> {
    tracing::warn!(lang = %config.lang, "built without `tesseract` feature; receipt OCR is disabled");
    Box::new(UnavailableRecognizer)
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string. Lets the intake pipeline be tested without
/// Tesseract installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

/// Stand-in used when no engine is compiled in. Every call fails.
pub struct UnavailableRecognizer;

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, RecognizerConfig};
    use leptess::{LepTess, Variable};

    pub struct TesseractRecognizer {
        config: RecognizerConfig,
    }

    impl TesseractRecognizer {
        pub fn new(config: RecognizerConfig) -> Self {
            Self { config }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            // LepTess is not Sync; a fresh instance per call keeps the backend shareable.
            let mut lt = LepTess::new(self.config.data_path.as_deref(), &self.config.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditCharWhitelist, &self.config.char_whitelist)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::PreserveInterwordSpaces, "1")
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::UserDefinedDpi, &self.config.dpi.to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}
