pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;
pub mod vocabulary;

pub use extract::{parse_receipt_text, ReceiptParser};
pub use pipeline::{OcrResult, PipelineError, ReceiptPipeline};
pub use preprocess::{decode_base64_image, prepare_for_ocr_from_bytes, PreprocessError};
pub use recognizer::{
    default_backend, MockRecognizer, OcrBackend, OcrError, RecognizerConfig, UnavailableRecognizer,
};
pub use types::{LineItem, ParsedReceipt, UNKNOWN_STORE};
pub use vocabulary::{ParserVocabulary, SkipKeyword, SkipReason, StoreKeyword, VocabularyError};
