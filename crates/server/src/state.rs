use std::sync::Arc;

use basket_ocr::{OcrBackend, ReceiptPipeline};
use basket_storage::DbPool;

pub type SharedPipeline = Arc<ReceiptPipeline<Box<dyn OcrBackend>>>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub pipeline: SharedPipeline,
}

impl AppState {
    pub fn new(db: DbPool, pipeline: ReceiptPipeline<Box<dyn OcrBackend>>) -> Self {
        Self { db, pipeline: Arc::new(pipeline) }
    }
}
