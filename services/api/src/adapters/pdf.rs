//! services/api/src/adapters/pdf.rs
//!
//! Text extraction for uploaded test results. Implements the
//! `DocumentTextExtractor` port with `pdf-extract`.

use async_trait::async_trait;
use study_buddy_core::{DocumentTextExtractor, PortError, PortResult};
use tracing::debug;

#[derive(Clone, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_blocking(bytes: &[u8]) -> PortResult<String> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| PortError::Extraction(format!("unreadable PDF: {}", e)))?;
        let text = text.trim();
        if text.is_empty() {
            // Image-only scans parse fine but carry no text layer.
            return Err(PortError::Extraction(
                "the document contains no extractable text".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl DocumentTextExtractor for PdfTextExtractor {
    async fn extract(&self, file_bytes: &[u8]) -> PortResult<String> {
        if file_bytes.is_empty() {
            return Err(PortError::Extraction("the uploaded file is empty".to_string()));
        }

        debug!("Extracting text from PDF ({} bytes)", file_bytes.len());
        let bytes = file_bytes.to_vec();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&bytes))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
    }
}
