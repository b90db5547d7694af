//! Turns an uploaded attachment into something the generation API accepts.
//!
//! The provider takes text and image parts only, so images go through as
//! inline base64 data while document formats are reduced to plain text
//! before they reach the request body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;

const WORD_MIME_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// A normalized content part ready for inclusion in a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    /// Sent as an `inline_data` part alongside the text prompt.
    InlineImage { mime_type: String, data_b64: String },
    /// Document content reduced to plain text, sent as a second text part.
    ExtractedText(String),
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("unsupported attachment type: {0}")]
    Unsupported(String),

    #[error("could not extract text from attachment: {0}")]
    Extraction(String),
}

impl Attachment {
    /// Normalize by mime family: images pass through inline, PDFs and
    /// text-like bodies are reduced to plain text, everything else is
    /// refused with a caller-visible error.
    pub async fn normalize(self) -> Result<PromptPart, AttachmentError> {
        let mime = self.mime_type.to_ascii_lowercase();

        if mime.starts_with("image/") {
            return Ok(PromptPart::InlineImage {
                mime_type: mime,
                data_b64: B64.encode(&self.bytes),
            });
        }

        if mime == "application/pdf" {
            let bytes = self.bytes;
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| AttachmentError::Extraction(format!("extraction task failed: {}", e)))?
                .map_err(|e| AttachmentError::Extraction(e.to_string()))?;
            return Ok(PromptPart::ExtractedText(text));
        }

        if mime.starts_with("text/") {
            return Ok(PromptPart::ExtractedText(
                String::from_utf8_lossy(&self.bytes).into_owned(),
            ));
        }

        if WORD_MIME_TYPES.contains(&mime.as_str()) {
            return Err(AttachmentError::Unsupported(
                "Word documents are not supported; convert to PDF or plain text".into(),
            ));
        }

        Err(AttachmentError::Unsupported(mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn images_become_inline_parts() {
        let att = Attachment {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime_type: "image/PNG".into(),
        };
        match att.normalize().await.unwrap() {
            PromptPart::InlineImage { mime_type, data_b64 } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data_b64, B64.encode([0x89, 0x50, 0x4e, 0x47]));
            }
            other => panic!("expected inline image, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn text_bodies_are_decoded() {
        let att = Attachment {
            bytes: b"quarterly numbers".to_vec(),
            mime_type: "text/plain".into(),
        };
        assert_eq!(
            att.normalize().await.unwrap(),
            PromptPart::ExtractedText("quarterly numbers".into())
        );
    }

    #[tokio::test]
    async fn word_documents_are_refused() {
        let att = Attachment {
            bytes: vec![1, 2, 3],
            mime_type: "application/msword".into(),
        };
        assert!(matches!(
            att.normalize().await,
            Err(AttachmentError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn unknown_binaries_are_refused() {
        let att = Attachment {
            bytes: vec![0u8; 16],
            mime_type: "application/zip".into(),
        };
        assert!(matches!(
            att.normalize().await,
            Err(AttachmentError::Unsupported(_))
        ));
    }
}
