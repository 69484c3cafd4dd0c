//! File ingestion: uploaded attachment descriptors become engine-facing
//! `Attachment` values before orchestration runs.
//!
//! Text uploads are inlined. Binary uploads are decoded only to measure
//! and cap them; the engine sees a marker, never raw bytes.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use thiserror::Error;

use chatforge_core::turn::Attachment;

/// One uploaded file as it arrives in a chat request. Exactly one of
/// `text` and `data` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentUpload {
    pub name: String,

    #[serde(default = "default_media_type")]
    pub media_type: String,

    /// Inline textual content.
    #[serde(default)]
    pub text: Option<String>,

    /// Base64-encoded binary content.
    #[serde(default)]
    pub data: Option<String>,
}

fn default_media_type() -> String {
    "application/octet-stream".into()
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Attachment \"{name}\" is {size_bytes} bytes, over the {limit_bytes} byte limit")]
    TooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error("Attachment \"{name}\" has invalid base64 data")]
    InvalidEncoding { name: String },

    #[error("Attachment \"{name}\" carries neither text nor data")]
    Empty { name: String },
}

/// Convert uploads into attachments, enforcing the per-attachment size cap.
pub fn ingest_attachments(
    uploads: Vec<AttachmentUpload>,
    limit_bytes: u64,
) -> Result<Vec<Attachment>, IngestError> {
    uploads
        .into_iter()
        .map(|upload| ingest_one(upload, limit_bytes))
        .collect()
}

fn ingest_one(upload: AttachmentUpload, limit_bytes: u64) -> Result<Attachment, IngestError> {
    match (upload.text, upload.data) {
        (Some(text), _) => {
            let size = text.len() as u64;
            if size > limit_bytes {
                return Err(IngestError::TooLarge {
                    name: upload.name,
                    size_bytes: size,
                    limit_bytes,
                });
            }
            Ok(Attachment::text(upload.name, upload.media_type, text))
        }
        (None, Some(data)) => {
            let bytes = BASE64
                .decode(data.as_bytes())
                .map_err(|_| IngestError::InvalidEncoding {
                    name: upload.name.clone(),
                })?;
            let size = bytes.len() as u64;
            if size > limit_bytes {
                return Err(IngestError::TooLarge {
                    name: upload.name,
                    size_bytes: size,
                    limit_bytes,
                });
            }
            Ok(Attachment::binary(upload.name, upload.media_type, size))
        }
        (None, None) => Err(IngestError::Empty { name: upload.name }),
    }
}
