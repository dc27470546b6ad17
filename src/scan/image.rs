//! Receipt Image
//!
//! Image bytes plus MIME type, size-checked before anything is sent and
//! encoded as an inline base64 data URL for the vision request.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::domain::{DomainError, DomainResult};

/// Default upload limit (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptImage {
    bytes: Vec<u8>,
    mime: String,
}

fn too_large(max_bytes: usize) -> DomainError {
    DomainError::InvalidInput(format!(
        "Imagem muito grande. Máximo {}MB.",
        max_bytes / (1024 * 1024)
    ))
}

impl ReceiptImage {
    pub fn from_bytes(bytes: Vec<u8>, mime: &str, max_bytes: usize) -> DomainResult<Self> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidInput("Imagem vazia".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        if !mime.starts_with("image/") {
            return Err(DomainError::InvalidInput("Arquivo não é uma imagem".to_string()));
        }
        Ok(Self {
            bytes,
            mime: mime.to_string(),
        })
    }

    /// Read an image file; the MIME type is guessed from the extension
    pub fn from_path(path: &Path, max_bytes: usize) -> DomainResult<Self> {
        let size = std::fs::metadata(path)
            .map_err(|e| DomainError::InvalidInput(format!("Failed to read {}: {}", path.display(), e)))?
            .len();
        if size > max_bytes as u64 {
            return Err(too_large(max_bytes));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| DomainError::InvalidInput(format!("Failed to read {}: {}", path.display(), e)))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Self::from_bytes(bytes, mime.essence_str(), max_bytes)
    }

    /// Decode a `data:<mime>;base64,<payload>` URL; a bare payload is taken as JPEG
    pub fn from_data_url(data: &str, max_bytes: usize) -> DomainResult<Self> {
        let (mime, payload) = match data.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
            Some((header, payload)) => (header.trim_end_matches(";base64"), payload),
            None => ("image/jpeg", data),
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| DomainError::InvalidInput(format!("Failed to decode base64: {}", e)))?;
        Self::from_bytes(bytes, mime, max_bytes)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}
