use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;
use thiserror::Error;
use url::Url;

//
// ─── ERRORS (domain validation) ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaError {
    #[error("content reference is not a data URL")]
    NotADataUrl,

    #[error("content reference has no payload separator")]
    MissingPayload,

    #[error("content reference is not base64-encoded")]
    NotBase64,

    #[error("content payload could not be decoded: {0}")]
    Decode(String),
}

//
// ─── CONTENT REFERENCE ─────────────────────────────────────────────────────────
//

/// Inline file content stored as a `data:<mime>;base64,<payload>` URL.
///
/// Thumbnails and materials are embedded in the course record rather than kept
/// in a file store, so this is the only handle to their bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentRef(String);

const DATA_PREFIX_LEN: usize = "data:".len();
const BASE64_MARKER: &str = ";base64";

impl ContentRef {
    /// Encode raw bytes under the given mime type.
    #[must_use]
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!(
            "data:{mime_type}{BASE64_MARKER},{}",
            STANDARD.encode(bytes)
        ))
    }

    /// Accept a previously stored reference.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if `raw` is not a base64 data URL.
    pub fn parse(raw: impl Into<String>) -> Result<Self, MediaError> {
        let raw = raw.into();
        let url = Url::parse(&raw).map_err(|_| MediaError::NotADataUrl)?;
        if url.scheme() != "data" {
            return Err(MediaError::NotADataUrl);
        }
        let (header, _) = raw[DATA_PREFIX_LEN..]
            .split_once(',')
            .ok_or(MediaError::MissingPayload)?;
        if !header.ends_with(BASE64_MARKER) {
            return Err(MediaError::NotBase64);
        }
        Ok(Self(raw))
    }

    fn header_and_payload(&self) -> (&str, &str) {
        self.0[DATA_PREFIX_LEN..]
            .split_once(',')
            .unwrap_or(("", ""))
    }

    /// Mime type declared in the URL header; `text/plain` when omitted (RFC 2397).
    #[must_use]
    pub fn mime_type(&self) -> &str {
        let (header, _) = self.header_and_payload();
        let mime = header.trim_end_matches(BASE64_MARKER);
        if mime.is_empty() { "text/plain" } else { mime }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type().starts_with("image/")
    }

    /// Decode the payload back into bytes.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Decode` if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, MediaError> {
        let (_, payload) = self.header_and_payload();
        STANDARD
            .decode(payload)
            .map_err(|e| MediaError::Decode(e.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Payloads can be megabytes; keep debug output readable.
impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (_, payload) = self.header_and_payload();
        write!(
            f,
            "ContentRef({}, {} base64 chars)",
            self.mime_type(),
            payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_bytes_and_mime() {
        let content = ContentRef::encode("application/pdf", b"%PDF-1.7 fake");
        assert!(content.as_str().starts_with("data:application/pdf;base64,"));
        assert_eq!(content.mime_type(), "application/pdf");
        assert_eq!(content.decode().unwrap(), b"%PDF-1.7 fake");
        assert!(!content.is_image());
    }

    #[test]
    fn parse_accepts_stored_data_urls() {
        let content = ContentRef::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert!(content.is_image());
        assert_eq!(content.decode().unwrap(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn parse_defaults_mime_to_text_plain() {
        let content = ContentRef::parse("data:;base64,aGk=").unwrap();
        assert_eq!(content.mime_type(), "text/plain");
        assert_eq!(content.decode().unwrap(), b"hi");
    }

    #[test]
    fn parse_rejects_non_data_urls() {
        assert_eq!(
            ContentRef::parse("https://example.com/a.png").unwrap_err(),
            MediaError::NotADataUrl
        );
        assert_eq!(
            ContentRef::parse("not a url").unwrap_err(),
            MediaError::NotADataUrl
        );
        assert_eq!(
            ContentRef::parse("data:text/plain,hello").unwrap_err(),
            MediaError::NotBase64
        );
    }

    #[test]
    fn decode_reports_corrupt_payload() {
        let content = ContentRef::parse("data:text/plain;base64,@@@").unwrap();
        assert!(matches!(content.decode(), Err(MediaError::Decode(_))));
    }

    #[test]
    fn debug_output_elides_payload() {
        let content = ContentRef::encode("text/plain", &[b'x'; 300]);
        let debug = format!("{content:?}");
        assert!(debug.starts_with("ContentRef(text/plain, "));
        assert!(debug.len() < 64);
    }
}
