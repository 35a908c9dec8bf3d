//! Pasted image payloads carried as data URLs

use crate::error::PayloadError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Browsers always pad, but hand-written payloads often do not.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Image encodings a paste payload can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Pick the decoder for a declared MIME type. PNG is the fallback for a
    /// missing or unrecognized type.
    pub fn from_mime(mime: Option<&str>) -> Self {
        match mime.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
            Some("image/jpeg") | Some("image/jpg") => ImageFormat::Jpeg,
            Some("image/png") => ImageFormat::Png,
            _ => ImageFormat::Png,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// A decoded `data:<mime>;base64,<data>` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    /// MIME type as declared in the header, if any
    pub mime: Option<String>,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Split the data URL at its first `,` and base64-decode the remainder.
    pub fn parse(content: &str) -> Result<Self, PayloadError> {
        let (header, data) = content.split_once(',').ok_or(PayloadError::MissingComma)?;

        let data: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if data.is_empty() {
            return Err(PayloadError::Empty);
        }

        let mime = header
            .trim()
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let bytes = LENIENT_BASE64.decode(data.as_bytes())?;

        Ok(Self {
            format: ImageFormat::from_mime(mime.as_deref()),
            mime,
            bytes,
        })
    }

    /// Wrap already-encoded image bytes.
    pub fn from_bytes(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self {
            mime: Some(format.mime_type().to_string()),
            format,
            bytes,
        }
    }

    pub fn to_data_url(&self) -> String {
        let mime = self.mime.as_deref().unwrap_or(self.format.mime_type());
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }
}
