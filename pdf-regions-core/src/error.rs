use thiserror::Error;

/// Errors that abort a composition request.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Invalid selection data format: {0}")]
    InvalidSelectionData(String),

    #[error("Invalid region {id}: {reason}")]
    InvalidRegion { id: String, reason: String },

    #[error("No PDF file provided")]
    MissingPdf,

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Invalid PDF structure: {0}")]
    InvalidStructure(String),

    #[error("Failed to generate valid PDF content: {0}")]
    Output(String),
}

impl ComposeError {
    /// True when the caller sent something unusable and should fix the input
    /// rather than retry.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ComposeError::InvalidSelectionData(_)
                | ComposeError::InvalidRegion { .. }
                | ComposeError::MissingPdf
        )
    }
}

impl From<serde_json::Error> for ComposeError {
    fn from(err: serde_json::Error) -> Self {
        ComposeError::InvalidSelectionData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Errors decoding one pasted image payload. These never abort a request;
/// the compositor records them and skips the region.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Invalid paste data URL format: missing ',' separator")]
    MissingComma,

    #[error("Invalid paste data URL format: no data after ','")]
    Empty,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid JPEG: {0}")]
    Jpeg(String),

    #[error("Invalid PNG: {0}")]
    Png(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_error_display() {
        let error = ComposeError::Parse("missing header".to_string());
        assert_eq!(error.to_string(), "Failed to parse PDF: missing header");

        let error = ComposeError::InvalidRegion {
            id: "r1".to_string(),
            reason: "width is negative".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid region r1: width is negative");
    }

    #[test]
    fn test_compose_error_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error = ComposeError::from(json_err);
        assert!(matches!(error, ComposeError::InvalidSelectionData(_)));
        assert!(error.is_input_error());
    }

    #[test]
    fn test_input_vs_processing_classification() {
        let input = vec![
            ComposeError::InvalidSelectionData("bad".to_string()),
            ComposeError::MissingPdf,
            ComposeError::InvalidRegion {
                id: "x".to_string(),
                reason: "nan".to_string(),
            },
        ];
        for error in input {
            assert!(error.is_input_error(), "{error} should be an input error");
        }

        let processing = vec![
            ComposeError::Parse("bad".to_string()),
            ComposeError::InvalidStructure("no pages".to_string()),
            ComposeError::Output("12 bytes".to_string()),
        ];
        for error in processing {
            assert!(!error.is_input_error(), "{error} should be a processing error");
        }
    }

    #[test]
    fn test_payload_error_display() {
        assert_eq!(
            PayloadError::MissingComma.to_string(),
            "Invalid paste data URL format: missing ',' separator"
        );
        let error = PayloadError::Png("truncated".to_string());
        assert_eq!(error.to_string(), "Invalid PNG: truncated");
    }
}
