use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes a request backend may return in a non-2xx body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    PayloadTooLarge,
    RateLimited,
    Internal,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooLarge { size_bytes: u64, max_bytes: u64 },
    UnsupportedType,
}

/// A single file refused at staging time. Other files of the same batch are
/// unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("file '{file_name}' rejected: {}", describe(.reason, .mime_type))]
pub struct FileRejectedError {
    pub file_name: String,
    pub mime_type: String,
    pub reason: RejectReason,
}

fn describe(reason: &RejectReason, mime_type: &str) -> String {
    match reason {
        RejectReason::TooLarge {
            size_bytes,
            max_bytes,
        } => format!("{size_bytes} bytes exceeds the {max_bytes} byte limit"),
        RejectReason::UnsupportedType => format!("type '{mime_type}' is not allowed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_error_codes_deserialize() {
        let err: ApiError =
            serde_json::from_str(r#"{"code":"teapot","message":"short and stout"}"#)
                .expect("decode");
        assert_eq!(err.code, ErrorCode::Unknown);
    }

    #[test]
    fn rejection_message_names_file_and_reason() {
        let err = FileRejectedError {
            file_name: "huge.png".into(),
            mime_type: "image/png".into(),
            reason: RejectReason::TooLarge {
                size_bytes: 11,
                max_bytes: 10,
            },
        };
        let text = err.to_string();
        assert!(text.contains("huge.png"));
        assert!(text.contains("exceeds"));
    }
}
