//! Operation outcomes
//!
//! Every engine operation resolves to an [`OperationResult`]. Callers branch
//! on `success` instead of matching on errors.

use acf_artifact::ArtifactError;
use acf_handlers::{HandlerError, HandlerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    AlreadyExists,
    InvalidInput,
    TypeMismatch,
    Io,
    Parse,
    Serialization,
    /// Handler panicked
    Internal,
}

impl ErrorCode {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::InvalidInput => "INVALID_INPUT",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::Io => "IO",
            Self::Parse => "PARSE",
            Self::Serialization => "SERIALIZATION",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload of a failed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    /// Create error info
    #[inline]
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<&HandlerError> for ErrorInfo {
    fn from(error: &HandlerError) -> Self {
        let code = match error {
            HandlerError::NotFound { .. } => ErrorCode::NotFound,
            HandlerError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            HandlerError::InvalidInput(_) => ErrorCode::InvalidInput,
            HandlerError::Artifact(ArtifactError::TypeMismatch { .. }) => ErrorCode::TypeMismatch,
            HandlerError::Artifact(ArtifactError::Serialization(_))
            | HandlerError::Serialization(_) => ErrorCode::Serialization,
            HandlerError::Artifact(_) => ErrorCode::InvalidInput,
            HandlerError::Io { .. } => ErrorCode::Io,
            HandlerError::Parse { .. } => ErrorCode::Parse,
        };
        Self::new(code, error.to_string())
    }
}

impl From<HandlerError> for ErrorInfo {
    fn from(error: HandlerError) -> Self {
        Self::from(&error)
    }
}

/// Outcome of one engine operation
///
/// `success` implies `data`; failure implies `error` and no `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl<T> OperationResult<T> {
    /// Successful result
    #[inline]
    #[must_use]
    pub fn ok(data: T, path: Option<PathBuf>) -> Self {
        Self {
            success: true,
            data: Some(data),
            path,
            error: None,
        }
    }

    /// Failed result
    #[inline]
    #[must_use]
    pub fn failure(error: ErrorInfo) -> Self {
        Self {
            success: false,
            data: None,
            path: None,
            error: Some(error),
        }
    }

    /// Convert a handler outcome
    #[must_use]
    pub fn from_handler(result: HandlerResult<T>) -> Self {
        match result {
            Ok(stored) => Self::ok(stored.data, stored.path),
            Err(e) => Self::failure(ErrorInfo::from(&e)),
        }
    }

    /// Error code, if failed
    #[inline]
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }

    /// Transform the data, keeping path and error
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            success: self.success,
            data: self.data.map(f),
            path: self.path,
            error: self.error,
        }
    }

    /// Fallible transform; a conversion error turns the result into a failure
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, ErrorInfo>) -> OperationResult<U> {
        match self.data {
            Some(data) if self.success => match f(data) {
                Ok(mapped) => OperationResult::ok(mapped, self.path),
                Err(error) => OperationResult::failure(error),
            },
            _ => OperationResult {
                success: false,
                data: None,
                path: self.path,
                error: self.error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acf_artifact::ArtifactType;
    use acf_handlers::Stored;
    use pretty_assertions::assert_eq;

    #[test]
    fn handler_errors_map_to_codes() {
        let cases = [
            (HandlerError::not_found(ArtifactType::Skill, "a/b"), ErrorCode::NotFound),
            (
                HandlerError::already_exists(ArtifactType::Rule, "x", None),
                ErrorCode::AlreadyExists,
            ),
            (HandlerError::InvalidInput("bad".into()), ErrorCode::InvalidInput),
            (
                ArtifactError::TypeMismatch {
                    expected: ArtifactType::Hook,
                    actual: ArtifactType::Skill,
                }
                .into(),
                ErrorCode::TypeMismatch,
            ),
            (
                ArtifactError::invalid_field("name", "empty").into(),
                ErrorCode::InvalidInput,
            ),
            (HandlerError::Serialization("x".into()), ErrorCode::Serialization),
        ];
        for (error, code) in cases {
            assert_eq!(ErrorInfo::from(&error).code, code);
        }
    }

    #[test]
    fn from_handler_keeps_path_and_invariants() {
        let ok = OperationResult::from_handler(Ok(Stored::at(1, "/p/x.md")));
        assert!(ok.success);
        assert_eq!(ok.data, Some(1));
        assert_eq!(ok.path, Some(PathBuf::from("/p/x.md")));
        assert!(ok.error.is_none());

        let failed: OperationResult<i32> =
            OperationResult::from_handler(Err(HandlerError::not_found(ArtifactType::Hook, "h")));
        assert!(!failed.success);
        assert!(failed.data.is_none());
        assert_eq!(failed.error_code(), Some(ErrorCode::NotFound));
    }

    #[test]
    fn and_then_turns_conversion_errors_into_failures() {
        let result = OperationResult::ok(3, None)
            .and_then(|_| Err::<u8, _>(ErrorInfo::new(ErrorCode::TypeMismatch, "nope")));
        assert!(!result.success);
        assert_eq!(result.error_code(), Some(ErrorCode::TypeMismatch));
    }

    #[test]
    fn serializes_camel_case_without_empty_fields() {
        let result: OperationResult<()> =
            OperationResult::failure(ErrorInfo::new(ErrorCode::NotFound, "gone"));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({"success": false, "error": {"code": "NOT_FOUND", "message": "gone"}})
        );
    }
}
