//! Transport-neutral RPC status rendering
//!
//! Maps [`SealError`] and [`ValidationError`] onto gRPC canonical status
//! codes with structured details, so a server layer can hand them to its
//! RPC framework without knowing the error taxonomy.

use crate::error::{ErrorCode, ErrorKind, Result, SealError};
use crate::validation::{FieldViolation, ValidationError};
use serde::Serialize;
use std::collections::BTreeMap;

/// gRPC canonical status codes, with their wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i32")]
pub enum RpcCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl From<RpcCode> for i32 {
    fn from(code: RpcCode) -> Self {
        code as i32
    }
}

impl From<ErrorCode> for RpcCode {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::NotFound => RpcCode::NotFound,
            ErrorCode::BadRequest => RpcCode::InvalidArgument,
            ErrorCode::Internal => RpcCode::Internal,
            ErrorCode::Unauthenticated => RpcCode::Unauthenticated,
            ErrorCode::Unauthorized => RpcCode::PermissionDenied,
            ErrorCode::Conflict => RpcCode::AlreadyExists,
            ErrorCode::QuotaExceeded => RpcCode::ResourceExhausted,
            ErrorCode::Unknown => RpcCode::Unknown,
        }
    }
}

/// Structured detail attached to a [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusDetail {
    ErrorInfo {
        reason: String,
        metadata: BTreeMap<String, String>,
    },
    BadRequest {
        field_violations: Vec<FieldViolation>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub code: RpcCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<StatusDetail>,
}

impl Status {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: StatusDetail) -> Self {
        self.details.push(detail);
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(serialize_error)
    }
}

fn serialize_error(err: serde_json::Error) -> SealError {
    SealError::with_kind_and_source(
        ErrorCode::Internal,
        ErrorKind::InternalInvariant,
        "failed to serialize status",
        err,
    )
}

impl SealError {
    /// Renders this error as an RPC status.
    ///
    /// The status message is the bare message. The chained cause, when
    /// there is one, travels as an `ErrorInfo` reason.
    pub fn status(&self) -> Status {
        let status = Status::new(self.code.into(), self.message());
        match self.source_error() {
            Some(source) => status.with_detail(StatusDetail::ErrorInfo {
                reason: source.to_string(),
                metadata: BTreeMap::from([(
                    "custom_code".to_string(),
                    self.code.as_u8().to_string(),
                )]),
            }),
            None => status,
        }
    }
}

impl ValidationError {
    pub fn status(&self) -> Status {
        Status::new(RpcCode::InvalidArgument, "invalid request").with_detail(
            StatusDetail::BadRequest {
                field_violations: self.field_violations.clone(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::Cipher;
    use std::io;

    #[test]
    fn test_code_mapping() {
        let cases = [
            (ErrorCode::Unknown, RpcCode::Unknown),
            (ErrorCode::NotFound, RpcCode::NotFound),
            (ErrorCode::BadRequest, RpcCode::InvalidArgument),
            (ErrorCode::Internal, RpcCode::Internal),
            (ErrorCode::Unauthenticated, RpcCode::Unauthenticated),
            (ErrorCode::Unauthorized, RpcCode::PermissionDenied),
            (ErrorCode::Conflict, RpcCode::AlreadyExists),
            (ErrorCode::QuotaExceeded, RpcCode::ResourceExhausted),
        ];
        for (code, expected) in cases {
            assert_eq!(RpcCode::from(code), expected, "{code:?}");
        }
    }

    #[test]
    fn test_status_without_source_has_no_details() {
        let err = Cipher::new(b"shortkey").unwrap_err();
        let status = err.status();
        assert_eq!(status.code, RpcCode::InvalidArgument);
        assert_eq!(status.message, "secret key must be 32 bytes long");
        assert!(status.details.is_empty());
    }

    #[test]
    fn test_status_with_source_has_error_info() {
        let err = SealError::with_source(
            ErrorCode::Internal,
            "could not create nonce",
            io::Error::other("entropy pool empty"),
        );
        let status = err.status();
        assert_eq!(status.code, RpcCode::Internal);
        assert_eq!(status.message, "could not create nonce");
        assert_eq!(
            status.details,
            vec![StatusDetail::ErrorInfo {
                reason: "entropy pool empty".to_string(),
                metadata: BTreeMap::from([("custom_code".to_string(), "4".to_string())]),
            }]
        );
    }

    #[test]
    fn test_authentication_failure_status_is_opaque() {
        let cipher = Cipher::new(b"39b04101cac8b8f8c24f4780fd5f1950").unwrap();
        let other = Cipher::new(b"0123456789abcdef0123456789abcdef").unwrap();
        let token = cipher.encrypt("Hello, World!").unwrap();

        let status = other.decrypt(&token).unwrap_err().status();
        assert_eq!(status.code, RpcCode::Internal);
        assert_eq!(status.message, "could not decrypt ciphertext");
        assert!(status.details.is_empty());
    }

    #[test]
    fn test_validation_status() {
        let err = ValidationError::new(vec![FieldViolation::new(
            "card_number",
            "must be 16 digits",
        )]);
        let status = err.status();
        assert_eq!(status.code, RpcCode::InvalidArgument);
        assert_eq!(status.message, "invalid request");
        assert_eq!(
            status.details,
            vec![StatusDetail::BadRequest {
                field_violations: vec![FieldViolation::new("card_number", "must be 16 digits")],
            }]
        );
    }

    #[test]
    fn test_status_json() {
        let err = SealError::with_source(
            ErrorCode::BadRequest,
            "failed to read from input.txt",
            io::Error::other("not found"),
        );
        let json: serde_json::Value =
            serde_json::from_str(&err.status().to_json().unwrap()).unwrap();
        assert_eq!(json["code"], 3);
        assert_eq!(json["message"], "failed to read from input.txt");
        assert_eq!(json["details"][0]["type"], "error_info");
        assert_eq!(json["details"][0]["reason"], "not found");
        assert_eq!(json["details"][0]["metadata"]["custom_code"], "3");

        let json: serde_json::Value =
            serde_json::from_str(&Status::new(RpcCode::Ok, "").to_json().unwrap()).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_serialize_error_is_internal_invariant() {
        let cause = serde_json::from_str::<u8>("not a number").unwrap_err();
        let err = serialize_error(cause);
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.kind, Some(ErrorKind::InternalInvariant));
        assert_eq!(err.message(), "failed to serialize status");
        assert!(err.source_error().is_some());
    }
}
