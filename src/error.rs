use std::error::Error as StdError;

use thiserror::Error;

/// Broad classification of a failure.
///
/// The discriminants are stable and start at 1; they appear as the
/// `custom_code` metadata of rendered RPC statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Any failure that cannot be confidently attributed to any other code.
    Unknown = 1,
    NotFound = 2,
    /// The caller supplied malformed input (a wrongly sized key, an
    /// unreadable file, an invalid setting).
    BadRequest = 3,
    /// A cryptographic or operational failure not attributable to the
    /// shape of the caller's input.
    ///
    /// Use of Internal is never a guarantee the error is not due to the
    /// caller: a tampered token is reported as Internal because the code
    /// cannot tell tampering from corruption.
    Internal = 4,
    Unauthenticated = 5,
    Unauthorized = 6,
    Conflict = 7,
    QuotaExceeded = 8,
}

impl ErrorCode {
    /// The stable numeric value of this code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The secret key is not exactly 32 bytes.
    InvalidKeyLength,
    /// The block cipher could not be constructed from the key.
    CipherInit,
    /// The block cipher could not be wrapped in GCM.
    AeadInit,
    /// The secure random source failed or returned too few bytes.
    NonceGeneration,
    /// AEAD sealing failed.
    SealFailure,
    /// The token is not valid unpadded base64url.
    TokenDecode,
    /// The decoded token cannot even hold a nonce.
    TokenTooShort,
    /// Authentication failed due to a wrong key, tampering or corruption.
    AuthenticationFailed,
    /// The opened plaintext is not UTF-8 text.
    InvalidUtf8,
    /// A secret key could not be obtained from the configured reader.
    KeyUnavailable,
    /// Settings could not be loaded or are invalid.
    Config,
    /// The logger could not be built or installed.
    Logging,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
    /// An operation that cannot fail for well-formed values did fail.
    InternalInvariant,
}

#[derive(Debug, Error)]
#[error("{msg}{}", cause_suffix(.source.as_deref()))]
pub struct SealError {
    /// Broad error code, always provided.
    pub code: ErrorCode,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

fn cause_suffix(source: Option<&(dyn StdError + Send + Sync + 'static)>) -> String {
    match source {
        Some(source) => format!(": {source}"),
        None => String::new(),
    }
}

impl SealError {
    /// Creates a new error with a required code and display message.
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(code: ErrorCode, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            code,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        code: ErrorCode,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        code: ErrorCode,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The bare message, without any chained cause.
    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let code = self.code;
        let kind = self.kind;
        Self {
            code,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SealError>;
