//! Error types for registry access and package verification.

use std::fmt;
use std::time::Duration;

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The requested resource does not exist (404).
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Non-success status that retrying will not fix.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Transport failure or server error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Invalid response from registry.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Local filesystem failure while storing a download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Network { .. })
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Stable kind of a verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PackageIsInvalidZip,
    SignatureArchiveIsInvalidZip,
    ExtensionManifestIsInvalid,
    SignatureIsMissing,
    SignatureManifestIsMissing,
    /// The manifest does not have the required shape.
    SignatureManifestIsMalformed,
    /// The manifest is well formed but does not describe this package.
    SignatureManifestIsInvalid,
    EntryIsTampered,
    SignatureIsInvalid,
    KeyFileNotFound,
    PublicKeyIsInvalid,
    PublicKeyUnreachable,
}

impl ErrorCode {
    /// Kind name, as reported to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageIsInvalidZip => "PackageIsInvalidZip",
            Self::SignatureArchiveIsInvalidZip => "SignatureArchiveIsInvalidZip",
            Self::ExtensionManifestIsInvalid => "ExtensionManifestIsInvalid",
            Self::SignatureIsMissing => "SignatureIsMissing",
            Self::SignatureManifestIsMissing => "SignatureManifestIsMissing",
            Self::SignatureManifestIsMalformed => "SignatureManifestIsMalformed",
            Self::SignatureManifestIsInvalid => "SignatureManifestIsInvalid",
            Self::EntryIsTampered => "EntryIsTampered",
            Self::SignatureIsInvalid => "SignatureIsInvalid",
            Self::KeyFileNotFound => "KeyFileNotFound",
            Self::PublicKeyIsInvalid => "PublicKeyIsInvalid",
            Self::PublicKeyUnreachable => "PublicKeyUnreachable",
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Bad inputs
            Self::PackageIsInvalidZip
            | Self::SignatureArchiveIsInvalidZip
            | Self::ExtensionManifestIsInvalid => 1,

            // Key resolution
            Self::KeyFileNotFound | Self::PublicKeyIsInvalid => 2,
            Self::PublicKeyUnreachable => 5,

            // Incomplete signature archive
            Self::SignatureIsMissing
            | Self::SignatureManifestIsMissing
            | Self::SignatureManifestIsMalformed => 3,

            // Integrity failures
            Self::SignatureManifestIsInvalid
            | Self::EntryIsTampered
            | Self::SignatureIsInvalid => 4,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed verification failure.
///
/// `did_execute` is true when the failure was found by an integrity check
/// that ran (manifest comparison, signature check), and false when
/// verification aborted before reaching one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct VerificationError {
    pub code: ErrorCode,
    pub did_execute: bool,
    pub message: String,
}

impl VerificationError {
    pub fn new(code: ErrorCode, did_execute: bool, message: impl Into<String>) -> Self {
        Self {
            code,
            did_execute,
            message: message.into(),
        }
    }

    /// Failure before any integrity check ran.
    pub fn aborted(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, false, message)
    }

    /// Failure reported by an integrity check.
    pub fn executed(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, true, message)
    }
}
