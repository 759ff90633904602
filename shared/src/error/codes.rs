//! Unified error codes for the Shipbridge orchestrator
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors (webhook signatures, OAuth credentials)
//! - 4xxx: Order / reconciliation errors
//! - 5xxx: Upstream errors (carrier or marketplace collaborators)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed (missing or malformed fields on a create/update request)
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Authentication ====================
    /// Webhook signature does not match the payload
    SignatureInvalid = 1001,
    /// Webhook timestamp outside the freshness window
    TimestampStale = 1002,
    /// No webhook secret configured for the carrier
    SecretMissing = 1003,
    /// OAuth access token has expired
    TokenExpired = 1004,
    /// Invalid carrier credentials
    InvalidCredentials = 1005,
    /// OAuth client-credentials exchange failed
    TokenExchangeFailed = 1006,

    // ==================== 4xxx: Order ====================
    /// Order not found in the state store
    OrderNotFound = 4001,
    /// Attempted backward lifecycle transition
    TransitionRejected = 4002,
    /// Order has no tracking number yet
    MissingTrackingNumber = 4003,
    /// Webhook event already processed (idempotent replay, not a failure)
    DuplicateEvent = 4004,
    /// Selected carrier has no configured adapter
    CarrierNotConfigured = 4005,

    // ==================== 5xxx: Upstream ====================
    /// Carrier or marketplace returned an HTTP error
    UpstreamError = 5001,
    /// No response from the collaborator within the configured bound
    UpstreamTimeout = 5002,
    /// Marketplace-specific upstream failure
    MarketplaceError = 5003,
    /// Carrier-specific upstream failure
    CarrierError = 5004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Invalid or incomplete configuration
    ConfigError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Required field missing",

            Self::SignatureInvalid => "Invalid webhook signature",
            Self::TimestampStale => "Webhook timestamp too old",
            Self::SecretMissing => "No webhook secret configured for carrier",
            Self::TokenExpired => "Access token expired",
            Self::InvalidCredentials => "Invalid credentials",
            Self::TokenExchangeFailed => "OAuth token exchange failed",

            Self::OrderNotFound => "Order not found",
            Self::TransitionRejected => "Backward state transition rejected",
            Self::MissingTrackingNumber => "Order has no tracking number",
            Self::DuplicateEvent => "Event already processed",
            Self::CarrierNotConfigured => "Carrier not configured",

            Self::UpstreamError => "Upstream service error",
            Self::UpstreamTimeout => "Upstream request timed out",
            Self::MarketplaceError => "Marketplace request failed",
            Self::CarrierError => "Carrier request failed",

            Self::InternalError => "Internal server error",
            Self::ConfigError => "Configuration error",
        }
    }

    /// Whether a failure with this code is safe to retry as-is
    ///
    /// Upstream flakiness and timeouts are retry-safe; validation,
    /// authentication and lifecycle errors are not.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            Self::UpstreamError
                | Self::UpstreamTimeout
                | Self::MarketplaceError
                | Self::CarrierError
                | Self::TokenExchangeFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            5 => Self::InvalidRequest,
            7 => Self::RequiredField,

            1001 => Self::SignatureInvalid,
            1002 => Self::TimestampStale,
            1003 => Self::SecretMissing,
            1004 => Self::TokenExpired,
            1005 => Self::InvalidCredentials,
            1006 => Self::TokenExchangeFailed,

            4001 => Self::OrderNotFound,
            4002 => Self::TransitionRejected,
            4003 => Self::MissingTrackingNumber,
            4004 => Self::DuplicateEvent,
            4005 => Self::CarrierNotConfigured,

            5001 => Self::UpstreamError,
            5002 => Self::UpstreamTimeout,
            5003 => Self::MarketplaceError,
            5004 => Self::CarrierError,

            9001 => Self::InternalError,
            9002 => Self::ConfigError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}
