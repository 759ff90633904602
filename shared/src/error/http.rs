//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 400 Bad Request
            Self::ValidationFailed | Self::InvalidRequest | Self::RequiredField => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            Self::SignatureInvalid
            | Self::TimestampStale
            | Self::SecretMissing
            | Self::TokenExpired
            | Self::InvalidCredentials
            | Self::TokenExchangeFailed => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            Self::NotFound | Self::OrderNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::TransitionRejected | Self::DuplicateEvent => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            Self::MissingTrackingNumber | Self::CarrierNotConfigured => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 502 / 504 upstream failures
            Self::UpstreamError | Self::MarketplaceError | Self::CarrierError => {
                StatusCode::BAD_GATEWAY
            }
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            Self::Unknown | Self::InternalError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
