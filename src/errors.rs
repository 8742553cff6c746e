use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Machine-readable error code (e.g., "PRICE_MISMATCH")
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Address does not belong to the user: {0}")]
    AddressUnauthorized(String),

    #[error("Price mismatch: {0}")]
    PriceMismatch(String),

    #[error("Photo count mismatch: {0}")]
    PhotoCountMismatch(String),

    #[error("Subtotal mismatch: {0}")]
    SubtotalMismatch(String),

    #[error("Tax mismatch: {0}")]
    TaxMismatch(String),

    #[error("Total mismatch: {0}")]
    TotalMismatch(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment gateway error: {0}")]
    GatewayError(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Session metadata missing: {0}")]
    MetadataMissing(String),

    #[error("Session metadata invalid: {0}")]
    MetadataInvalid(String),

    #[error("Order reconciliation failed: {0}")]
    ReconcileError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::HashError(_)
            | Self::InternalError(_)
            | Self::ReconcileError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UserNotFound(_)
            | Self::AddressNotFound(_)
            | Self::PackageNotFound(_)
            | Self::OrderNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::MetadataMissing(_)
            | Self::MetadataInvalid(_)
            | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::PriceMismatch(_)
            | Self::PhotoCountMismatch(_)
            | Self::SubtotalMismatch(_)
            | Self::TaxMismatch(_)
            | Self::TotalMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) | Self::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::AddressUnauthorized(_) => StatusCode::FORBIDDEN,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Machine-readable code carried in the error body so clients can
    /// distinguish "your cart doesn't match our records" from "you can't do
    /// this" from "we couldn't reach the payment provider".
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
            Self::PackageNotFound(_) => "PACKAGE_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AddressUnauthorized(_) => "ADDRESS_UNAUTHORIZED",
            Self::PriceMismatch(_) => "PRICE_MISMATCH",
            Self::PhotoCountMismatch(_) => "PHOTO_COUNT_MISMATCH",
            Self::SubtotalMismatch(_) => "SUBTOTAL_MISMATCH",
            Self::TaxMismatch(_) => "TAX_MISMATCH",
            Self::TotalMismatch(_) => "TOTAL_MISMATCH",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::GatewayError(_) => "GATEWAY_ERROR",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::MetadataMissing(_) => "METADATA_MISSING",
            Self::MetadataInvalid(_) => "METADATA_INVALID",
            Self::ReconcileError(_) => "RECONCILE_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::HashError(_) | Self::InternalError(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_)
            | Self::HashError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            Self::ReconcileError(_) => "Order reconciliation failed".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::UserNotFound("7".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::PriceMismatch("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::AddressUnauthorized("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::InvalidSignature("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::GatewayError("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::ReconcileError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn consistency_errors_keep_distinct_codes() {
        assert_eq!(
            ServiceError::PriceMismatch("x".into()).code(),
            "PRICE_MISMATCH"
        );
        assert_eq!(
            ServiceError::PhotoCountMismatch("x".into()).code(),
            "PHOTO_COUNT_MISMATCH"
        );
        assert_eq!(
            ServiceError::SubtotalMismatch("x".into()).code(),
            "SUBTOTAL_MISMATCH"
        );
        assert_eq!(ServiceError::TaxMismatch("x".into()).code(), "TAX_MISMATCH");
        assert_eq!(
            ServiceError::TotalMismatch("x".into()).code(),
            "TOTAL_MISMATCH"
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::HashError("argon2 params".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::InternalError("stack".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::PriceMismatch("package Premium".into()).response_message(),
            "Price mismatch: package Premium"
        );
    }

    #[tokio::test]
    async fn error_body_carries_machine_code() {
        let response = ServiceError::SubtotalMismatch("claimed 500.00".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "SUBTOTAL_MISMATCH");
    }
}
