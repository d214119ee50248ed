//! HTTP mapping for the allocation error taxonomy.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::{AllocationError, UnknownEntityKind};

/// Error payload returned to API consumers.
///
/// `retryable` distinguishes exhaustion (try again later) from terminal
/// failures the caller must not retry until state changes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable error code.
    #[schema(example = "approval_required")]
    pub code: String,
    /// Human-readable error message.
    #[schema(example = "clinic 6b… has not passed its approval gate")]
    pub message: String,
    /// Whether retrying later can succeed without external state changes.
    pub retryable: bool,
}

/// Transport wrapper turning [`AllocationError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(AllocationError);

impl ApiError {
    /// Stable code for the wrapped error.
    fn code(&self) -> &'static str {
        match &self.0 {
            AllocationError::UnknownEntityKind(_) => "unknown_entity_kind",
            AllocationError::EntityNotFound { .. } => "entity_not_found",
            AllocationError::ApprovalRequired { .. } => "approval_required",
            AllocationError::MissingSourceField { .. } => "missing_source_field",
            AllocationError::InvalidSlugFormat { .. } => "invalid_slug_format",
            AllocationError::SuffixExhausted { .. } => "suffix_exhausted",
            AllocationError::RetriesExhausted { .. } => "retries_exhausted",
            AllocationError::AlreadyLocked { .. } => "already_locked",
            AllocationError::Store(_) => "store_unavailable",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AllocationError> for ApiError {
    fn from(error: AllocationError) -> Self {
        Self(error)
    }
}

impl From<UnknownEntityKind> for ApiError {
    fn from(error: UnknownEntityKind) -> Self {
        Self(AllocationError::UnknownEntityKind(error))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AllocationError::UnknownEntityKind(_) => StatusCode::BAD_REQUEST,
            AllocationError::EntityNotFound { .. } => StatusCode::NOT_FOUND,
            AllocationError::ApprovalRequired { .. } | AllocationError::AlreadyLocked { .. } => {
                StatusCode::CONFLICT
            }
            AllocationError::MissingSourceField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            // A grammar violation slipping past the normalizer is a bug, not
            // caller input trouble.
            AllocationError::InvalidSlugFormat { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AllocationError::SuffixExhausted { .. }
            | AllocationError::RetriesExhausted { .. }
            | AllocationError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self.0, AllocationError::InvalidSlugFormat { .. }) {
            error!(error = %self.0, "allocator produced a malformed slug");
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: self.code().to_owned(),
            message: self.0.to_string(),
            retryable: self.0.is_retryable(),
        })
    }
}
