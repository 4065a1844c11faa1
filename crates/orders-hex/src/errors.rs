use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orders_types::domain::order::ValidationError;
use orders_types::domain::status::TransitionError;
use orders_types::ports::order_repository::RepoError;
use orders_types::ports::product_validator::ValidatorError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Products not found: {0}")]
    ProductNotFound(String),

    #[error("Product service unavailable: {0}")]
    ValidatorUnavailable(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] RepoError),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::ProductNotFound(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidatorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<ValidatorError> for AppError {
    fn from(e: ValidatorError) -> Self {
        match e {
            ValidatorError::ProductNotFound(ids) => AppError::ProductNotFound(ids.join(", ")),
            ValidatorError::Unavailable(reason) => AppError::ValidatorUnavailable(reason),
            ValidatorError::EmptyRequest => {
                AppError::Validation(ValidatorError::EmptyRequest.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let message = match &self {
            AppError::Persistence(e) => {
                tracing::error!(error = %e, "persistence failure");
                "internal error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::to_string(&ErrorBody {
            status: code.as_u16(),
            message,
        })
        .unwrap_or_else(|_| "{\"status\":500,\"message\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orders_types::domain::status::OrderStatus;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (AppError::from(ValidationError::EmptyItems), 400),
            (AppError::NotFound("x".into()), 404),
            (
                AppError::from(ValidatorError::ProductNotFound(vec!["p1".into()])),
                400,
            ),
            (AppError::from(ValidatorError::Unavailable("timeout".into())), 503),
            (
                AppError::from(TransitionError {
                    from: OrderStatus::Pending,
                    to: OrderStatus::Delivered,
                }),
                409,
            ),
            (AppError::from(RepoError::Db("locked".into())), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status_code().as_u16(), code, "{err}");
        }
    }

    #[test]
    fn empty_catalog_request_is_a_validation_failure() {
        let err = AppError::from(ValidatorError::EmptyRequest);
        assert!(matches!(err, AppError::Validation(_)));
    }
}
