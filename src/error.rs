use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
  #[error("Config error: {0}")]
  ConfigError(String),

  #[error("Not found: {0}")]
  NotFoundError(String),

  #[error("Internal server error: {0}")]
  InternalError(String),
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
      Self::InternalError(format!("HTTP client error: {}", err))
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
      let (status, error_message) = match self {
          AppError::NotFoundError(_) => (StatusCode::NOT_FOUND, self.to_string()),
          AppError::ConfigError(_) => (
              StatusCode::INTERNAL_SERVER_ERROR,
              "A configuration error occurred".to_string(),
          ),
          AppError::InternalError(err) => (
              StatusCode::INTERNAL_SERVER_ERROR,
              format!("An internal server error occurred: {}", err),
          ),
      };

      let body = Json(json!({
          "status": "error",
          "message": error_message,
      }));

      (status, body).into_response()
  }
}
