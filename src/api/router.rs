use axum::{
  http::{StatusCode, Uri},
  routing::get,
  Json, Router,
};
use serde_json::json;
use tower_http::{
  compression::CompressionLayer,
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{
  error::AppError,
  market::routes::market_routes,
  page::page_routes,
  state::AppState,
};

pub fn create_router(state: AppState) -> Router {
  // Setup CORS
  let cors = CorsLayer::new()
      .allow_origin(Any)
      .allow_methods(Any)
      .allow_headers(Any);

  let api_routes = Router::new()
      .route("/health", get(health_check));

  Router::new()
      .merge(page_routes(state.clone()))
      .merge(market_routes(state))
      .nest("/api/v1", api_routes)
      .fallback(not_found)
      .layer(CompressionLayer::new())
      .layer(TraceLayer::new_for_http())
      .layer(cors)
}

async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
  (
      StatusCode::OK,
      Json(json!({
          "status": "success",
          "message": "Server is running"
      })),
  )
}

async fn not_found(uri: Uri) -> AppError {
  AppError::NotFoundError(uri.path().to_string())
}
