use axum::{routing::get, Router};

use crate::{market::handler, state::AppState};

pub fn market_routes(state: AppState) -> Router {
  Router::new()
      .route("/price", get(handler::get_price))
      .with_state(state)
}
