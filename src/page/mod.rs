use axum::{extract::State, response::Html, routing::get, Router};
use tracing::debug;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

pub fn page_routes(state: AppState) -> Router {
  Router::new()
      .route("/", get(home))
      .with_state(state)
}

pub async fn home(State(state): State<AppState>) -> Html<&'static str> {
  let visits = state.visits.increment();
  debug!(visits, "landing page served");
  Html(INDEX_HTML)
}
