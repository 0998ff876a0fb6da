use axum::{extract::State, Json};

use crate::{market::model::PriceResponse, state::AppState};

// Never fails: the cache degrades to a stale or zero price instead.
pub async fn get_price(State(state): State<AppState>) -> Json<PriceResponse> {
  let price = state.price_cache.get_price().await;

  Json(PriceResponse {
      price,
      visitors: state.visits.current(),
  })
}
