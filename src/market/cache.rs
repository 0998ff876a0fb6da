//! Short-lived memo around a [`PriceSource`].
//!
//! The cache is either cold (nothing fetched yet) or warm (a value is held,
//! possibly stale). A successful fetch is the only way to replace a warm
//! value. Failures fall back to the stale value, or to `0.0` while cold, so
//! callers always get a number.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::market::{model::CachedPrice, source::PriceSource};

#[derive(Debug, Default)]
struct CacheState {
    price: CachedPrice,
    // Monotonic twin of `price.fetched_at`; ages are measured against this.
    refreshed_at: Option<Instant>,
}

pub struct PriceCache {
    source: Arc<dyn PriceSource>,
    freshness_window: StdDuration,
    // Held across the refresh so concurrent stale readers share one fetch.
    state: Mutex<CacheState>,
    // Bumped after every finished fetch, successful or not.
    attempts: AtomicU64,
}

impl PriceCache {
    pub fn new(source: Arc<dyn PriceSource>, freshness_window: Duration) -> Self {
        Self {
            source,
            freshness_window: freshness_window.to_std().unwrap_or_default(),
            state: Mutex::new(CacheState::default()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn freshness_window(&self) -> StdDuration {
        self.freshness_window
    }

    pub async fn get_price(&self) -> f64 {
        self.get_price_at(Instant::now()).await
    }

    /// Same as [`get_price`](Self::get_price) with `now` supplied by the caller.
    pub async fn get_price_at(&self, now: Instant) -> f64 {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if let Some(value) = state.price.value {
            if self.attempts.load(Ordering::Acquire) != seen {
                debug!(price = value, "reusing result of concurrent refresh");
                return value;
            }
            if !self.is_stale(&state, now) {
                debug!(price = value, "serving cached price");
                return value;
            }
        }

        match self.source.fetch_price().await {
            Ok(price) => {
                info!(source = self.source.name(), price, "price refreshed");
                state.price.value = Some(price);
                state.price.fetched_at = Some(Utc::now());
                state.refreshed_at = Some(now);
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    stale = state.price.value.is_some(),
                    "price fetch failed, using fallback"
                );
                if state.price.value.is_none() {
                    state.price.value = Some(0.0);
                }
            }
        }
        self.attempts.fetch_add(1, Ordering::Release);

        state.price.value.unwrap_or(0.0)
    }

    pub async fn snapshot(&self) -> CachedPrice {
        self.state.lock().await.price
    }

    fn is_stale(&self, state: &CacheState, now: Instant) -> bool {
        match state.refreshed_at {
            Some(refreshed_at) => {
                now.saturating_duration_since(refreshed_at) > self.freshness_window
            }
            // Only the zero fallback has a value without a fetch time.
            None => true,
        }
    }
}
