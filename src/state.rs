use std::sync::Arc;

use crate::{
    config::Config,
    error::AppError,
    market::{cache::PriceCache, source},
    visits::VisitCounter,
};

/// Process-lifetime state shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub price_cache: Arc<PriceCache>,
    pub visits: Arc<VisitCounter>,
}

impl AppState {
    pub fn new(price_cache: PriceCache) -> Self {
        Self {
            price_cache: Arc::new(price_cache),
            visits: Arc::new(VisitCounter::new()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let source = source::from_config(&config.price)?;
        let cache = PriceCache::new(source, config.price.cache_ttl);
        Ok(Self::new(cache))
    }
}
