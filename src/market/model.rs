use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known quote held by [`PriceCache`](super::cache::PriceCache).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CachedPrice {
    pub value: Option<f64>,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceResponse {
    pub price: f64,
    pub visitors: u64,
}

/// `GET /simple/price` body: `{ "<coin id>": { "<vs currency>": 2500.12 } }`.
pub type CoinGeckoSimplePrice = HashMap<String, HashMap<String, f64>>;

#[derive(Debug, Deserialize)]
pub struct CmcQuotesResponse {
    pub data: HashMap<String, CmcAsset>,
}

#[derive(Debug, Deserialize)]
pub struct CmcAsset {
    pub quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
pub struct CmcQuote {
    pub price: Option<f64>,
}
