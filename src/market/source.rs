//! Upstream price lookups.
//!
//! A [`PriceSource`] performs exactly one remote request per call and reports
//! every failure as a [`PriceFetchError`]. Deciding what to do with a failure
//! is left to the caller (see [`PriceCache`](super::cache::PriceCache)).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::{
    config::{PriceConfig, PriceProvider},
    error::AppError,
    market::model::{CmcQuotesResponse, CoinGeckoSimplePrice},
};

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const COINMARKETCAP_BASE_URL: &str = "https://pro-api.coinmarketcap.com";

#[derive(Debug, Error, PartialEq)]
pub enum PriceFetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for PriceFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Provider name used in log lines.
    fn name(&self) -> &'static str;

    async fn fetch_price(&self) -> Result<f64, PriceFetchError>;
}

/// CoinGecko `simple/price`, public or demo-key access.
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    coin_id: String,
    vs_currency: String,
}

impl CoinGeckoSource {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        Self {
            client,
            base_url: base_url(config, COINGECKO_BASE_URL),
            api_key: config.api_key.clone(),
            coin_id: config.coin_id.to_lowercase(),
            vs_currency: config.vs_currency.to_lowercase(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_price(&self) -> Result<f64, PriceFetchError> {
        let mut request = self
            .client
            .get(format!("{}/simple/price", self.base_url))
            .query(&[
                ("ids", self.coin_id.as_str()),
                ("vs_currencies", self.vs_currency.as_str()),
            ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let body: CoinGeckoSimplePrice = send_json(request).await?;

        let price = body
            .get(&self.coin_id)
            .and_then(|quotes| quotes.get(&self.vs_currency))
            .copied()
            .ok_or_else(|| {
                PriceFetchError::Malformed(format!(
                    "missing {}.{} in response",
                    self.coin_id, self.vs_currency
                ))
            })?;

        validate_price(price)
    }
}

/// CoinMarketCap `quotes/latest`; requires an API key.
pub struct CoinMarketCapSource {
    client: Client,
    base_url: String,
    api_key: String,
    symbol: String,
    convert: String,
}

impl CoinMarketCapSource {
    pub fn new(client: Client, config: &PriceConfig) -> Result<Self, AppError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AppError::ConfigError("CoinMarketCap requires PRICE_API_KEY".into())
        })?;

        Ok(Self {
            client,
            base_url: base_url(config, COINMARKETCAP_BASE_URL),
            api_key,
            symbol: config.symbol.to_uppercase(),
            convert: config.vs_currency.to_uppercase(),
        })
    }
}

#[async_trait]
impl PriceSource for CoinMarketCapSource {
    fn name(&self) -> &'static str {
        "coinmarketcap"
    }

    async fn fetch_price(&self) -> Result<f64, PriceFetchError> {
        let request = self
            .client
            .get(format!("{}/v1/cryptocurrency/quotes/latest", self.base_url))
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("convert", self.convert.as_str()),
            ])
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        let body: CmcQuotesResponse = send_json(request).await?;

        let price = body
            .data
            .get(&self.symbol)
            .and_then(|asset| asset.quote.get(&self.convert))
            .and_then(|quote| quote.price)
            .ok_or_else(|| {
                PriceFetchError::Malformed(format!(
                    "missing data.{}.quote.{}.price in response",
                    self.symbol, self.convert
                ))
            })?;

        validate_price(price)
    }
}

/// Builds the HTTP client every source shares; the timeout bounds each fetch.
pub fn build_client(config: &PriceConfig) -> Result<Client, AppError> {
    let timeout = config
        .fetch_timeout
        .to_std()
        .map_err(|_| AppError::ConfigError("Fetch timeout must be positive".into()))?;

    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(client)
}

/// Picks the configured provider.
pub fn from_config(config: &PriceConfig) -> Result<Arc<dyn PriceSource>, AppError> {
    let client = build_client(config)?;

    let source: Arc<dyn PriceSource> = match config.provider {
        PriceProvider::CoinGecko => Arc::new(CoinGeckoSource::new(client, config)),
        PriceProvider::CoinMarketCap => Arc::new(CoinMarketCapSource::new(client, config)?),
    };

    Ok(source)
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PriceFetchError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PriceFetchError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    debug!(len = bytes.len(), "price response received");

    serde_json::from_slice(&bytes).map_err(|e| PriceFetchError::Malformed(e.to_string()))
}

fn validate_price(price: f64) -> Result<f64, PriceFetchError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(PriceFetchError::Malformed(format!("price {} is not a valid quote", price)))
    }
}

fn base_url(config: &PriceConfig, default: &str) -> String {
    config
        .api_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use chrono::Duration;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn spawn_stub(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config_for(url: &str) -> PriceConfig {
        PriceConfig {
            api_url: Some(url.to_string()),
            fetch_timeout: Duration::milliseconds(500),
            ..PriceConfig::default()
        }
    }

    #[tokio::test]
    async fn coingecko_reads_nested_price() {
        let app = Router::new().route(
            "/simple/price",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("ids").map(String::as_str), Some("ethereum"));
                assert_eq!(params.get("vs_currencies").map(String::as_str), Some("usd"));
                Json(json!({ "ethereum": { "usd": 2500.12 } }))
            }),
        );
        let url = spawn_stub(app).await;
        let config = config_for(&url);
        let source = CoinGeckoSource::new(build_client(&config).unwrap(), &config);

        assert_eq!(source.fetch_price().await, Ok(2500.12));
    }

    #[tokio::test]
    async fn coingecko_rate_limit_is_a_status_error() {
        let app = Router::new().route(
            "/simple/price",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = spawn_stub(app).await;
        let config = config_for(&url);
        let source = CoinGeckoSource::new(build_client(&config).unwrap(), &config);

        assert_eq!(source.fetch_price().await, Err(PriceFetchError::Status(429)));
    }

    #[tokio::test]
    async fn coingecko_missing_coin_is_malformed() {
        let app = Router::new().route("/simple/price", get(|| async { Json(json!({})) }));
        let url = spawn_stub(app).await;
        let config = config_for(&url);
        let source = CoinGeckoSource::new(build_client(&config).unwrap(), &config);

        assert!(matches!(
            source.fetch_price().await,
            Err(PriceFetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let app = Router::new().route("/simple/price", get(|| async { "<html>oops</html>" }));
        let url = spawn_stub(app).await;
        let config = config_for(&url);
        let source = CoinGeckoSource::new(build_client(&config).unwrap(), &config);

        assert!(matches!(
            source.fetch_price().await,
            Err(PriceFetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().route(
            "/simple/price",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                Json(json!({ "ethereum": { "usd": 1.0 } }))
            }),
        );
        let url = spawn_stub(app).await;
        let config = PriceConfig {
            fetch_timeout: Duration::milliseconds(100),
            ..config_for(&url)
        };
        let source = CoinGeckoSource::new(build_client(&config).unwrap(), &config);

        assert_eq!(source.fetch_price().await, Err(PriceFetchError::Timeout));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Bind then drop so nothing listens on the port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = config_for(&format!("http://{}", addr));
        let source = CoinGeckoSource::new(build_client(&config).unwrap(), &config);

        assert!(matches!(
            source.fetch_price().await,
            Err(PriceFetchError::Network(_))
        ));
    }

    #[tokio::test]
    async fn coinmarketcap_sends_key_and_reads_quote() {
        let app = Router::new().route(
            "/v1/cryptocurrency/quotes/latest",
            get(|headers: axum::http::HeaderMap| async move {
                if headers.get("x-cmc_pro_api_key").map(|v| v.as_bytes()) != Some(b"secret".as_slice()) {
                    return (StatusCode::UNAUTHORIZED, Json(Value::Null));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "status": { "error_code": 0 },
                        "data": { "ETH": { "quote": { "USD": { "price": 2510.5 } } } }
                    })),
                )
            }),
        );
        let url = spawn_stub(app).await;
        let config = PriceConfig {
            provider: PriceProvider::CoinMarketCap,
            api_key: Some("secret".into()),
            ..config_for(&url)
        };
        let source = CoinMarketCapSource::new(build_client(&config).unwrap(), &config).unwrap();

        assert_eq!(source.fetch_price().await, Ok(2510.5));
    }

    async fn cmc_source_for(app: Router, api_key: &str) -> CoinMarketCapSource {
        let url = spawn_stub(app).await;
        let config = PriceConfig {
            provider: PriceProvider::CoinMarketCap,
            api_key: Some(api_key.into()),
            ..config_for(&url)
        };
        CoinMarketCapSource::new(build_client(&config).unwrap(), &config).unwrap()
    }

    fn cmc_body(body: Value) -> Router {
        Router::new().route(
            "/v1/cryptocurrency/quotes/latest",
            get(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        )
    }

    #[tokio::test]
    async fn coinmarketcap_null_price_is_malformed() {
        let app = cmc_body(json!({
            "data": { "ETH": { "quote": { "USD": { "price": null } } } }
        }));
        let source = cmc_source_for(app, "secret").await;

        assert!(matches!(
            source.fetch_price().await,
            Err(PriceFetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn coinmarketcap_missing_quote_is_malformed() {
        let app = cmc_body(json!({
            "data": { "ETH": { "quote": { "EUR": { "price": 2300.0 } } } }
        }));
        let source = cmc_source_for(app, "secret").await;

        assert!(matches!(
            source.fetch_price().await,
            Err(PriceFetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn coinmarketcap_missing_data_is_malformed() {
        let app = cmc_body(json!({ "status": { "error_code": 400 } }));
        let source = cmc_source_for(app, "secret").await;

        assert!(matches!(
            source.fetch_price().await,
            Err(PriceFetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn coinmarketcap_rejected_key_is_a_status_error() {
        let app = Router::new().route(
            "/v1/cryptocurrency/quotes/latest",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "status": { "error_code": 1002 } })),
                )
            }),
        );
        let source = cmc_source_for(app, "wrong").await;

        assert_eq!(source.fetch_price().await, Err(PriceFetchError::Status(401)));
    }

    #[tokio::test]
    async fn coinmarketcap_rate_limit_is_a_status_error() {
        let app = Router::new().route(
            "/v1/cryptocurrency/quotes/latest",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let source = cmc_source_for(app, "secret").await;

        assert_eq!(source.fetch_price().await, Err(PriceFetchError::Status(429)));
    }

    #[tokio::test]
    async fn coinmarketcap_slow_upstream_times_out() {
        let app = Router::new().route(
            "/v1/cryptocurrency/quotes/latest",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                Json(json!({ "data": {} }))
            }),
        );
        let url = spawn_stub(app).await;
        let config = PriceConfig {
            provider: PriceProvider::CoinMarketCap,
            api_key: Some("secret".into()),
            fetch_timeout: Duration::milliseconds(100),
            ..config_for(&url)
        };
        let source = CoinMarketCapSource::new(build_client(&config).unwrap(), &config).unwrap();

        assert_eq!(source.fetch_price().await, Err(PriceFetchError::Timeout));
    }

    #[test]
    fn coinmarketcap_without_key_is_rejected() {
        let config = PriceConfig {
            provider: PriceProvider::CoinMarketCap,
            ..PriceConfig::default()
        };
        let client = build_client(&config).unwrap();

        assert!(matches!(
            CoinMarketCapSource::new(client, &config),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn rejects_non_finite_and_negative_prices() {
        assert_eq!(validate_price(0.0), Ok(0.0));
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
        assert!(validate_price(-1.0).is_err());
    }
}
