use std::env;
use chrono::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub app_env: AppEnv,
    pub price: PriceConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceProvider {
    CoinGecko,
    CoinMarketCap,
}

/// Upstream quote settings shared by every price source.
#[derive(Debug, Clone)]
pub struct PriceConfig {
    pub provider: PriceProvider,
    /// Overrides the provider's default base URL when set.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// CoinGecko asset id, e.g. `ethereum`.
    pub coin_id: String,
    /// CoinMarketCap ticker symbol, e.g. `ETH`.
    pub symbol: String,
    pub vs_currency: String,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            provider: PriceProvider::CoinGecko,
            api_url: None,
            api_key: None,
            coin_id: "ethereum".into(),
            symbol: "ETH".into(),
            vs_currency: "usd".into(),
            cache_ttl: Duration::seconds(30),
            fetch_timeout: Duration::seconds(10),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        // Server config
        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse::<u16>()
            .map_err(|_| AppError::ConfigError("Invalid PORT".into()))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let app_env_str = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let app_env = match app_env_str.to_lowercase().as_str() {
            "production" => AppEnv::Production,
            "test" => AppEnv::Test,
            _ => AppEnv::Development,
        };

        let price = PriceConfig::from_env()?;

        Ok(Self {
            port,
            host,
            app_env,
            price,
        })
    }
}

impl PriceConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the settings from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let provider = match var("PRICE_PROVIDER") {
            Some(provider_str) => parse_provider(&provider_str)?,
            None => defaults.provider,
        };

        let api_url = var("PRICE_API_URL");
        let api_key = var("PRICE_API_KEY");

        if provider == PriceProvider::CoinMarketCap && api_key.is_none() {
            return Err(AppError::ConfigError(
                "PRICE_API_KEY must be set for the coinmarketcap provider".into(),
            ));
        }

        let coin_id = var("PRICE_COIN_ID").unwrap_or(defaults.coin_id);
        let symbol = var("PRICE_SYMBOL").unwrap_or(defaults.symbol);
        let vs_currency = var("PRICE_VS_CURRENCY").unwrap_or(defaults.vs_currency);

        let cache_ttl = match var("PRICE_CACHE_TTL") {
            Some(ttl_str) => parse_duration(&ttl_str)
                .map_err(|_| AppError::ConfigError("Invalid PRICE_CACHE_TTL format".into()))?,
            None => defaults.cache_ttl,
        };

        let fetch_timeout = match var("PRICE_FETCH_TIMEOUT") {
            Some(timeout_str) => parse_duration(&timeout_str)
                .map_err(|_| AppError::ConfigError("Invalid PRICE_FETCH_TIMEOUT format".into()))?,
            None => defaults.fetch_timeout,
        };
        if fetch_timeout <= Duration::zero() {
            return Err(AppError::ConfigError("PRICE_FETCH_TIMEOUT must be positive".into()));
        }

        Ok(Self {
            provider,
            api_url,
            api_key,
            coin_id,
            symbol,
            vs_currency,
            cache_ttl,
            fetch_timeout,
        })
    }
}

fn parse_provider(value: &str) -> Result<PriceProvider, AppError> {
    match value.trim().to_lowercase().as_str() {
        "coingecko" | "gecko" => Ok(PriceProvider::CoinGecko),
        "coinmarketcap" | "cmc" => Ok(PriceProvider::CoinMarketCap),
        other => Err(AppError::ConfigError(format!("Unknown PRICE_PROVIDER: {}", other))),
    }
}

fn parse_duration(duration_str: &str) -> Result<Duration, &'static str> {
    let duration_str = duration_str.trim();

    if duration_str.is_empty() {
        return Err("Duration string is empty");
    }

    // Extract the number and unit parts
    let len = duration_str.len();
    let (num_part, unit_part) = duration_str.split_at(
        duration_str
            .chars()
            .position(|c| !c.is_ascii_digit())
            .unwrap_or(len)
    );

    let num = num_part.parse::<i64>().map_err(|_| "Invalid number")?;

    match unit_part {
        "ms" => Ok(Duration::milliseconds(num)),
        "s" => Ok(Duration::seconds(num)),
        "m" => Ok(Duration::minutes(num)),
        "h" => Ok(Duration::hours(num)),
        "d" => Ok(Duration::days(num)),
        _ => Err("Unknown time unit, use ms, s, m, h, or d"),
    }
}
