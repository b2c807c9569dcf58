//! Payloads returned by the gateway's paid endpoints and the query
//! parameters they accept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions from `/api/weather`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub location: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub weather: String,
    pub description: String,
    pub wind_speed: f64,
    pub clouds: f64,
    pub coordinates: Coordinates,
}

/// One entry of [`CryptoData`], keyed by lowercase base symbol (`btc`, `eth`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    pub usd: f64,
    pub usd_24h_change: f64,
    pub usd_24h_high: f64,
    pub usd_24h_low: f64,
    pub usd_24h_volume: f64,
}

pub type CryptoData = BTreeMap<String, CryptoQuote>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    pub source: String,
    pub published_at: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsData {
    pub total_results: u64,
    pub articles: Vec<NewsArticle>,
}

/// Query for `/api/weather`: a city name or a coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
}

impl WeatherQuery {
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Self::default()
        }
    }

    pub fn coordinates(lat: f64, lon: f64) -> Self {
        Self {
            city: None,
            lat: Some(lat),
            lon: Some(lon),
        }
    }
}

/// Query for `/api/crypto` in Binance pair format (`BTCUSDT`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CryptoQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    symbols: Option<String>,
}

impl CryptoQuery {
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            symbols: None,
        }
    }

    /// Several pairs, sent comma-joined. Blank entries are dropped; if none
    /// remain, no `symbols` parameter is sent.
    pub fn symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            symbol: None,
            symbols: (!joined.is_empty()).then_some(joined),
        }
    }

    /// No symbol was given.
    pub fn is_empty(&self) -> bool {
        self.symbol.is_none() && self.symbols.is_none()
    }
}

/// Query for `/api/news`. All fields optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl NewsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}
