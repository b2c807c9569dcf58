//! PayPerAgent client SDK for paid API requests.
//!
//! Handles the HTTP 402 flow automatically: request -> 402 -> sign
//! `timestamp:amount:description` -> retry with `X-PAYMENT` -> data.
//!
//! # Quick example
//!
//! ```no_run
//! use payperagent_client::{LocalMessageSigner, PayPerAgentClient, WeatherQuery};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let signer = LocalMessageSigner::from_private_key("0xYOUR_KEY").unwrap();
//! let client = PayPerAgentClient::builder()
//!     .gateway_url("https://payperagent.xyz")
//!     .signer(signer)
//!     .on_payment(|amount, description| println!("paid {amount} USDC for {description}"))
//!     .build()
//!     .unwrap();
//!
//! let weather = client.get_weather(&WeatherQuery::city("London")).await.unwrap();
//! println!("{}: {}°C", weather.location, weather.temperature);
//! # }
//! ```

pub mod config;
mod http_client;
pub mod metrics;
pub mod progress;

pub use config::ClientConfig;
pub use http_client::{
    enhance_error, ClientBuilder, ErrorCallback, PayPerAgentClient, PaymentCallback,
};
pub use metrics::{MetricsStore, RequestMetrics};
pub use progress::ProgressIndicator;

// Re-export commonly needed types from core
pub use payperagent::{
    format, Address, CryptoData, CryptoQuery, CryptoQuote, LocalMessageSigner, MessageSigner,
    NewsArticle, NewsData, NewsQuery, PayPerAgentError, PaymentProof, PaymentRequirement,
    WeatherData, WeatherQuery, DEFAULT_GATEWAY_URL, PAYMENT_HEADER,
};
