/// Public PayPerAgent gateway.
pub const DEFAULT_GATEWAY_URL: &str = "https://payperagent.xyz";

/// Header carrying the payment proof on a retried request.
pub const PAYMENT_HEADER: &str = "X-PAYMENT";

/// Response header the gateway sets to `true` when served from its cache.
pub const CACHE_HIT_HEADER: &str = "x-cache-hit";

/// Currency every gateway price is quoted in.
pub const PAYMENT_CURRENCY: &str = "USDC";

pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!("PayPerAgent-SDK-Rust/{SDK_VERSION}")
}

pub const WEATHER_ENDPOINT: &str = "/api/weather";
pub const CRYPTO_ENDPOINT: &str = "/api/crypto";
pub const NEWS_ENDPOINT: &str = "/api/news";
pub const GATEWAY_INFO_ENDPOINT: &str = "/api";
pub const STATS_ENDPOINT: &str = "/stats";
pub const HEALTH_ENDPOINT: &str = "/health";
