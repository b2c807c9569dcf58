use std::time::Instant;

use payperagent::{
    now_millis, CryptoData, CryptoQuery, DataEnvelope, ErrorBody, LocalMessageSigner, MessageSigner,
    NewsData, NewsQuery, PayPerAgentError, PaymentProof, PaymentRequirement, WeatherData,
    WeatherQuery, CACHE_HIT_HEADER, CRYPTO_ENDPOINT, GATEWAY_INFO_ENDPOINT, HEALTH_ENDPOINT,
    NEWS_ENDPOINT, PAYMENT_HEADER, STATS_ENDPOINT, WEATHER_ENDPOINT,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::metrics::{MetricsStore, RequestMetrics};

/// Called with `(amount, description)` each time a payment proof is signed.
pub type PaymentCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Called with every error the payment executor returns.
pub type ErrorCallback = Box<dyn Fn(&PayPerAgentError) + Send + Sync>;

/// HTTP client for the PayPerAgent gateway that pays for requests on demand.
///
/// Wraps `reqwest::Client`. When a paid endpoint answers 402 and a
/// [`MessageSigner`] is configured, the client signs
/// `timestamp:amount:description`, resends the request with an `X-PAYMENT`
/// header, and returns the unwrapped `data` payload. Each 402 costs one unit
/// of the `max_retries` budget; there is no delay between attempts.
pub struct PayPerAgentClient<S: MessageSigner = LocalMessageSigner> {
    http: reqwest::Client,
    config: ClientConfig,
    signer: Option<S>,
    on_payment: Option<PaymentCallback>,
    on_error: Option<ErrorCallback>,
    metrics: MetricsStore,
}

impl PayPerAgentClient<LocalMessageSigner> {
    /// Client without a signer: 402 responses surface as errors.
    pub fn new(config: ClientConfig) -> Result<Self, PayPerAgentError> {
        ClientBuilder::new().config(config).build()
    }

    pub fn builder() -> ClientBuilder<LocalMessageSigner> {
        ClientBuilder::new()
    }
}

impl<S: MessageSigner> PayPerAgentClient<S> {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn signer(&self) -> Option<&S> {
        self.signer.as_ref()
    }

    /// Weather for a city or coordinates.
    pub async fn get_weather(&self, query: &WeatherQuery) -> Result<WeatherData, PayPerAgentError> {
        self.request_with_payment(WEATHER_ENDPOINT, query).await
    }

    /// Prices for one or more Binance pairs.
    pub async fn get_crypto(&self, query: &CryptoQuery) -> Result<CryptoData, PayPerAgentError> {
        self.request_with_payment(CRYPTO_ENDPOINT, query).await
    }

    pub async fn get_news(&self, query: &NewsQuery) -> Result<NewsData, PayPerAgentError> {
        self.request_with_payment(NEWS_ENDPOINT, query).await
    }

    /// Any other paid endpoint, e.g. `get::<Value, _>("/api/coingecko", &params)`.
    pub async fn get<T, Q>(&self, endpoint: &str, query: &Q) -> Result<T, PayPerAgentError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.request_with_payment(endpoint, query).await
    }

    /// `GET /api`: gateway description and price list.
    pub async fn get_gateway_info(&self) -> Result<serde_json::Value, PayPerAgentError> {
        self.get_raw(GATEWAY_INFO_ENDPOINT).await
    }

    /// `GET /stats`: request and revenue statistics.
    pub async fn get_stats(&self) -> Result<serde_json::Value, PayPerAgentError> {
        self.get_raw(STATS_ENDPOINT).await
    }

    pub async fn health_check(&self) -> Result<serde_json::Value, PayPerAgentError> {
        self.get_raw(HEALTH_ENDPOINT).await
    }

    /// Snapshot of the metrics recorded so far, keyed by request id.
    pub fn metrics(&self) -> std::collections::HashMap<String, RequestMetrics> {
        self.metrics.snapshot()
    }

    pub fn clear_metrics(&self) {
        self.metrics.clear();
        tracing::debug!("metrics cleared");
    }

    /// Run one paid request: GET, and on 402 sign and resend until the
    /// request succeeds or the retry budget runs out.
    pub async fn request_with_payment<T, Q>(
        &self,
        endpoint: &str,
        query: &Q,
    ) -> Result<T, PayPerAgentError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let started = Instant::now();
        let mut metrics = RequestMetrics::start();
        let request_id = self
            .metrics
            .begin(endpoint, now_millis()?, metrics.clone());

        tracing::debug!(endpoint, request_id = %request_id, "request started");

        let result = self.execute(endpoint, query, &mut metrics).await;

        metrics.finish(started.elapsed(), result.is_ok());
        let duration_ms = metrics.duration_ms.unwrap_or_default();
        let (cached, retries) = (metrics.cached, metrics.retries);
        self.metrics.record(&request_id, metrics);

        match result {
            Ok(data) => {
                tracing::debug!(endpoint, duration_ms, cached, retries, "request succeeded");
                Ok(data)
            }
            Err(e) => {
                tracing::warn!(endpoint, duration_ms, retries, error = %e, "request failed");
                if let Some(on_error) = &self.on_error {
                    on_error(&e);
                }
                Err(e)
            }
        }
    }

    async fn execute<T, Q>(
        &self,
        endpoint: &str,
        query: &Q,
        metrics: &mut RequestMetrics,
    ) -> Result<T, PayPerAgentError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(endpoint);
        let mut proof: Option<PaymentProof> = None;

        loop {
            let mut req = self.http.get(&url).query(query);
            if let Some(p) = proof.take() {
                req = req.header(PAYMENT_HEADER, p.header_value());
            }

            let resp = req
                .send()
                .await
                .map_err(|e| PayPerAgentError::Http(format!("request failed: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                metrics.cached = is_cache_hit(resp.headers());
                let envelope: DataEnvelope<T> = resp.json().await.map_err(|e| {
                    PayPerAgentError::MalformedResponse(format!("unexpected response body: {e}"))
                })?;
                return Ok(envelope.data);
            }

            let body = read_error_body(resp).await;
            if status != StatusCode::PAYMENT_REQUIRED {
                return Err(enhance_error(status, &body));
            }

            metrics.payment_required = true;
            let signer = match &self.signer {
                Some(signer) if self.config.auto_retry => signer,
                _ => return Err(enhance_error(status, &body)),
            };
            if metrics.retries >= self.config.max_retries {
                return Err(PayPerAgentError::MaxRetriesExceeded(self.config.max_retries));
            }

            let requirement = body.payment.ok_or_else(|| {
                PayPerAgentError::MalformedResponse(
                    "402 response carried no payment requirements".to_string(),
                )
            })?;

            metrics.retries += 1;
            tracing::info!(
                endpoint,
                attempt = metrics.retries,
                max_retries = self.config.max_retries,
                amount = %requirement.amount,
                "payment required"
            );

            proof = Some(self.pay(signer, &requirement).await?);
        }
    }

    async fn pay(
        &self,
        signer: &S,
        requirement: &PaymentRequirement,
    ) -> Result<PaymentProof, PayPerAgentError> {
        let proof =
            PaymentProof::sign(signer, &requirement.amount, &requirement.description).await?;

        if let Some(on_payment) = &self.on_payment {
            on_payment(&requirement.amount, &requirement.description);
        }

        tracing::info!(
            signer = %signer.address(),
            amount = %requirement.amount,
            description = %requirement.description,
            "payment proof generated"
        );

        Ok(proof)
    }

    async fn get_raw(&self, endpoint: &str) -> Result<serde_json::Value, PayPerAgentError> {
        let resp = self
            .http
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| PayPerAgentError::Http(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = read_error_body(resp).await;
            return Err(enhance_error(status, &body));
        }

        resp.json()
            .await
            .map_err(|e| PayPerAgentError::MalformedResponse(format!("invalid JSON body: {e}")))
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.config.gateway_url)
        } else {
            format!("{}/{endpoint}", self.config.gateway_url)
        }
    }
}

/// Builder for [`PayPerAgentClient`].
pub struct ClientBuilder<S: MessageSigner = LocalMessageSigner> {
    config: ClientConfig,
    signer: Option<S>,
    http: Option<reqwest::Client>,
    on_payment: Option<PaymentCallback>,
    on_error: Option<ErrorCallback>,
}

impl ClientBuilder<LocalMessageSigner> {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            signer: None,
            http: None,
            on_payment: None,
            on_error: None,
        }
    }
}

impl Default for ClientBuilder<LocalMessageSigner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MessageSigner> ClientBuilder<S> {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.config.gateway_url = url.into();
        self
    }

    pub fn auto_retry(mut self, enabled: bool) -> Self {
        self.config.auto_retry = enabled;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Use `signer` for payment proofs.
    pub fn signer<T: MessageSigner>(self, signer: T) -> ClientBuilder<T> {
        ClientBuilder {
            config: self.config,
            signer: Some(signer),
            http: self.http,
            on_payment: self.on_payment,
            on_error: self.on_error,
        }
    }

    /// Like [`signer`](Self::signer), keeping the current signer type when `None`.
    pub fn maybe_signer(mut self, signer: Option<S>) -> Self {
        self.signer = signer;
        self
    }

    pub fn on_payment(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_payment = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&PayPerAgentError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Use a preconfigured `reqwest::Client`. Its own timeout and headers apply
    /// instead of the config's.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<PayPerAgentClient<S>, PayPerAgentError> {
        let config = self.config.validated()?;

        let http = match self.http {
            Some(http) => http,
            None => {
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
                reqwest::Client::builder()
                    .timeout(config.timeout)
                    .user_agent(config.user_agent.clone())
                    .default_headers(headers)
                    .build()
                    .map_err(|e| {
                        PayPerAgentError::ConfigError(format!("failed to build HTTP client: {e}"))
                    })?
            }
        };

        tracing::debug!(
            gateway = %config.gateway_url,
            signer = ?self.signer.as_ref().map(|s| s.address()),
            auto_retry = config.auto_retry,
            max_retries = config.max_retries,
            "PayPerAgent client initialized"
        );

        Ok(PayPerAgentClient {
            http,
            config,
            signer: self.signer,
            on_payment: self.on_payment,
            on_error: self.on_error,
            metrics: MetricsStore::new(),
        })
    }
}

fn is_cache_hit(headers: &HeaderMap) -> bool {
    headers
        .get(CACHE_HIT_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

async fn read_error_body(resp: reqwest::Response) -> ErrorBody {
    match resp.bytes().await {
        Ok(bytes) => ErrorBody::from_slice(&bytes),
        Err(_) => ErrorBody::default(),
    }
}

/// Map a non-2xx gateway response to a descriptive error.
pub fn enhance_error(status: StatusCode, body: &ErrorBody) -> PayPerAgentError {
    match status {
        StatusCode::PAYMENT_REQUIRED => PayPerAgentError::PaymentRequired {
            amount: body.payment_amount().map(str::to_string),
            description: body.payment_description().map(str::to_string),
        },
        StatusCode::TOO_MANY_REQUESTS => PayPerAgentError::RateLimited(
            body.error
                .clone()
                .unwrap_or_else(|| "Too many requests".to_string()),
        ),
        StatusCode::BAD_REQUEST => PayPerAgentError::BadRequest(
            body.error.clone().unwrap_or_else(|| "Bad request".to_string()),
        ),
        other => PayPerAgentError::Status {
            status: other.as_u16(),
            message: body
                .error
                .clone()
                .or_else(|| other.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "unexpected status".to_string()),
        },
    }
}
