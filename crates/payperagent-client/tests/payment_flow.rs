//! Payment flow against a mock gateway.
//!
//! Covers the 402 state machine end to end:
//!   1. unpaid GET -> 402 with payment requirements
//!   2. sign `timestamp:amount:description`
//!   3. GET with `X-PAYMENT: signature:timestamp:amount` -> 200 + data
//!
//! plus budget exhaustion, error classification, callbacks and metrics.

use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use serde_json::{json, Value};

use payperagent_client::{
    Address, CryptoQuery, LocalMessageSigner, MessageSigner, NewsQuery, PayPerAgentClient,
    PayPerAgentError, WeatherQuery,
};

const PROOF_PATTERN: &str = r"^0x[0-9a-f]{130}:[0-9]{13}:0\.001$";

fn payment_required(amount: &str, description: &str) -> Value {
    json!({
        "success": false,
        "error": "Payment Required",
        "payment": {
            "network": "skale-nebula-testnet",
            "chainId": 37084624,
            "amount": amount,
            "token": "USDC",
            "currency": "USDC",
            "recipient": "0x742d35cc6634c0532925a3b844bc9e7595f0beb0",
            "description": description,
            "instructions": "Generate payment on SKALE Network and include proof in X-PAYMENT header"
        }
    })
}

fn weather_json() -> Value {
    json!({
        "location": "London",
        "country": "GB",
        "temperature": 12.5,
        "feels_like": 11.0,
        "humidity": 81,
        "pressure": 1012,
        "weather": "Clouds",
        "description": "overcast clouds",
        "wind_speed": 4.1,
        "clouds": 90,
        "coordinates": { "lat": 51.5085, "lon": -0.1257 }
    })
}

type Payments = Arc<Mutex<Vec<(String, String)>>>;
type Errors = Arc<Mutex<Vec<String>>>;

fn paying_client(server: &MockServer, max_retries: u32) -> (PayPerAgentClient, Payments, Errors) {
    let payments: Payments = Arc::default();
    let errors: Errors = Arc::default();
    let (p, e) = (payments.clone(), errors.clone());

    let client = PayPerAgentClient::builder()
        .gateway_url(server.base_url())
        .signer(LocalMessageSigner::random())
        .max_retries(max_retries)
        .on_payment(move |amount, description| {
            p.lock()
                .unwrap()
                .push((amount.to_string(), description.to_string()));
        })
        .on_error(move |err| e.lock().unwrap().push(err.to_string()))
        .build()
        .unwrap();

    (client, payments, errors)
}

#[tokio::test]
async fn pays_once_on_402_and_returns_data() {
    let server = MockServer::start_async().await;
    let unpaid = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/weather")
                .query_param("city", "London")
                .header_missing("x-payment");
            then.status(402)
                .json_body(payment_required("0.001", "Weather data access"));
        })
        .await;
    let paid = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/weather")
                .query_param("city", "London")
                .header_matches("(?i)^x-payment$", PROOF_PATTERN);
            then.status(200)
                .header("x-cache-hit", "false")
                .json_body(json!({ "success": true, "data": weather_json() }));
        })
        .await;

    let (client, payments, errors) = paying_client(&server, 3);
    let weather = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap();

    assert_eq!(weather.location, "London");
    assert_eq!(weather.coordinates.lat, 51.5085);
    unpaid.assert_hits_async(1).await;
    paid.assert_hits_async(1).await;

    assert_eq!(
        *payments.lock().unwrap(),
        vec![("0.001".to_string(), "Weather data access".to_string())]
    );
    assert!(errors.lock().unwrap().is_empty());

    let metrics = client.metrics();
    assert_eq!(metrics.len(), 1);
    let (id, m) = metrics.iter().next().unwrap();
    assert!(id.starts_with("/api/weather-"));
    assert!(m.succeeded);
    assert!(m.payment_required);
    assert_eq!(m.retries, 1);
    assert!(!m.cached);
    assert!(m.duration_ms.is_some());
}

#[tokio::test]
async fn free_response_needs_no_payment() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/crypto")
                .query_param("symbols", "BTCUSDT,ETHUSDT")
                .header("accept", "application/json");
            then.status(200).header("x-cache-hit", "true").json_body(json!({
                "success": true,
                "data": {
                    "btc": { "usd": 43250.5, "usd_24h_change": 1.2, "usd_24h_high": 44000.0,
                             "usd_24h_low": 42000.0, "usd_24h_volume": 1.0e9 },
                    "eth": { "usd": 2250.0, "usd_24h_change": -0.4, "usd_24h_high": 2300.0,
                             "usd_24h_low": 2200.0, "usd_24h_volume": 5.0e8 }
                }
            }));
        })
        .await;

    let (client, payments, _) = paying_client(&server, 3);
    let crypto = client
        .get_crypto(&CryptoQuery::symbols(["BTCUSDT", "ETHUSDT"]))
        .await
        .unwrap();

    assert_eq!(crypto["btc"].usd, 43250.5);
    assert_eq!(crypto["eth"].usd_24h_change, -0.4);
    mock.assert_hits_async(1).await;
    assert!(payments.lock().unwrap().is_empty());

    let m = client.metrics().into_values().next().unwrap();
    assert!(m.cached);
    assert!(!m.payment_required);
    assert_eq!(m.retries, 0);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let server = MockServer::start_async().await;
    let unpaid = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather").header_missing("x-payment");
            then.status(402)
                .json_body(payment_required("0.001", "Weather data access"));
        })
        .await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather").header_exists("x-payment");
            then.status(402).json_body(json!({
                "success": false,
                "error": "Invalid payment proof",
                "payment": { "amount": "0.001", "description": "Weather data access" }
            }));
        })
        .await;

    let (client, payments, errors) = paying_client(&server, 2);
    let err = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap_err();

    assert!(matches!(err, PayPerAgentError::MaxRetriesExceeded(2)));
    unpaid.assert_hits_async(1).await;
    rejected.assert_hits_async(2).await;
    assert_eq!(payments.lock().unwrap().len(), 2);
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["max retries (2) exceeded".to_string()]
    );

    let m = client.metrics().into_values().next().unwrap();
    assert!(!m.succeeded);
    assert!(m.payment_required);
    assert_eq!(m.retries, 2);
}

#[tokio::test]
async fn zero_retry_budget_never_pays() {
    let server = MockServer::start_async().await;
    let unpaid = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/news");
            then.status(402)
                .json_body(payment_required("0.005", "News article access"));
        })
        .await;

    let (client, payments, _) = paying_client(&server, 0);
    let err = client.get_news(&NewsQuery::new()).await.unwrap_err();

    assert!(matches!(err, PayPerAgentError::MaxRetriesExceeded(0)));
    unpaid.assert_hits_async(1).await;
    assert!(payments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn without_signer_402_is_surfaced() {
    let server = MockServer::start_async().await;
    let unpaid = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather").header_missing("x-payment");
            then.status(402)
                .json_body(payment_required("0.001", "Weather data access"));
        })
        .await;
    let paid = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather").header_exists("x-payment");
            then.status(200)
                .json_body(json!({ "data": weather_json() }));
        })
        .await;

    let errors: Errors = Arc::default();
    let e = errors.clone();
    let client = PayPerAgentClient::builder()
        .gateway_url(server.base_url())
        .on_error(move |err| e.lock().unwrap().push(err.to_string()))
        .build()
        .unwrap();

    let err = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap_err();

    match &err {
        PayPerAgentError::PaymentRequired {
            amount,
            description,
        } => {
            assert_eq!(amount.as_deref(), Some("0.001"));
            assert_eq!(description.as_deref(), Some("Weather data access"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    unpaid.assert_hits_async(1).await;
    paid.assert_hits_async(0).await;
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert!(client.metrics().values().all(|m| m.payment_required && m.retries == 0));
}

#[tokio::test]
async fn auto_retry_disabled_does_not_pay() {
    let server = MockServer::start_async().await;
    let paid = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather").header_exists("x-payment");
            then.status(200).json_body(json!({ "data": weather_json() }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather").header_missing("x-payment");
            then.status(402)
                .json_body(payment_required("0.001", "Weather data access"));
        })
        .await;

    let client = PayPerAgentClient::builder()
        .gateway_url(server.base_url())
        .signer(LocalMessageSigner::random())
        .auto_retry(false)
        .build()
        .unwrap();

    let err = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap_err();
    assert!(matches!(err, PayPerAgentError::PaymentRequired { .. }));
    paid.assert_hits_async(0).await;
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/crypto");
            then.status(429)
                .json_body(json!({ "error": "Too many requests from this agent" }));
        })
        .await;

    let (client, payments, errors) = paying_client(&server, 3);
    let err = client
        .get_crypto(&CryptoQuery::symbol("BTCUSDT"))
        .await
        .unwrap_err();

    assert!(matches!(err, PayPerAgentError::RateLimited(ref m) if m == "Too many requests from this agent"));
    mock.assert_hits_async(1).await;
    assert!(payments.lock().unwrap().is_empty());
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn bad_request_and_server_errors_are_classified() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather");
            then.status(400).json_body(json!({
                "success": false,
                "error": "Please provide either city name or coordinates (lat, lon)"
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/news");
            then.status(500).body("internal error");
        })
        .await;

    let (client, _, errors) = paying_client(&server, 3);

    let err = client
        .get_weather(&WeatherQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PayPerAgentError::BadRequest(ref m) if m.contains("coordinates")));

    let err = client.get_news(&NewsQuery::new()).await.unwrap_err();
    match err {
        PayPerAgentError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(errors.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn payment_required_without_requirements_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather");
            then.status(402).json_body(json!({ "error": "Payment Required" }));
        })
        .await;

    let (client, payments, _) = paying_client(&server, 3);
    let err = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap_err();

    assert!(matches!(err, PayPerAgentError::MalformedResponse(_)));
    assert!(payments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn success_without_data_is_malformed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather");
            then.status(200).json_body(json!({ "success": true }));
        })
        .await;

    let (client, _, _) = paying_client(&server, 3);
    let err = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap_err();
    assert!(matches!(err, PayPerAgentError::MalformedResponse(_)));
}

#[tokio::test]
async fn news_query_parameters_are_forwarded() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/news")
                .query_param("category", "technology")
                .query_param("pageSize", "3");
            then.status(200).json_body(json!({
                "data": {
                    "totalResults": 1,
                    "articles": [{
                        "title": "Agents pay per request",
                        "description": "x402 in practice",
                        "url": "https://example.com/a",
                        "source": "Example",
                        "publishedAt": "2024-05-01T12:00:00Z",
                        "author": "Staff"
                    }]
                }
            }));
        })
        .await;

    let (client, _, _) = paying_client(&server, 3);
    let news = client
        .get_news(&NewsQuery::new().category("technology").page_size(3))
        .await
        .unwrap();

    assert_eq!(news.total_results, 1);
    assert_eq!(news.articles[0].title, "Agents pay per request");
    mock.assert_hits_async(1).await;
}

struct FixedSigner;

impl MessageSigner for FixedSigner {
    fn address(&self) -> Address {
        Address::ZERO
    }

    async fn sign_message(&self, message: &str) -> Result<String, PayPerAgentError> {
        if !message.ends_with(":0.002:Real-time cryptocurrency prices from Binance") {
            return Err(PayPerAgentError::SignatureError(format!(
                "unexpected message: {message}"
            )));
        }
        Ok("0xfeed".to_string())
    }
}

#[tokio::test]
async fn custom_signer_produces_header() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/crypto").header_missing("x-payment");
            then.status(402).json_body(payment_required(
                "0.002",
                "Real-time cryptocurrency prices from Binance",
            ));
        })
        .await;
    let paid = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/crypto")
                .header_matches("(?i)^x-payment$", r"^0xfeed:[0-9]+:0\.002$");
            then.status(200).json_body(json!({ "data": {} }));
        })
        .await;

    let client = PayPerAgentClient::builder()
        .gateway_url(server.base_url())
        .signer(FixedSigner)
        .build()
        .unwrap();

    let crypto = client
        .get_crypto(&CryptoQuery::symbol("BTCUSDT"))
        .await
        .unwrap();
    assert!(crypto.is_empty());
    paid.assert_hits_async(1).await;
    assert_eq!(client.signer().map(|s| s.address()), Some(Address::ZERO));
}

#[tokio::test]
async fn gateway_endpoints_return_raw_json() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .json_body(json!({ "status": "healthy", "network": "skale-nebula-testnet" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stats");
            then.status(200).json_body(json!({
                "overview": { "totalRequests": 42, "successRate": "97.6%" }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api");
            then.status(200)
                .json_body(json!({ "name": "PayPerAgent", "version": "1.0.0" }));
        })
        .await;

    let client = PayPerAgentClient::builder()
        .gateway_url(server.base_url())
        .build()
        .unwrap();

    assert_eq!(client.health_check().await.unwrap()["status"], "healthy");
    assert_eq!(
        client.get_stats().await.unwrap()["overview"]["totalRequests"],
        42
    );
    assert_eq!(client.get_gateway_info().await.unwrap()["name"], "PayPerAgent");
    // Free endpoints are not tracked.
    assert!(client.metrics().is_empty());
}

#[tokio::test]
async fn metrics_are_kept_per_request_and_cleared() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/weather");
            then.status(200).json_body(json!({ "data": weather_json() }));
        })
        .await;

    let (client, _, _) = paying_client(&server, 3);
    for _ in 0..3 {
        client
            .get_weather(&WeatherQuery::city("London"))
            .await
            .unwrap();
    }

    let metrics = client.metrics();
    assert_eq!(metrics.len(), 3);
    assert!(metrics.keys().all(|id| id.starts_with("/api/weather-")));
    assert!(metrics.values().all(|m| m.succeeded && m.finished_at.is_some()));

    client.clear_metrics();
    assert!(client.metrics().is_empty());
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let errors: Errors = Arc::default();
    let e = errors.clone();
    let client = PayPerAgentClient::builder()
        .gateway_url("http://127.0.0.1:1")
        .timeout(std::time::Duration::from_secs(2))
        .on_error(move |err| e.lock().unwrap().push(err.to_string()))
        .build()
        .unwrap();

    let err = client
        .get_weather(&WeatherQuery::city("London"))
        .await
        .unwrap_err();
    assert!(matches!(err, PayPerAgentError::Http(_)));
    assert_eq!(errors.lock().unwrap().len(), 1);

    let m = client.metrics().into_values().next().unwrap();
    assert!(!m.succeeded);
    assert!(!m.payment_required);
}
