use std::future::Future;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payperagent_client::format::{
    format_crypto_price, format_price_change, format_usdc_str, pretty_json, truncate_address,
};
use payperagent_client::progress;
use payperagent_client::{
    ClientConfig, CryptoData, CryptoQuery, LocalMessageSigner, MessageSigner, NewsData, NewsQuery,
    PayPerAgentClient, PayPerAgentError, ProgressIndicator, WeatherData, WeatherQuery,
};

/// Query the PayPerAgent gateway, paying for requests automatically.
#[derive(Parser)]
#[command(name = "payperagent", version)]
struct Cli {
    /// Gateway base URL.
    #[arg(long, global = true, env = "PAYPERAGENT_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Hex private key used to sign payment proofs.
    #[arg(long, global = true, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[arg(long, global = true, env = "PAYPERAGENT_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Surface 402 responses instead of paying.
    #[arg(long, global = true)]
    no_auto_retry: bool,

    #[arg(long, global = true, env = "PAYPERAGENT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Print raw JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,

    /// Print request metrics before exiting.
    #[arg(long, global = true)]
    show_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current weather for a city or coordinates.
    Weather {
        #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present = "lat")]
        city: Option<String>,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Cryptocurrency prices (Binance pairs, e.g. BTCUSDT).
    Crypto {
        #[arg(value_delimiter = ',', default_value = "BTCUSDT,ETHUSDT,BNBUSDT")]
        symbols: Vec<String>,
    },
    /// News headlines.
    News {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Gateway description and price list.
    Info,
    /// Gateway statistics.
    Stats,
    /// Gateway health.
    Health,
    /// Walk through crypto, weather, news and stats.
    Demo,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if matches!(e, PayPerAgentError::PaymentRequired { .. }) {
                eprintln!("hint: pass --private-key (or set PRIVATE_KEY) to pay automatically");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), PayPerAgentError> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.gateway_url {
        config.gateway_url = url;
    }
    if let Some(max_retries) = cli.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if cli.no_auto_retry {
        config.auto_retry = false;
    }

    let signer = match cli.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => Some(LocalMessageSigner::from_private_key(key)?),
        None => None,
    };
    if let Some(s) = &signer {
        tracing::info!(wallet = %truncate_address(&s.address().to_string()), "signer loaded");
    } else {
        tracing::warn!("no PRIVATE_KEY configured; paid endpoints will return 402");
    }

    let client = PayPerAgentClient::builder()
        .config(config)
        .maybe_signer(signer)
        .on_payment(|amount, description| {
            let amount = format_usdc_str(amount);
            if std::io::stderr().is_terminal() {
                progress::suspend(|| tracing::info!("paying {amount} for {description}"));
            } else {
                tracing::info!("paying {amount} for {description}");
            }
        })
        .build()?;

    let output = Output { json: cli.json };

    let result = match cli.command {
        Command::Weather { city, lat, lon } => {
            let query = match (city, lat, lon) {
                (Some(city), _, _) => WeatherQuery::city(city),
                (None, Some(lat), Some(lon)) => WeatherQuery::coordinates(lat, lon),
                _ => {
                    return Err(PayPerAgentError::ConfigError(
                        "pass --city or both --lat and --lon".to_string(),
                    ))
                }
            };
            let weather = spin("Fetching weather", client.get_weather(&query)).await?;
            output.weather(&weather)
        }
        Command::Crypto { symbols } => {
            let query = CryptoQuery::symbols(&symbols);
            if query.is_empty() {
                return Err(PayPerAgentError::ConfigError(
                    "pass at least one symbol, e.g. BTCUSDT".to_string(),
                ));
            }
            let crypto = spin("Fetching crypto prices", client.get_crypto(&query)).await?;
            output.crypto(&crypto)
        }
        Command::News {
            query,
            category,
            country,
            page_size,
        } => {
            let query = NewsQuery {
                query,
                category,
                country,
                page_size,
            };
            let news = spin("Fetching news", client.get_news(&query)).await?;
            output.news(&news)
        }
        Command::Info => {
            let info = spin("Fetching gateway info", client.get_gateway_info()).await?;
            output.raw(&info)
        }
        Command::Stats => output.raw(&spin("Fetching stats", client.get_stats()).await?),
        Command::Health => output.raw(&spin("Checking health", client.health_check()).await?),
        Command::Demo => demo(&client, &output).await,
    };

    if cli.show_metrics {
        println!("{}", pretty_json(&client.metrics())?);
    }
    result
}

async fn demo<S: MessageSigner>(
    client: &PayPerAgentClient<S>,
    output: &Output,
) -> Result<(), PayPerAgentError> {
    println!("📊 Crypto prices");
    match client
        .get_crypto(&CryptoQuery::symbols(["BTCUSDT", "ETHUSDT", "BNBUSDT"]))
        .await
    {
        Ok(crypto) => output.crypto(&crypto)?,
        Err(e) => report_step(&e),
    }
    println!();

    println!("🌤️  Weather in London");
    match client.get_weather(&WeatherQuery::city("London")).await {
        Ok(weather) => output.weather(&weather)?,
        Err(e) => report_step(&e),
    }
    println!();

    println!("📰 Tech news");
    match client
        .get_news(&NewsQuery::new().category("technology").page_size(3))
        .await
    {
        Ok(news) => output.news(&news)?,
        Err(e) => report_step(&e),
    }
    println!();

    println!("📈 Gateway statistics");
    let stats = client.get_stats().await?;
    let overview = &stats["overview"];
    println!("Total requests: {}", overview["totalRequests"]);
    println!("Success rate: {}", overview["successRate"]);
    println!("Avg response time: {}", overview["averageResponseTime"]);
    Ok(())
}

fn report_step(e: &PayPerAgentError) {
    eprintln!("  failed: {e}");
    if e.status() == Some(402) {
        eprintln!("  tip: make sure your wallet is configured and funded with USDC");
    }
}

async fn spin<T, F>(message: &str, fut: F) -> Result<T, PayPerAgentError>
where
    F: Future<Output = Result<T, PayPerAgentError>>,
{
    if !std::io::stderr().is_terminal() {
        return fut.await;
    }
    let indicator = ProgressIndicator::start_new(message);
    let result = fut.await;
    let final_line = match &result {
        Ok(_) => format!("✓ {message}"),
        Err(_) => format!("✗ {message}"),
    };
    indicator.stop(Some(&final_line)).await;
    result
}

struct Output {
    json: bool,
}

impl Output {
    fn raw(&self, value: &serde_json::Value) -> Result<(), PayPerAgentError> {
        println!("{}", pretty_json(value)?);
        Ok(())
    }

    fn weather(&self, w: &WeatherData) -> Result<(), PayPerAgentError> {
        if self.json {
            return self.raw(&serde_json::to_value(w)?);
        }
        println!("Location: {}, {}", w.location, w.country);
        println!(
            "Temperature: {}°C (feels like {}°C)",
            w.temperature, w.feels_like
        );
        println!("Conditions: {}", w.description);
        println!("Humidity: {}%", w.humidity);
        println!("Wind: {} m/s", w.wind_speed);
        Ok(())
    }

    fn crypto(&self, data: &CryptoData) -> Result<(), PayPerAgentError> {
        if self.json {
            return self.raw(&serde_json::to_value(data)?);
        }
        for (symbol, quote) in data {
            println!(
                "{}: {}  {}",
                symbol.to_uppercase(),
                format_crypto_price(quote.usd),
                format_price_change(quote.usd_24h_change)
            );
        }
        Ok(())
    }

    fn news(&self, news: &NewsData) -> Result<(), PayPerAgentError> {
        if self.json {
            return self.raw(&serde_json::to_value(news)?);
        }
        println!("Found {} articles:", news.total_results);
        for (i, article) in news.articles.iter().enumerate() {
            println!("{}. {}", i + 1, article.title);
            println!("   Source: {}", article.source);
        }
        Ok(())
    }
}
