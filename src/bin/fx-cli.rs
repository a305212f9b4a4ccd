use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "fx-cli")]
#[command(about = "Client and management CLI for the fx-gateway conversion service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FX_GATEWAY_URL", default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "FX_GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an amount, e.g. `convert LKR 3140 USD`
    Convert {
        from: String,
        amount: f64,
        to: String,
    },
    /// Check gateway status
    Status,
    /// Inspect the circuit breaker
    Breaker,
    /// Inspect the cached rate table
    Rates,
    /// Force a refresh of the rate table
    Refresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Convert { from, amount, to } => {
            client
                .post(format!("{base}/convert"))
                .json(&json!({
                    "fromCurrency": from,
                    "toCurrency": to,
                    "amount": amount,
                }))
                .send()
                .await?
        }
        Commands::Status => {
            client
                .get(format!("{base}/admin/status"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Breaker => {
            client
                .get(format!("{base}/admin/breaker"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Rates => {
            client
                .get(format!("{base}/admin/rates"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Refresh => {
            client
                .post(format!("{base}/admin/refresh"))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(wait) = res.headers().get(reqwest::header::RETRY_AFTER) {
            eprintln!("Retry after: {}s", wait.to_str().unwrap_or("?"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
