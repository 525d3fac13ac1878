use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "zakatgo-cli")]
#[command(about = "Command-line client for the ZakatGo chain gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "ZAKATGO_URL")]
    url: String,

    /// API key for write routes.
    #[arg(short, long, env = "ZAKATGO_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Health,
    /// Show the wallet session
    Session,
    /// Request wallet authorization
    Connect,
    /// Record a donation on the ledger
    Donate {
        #[arg(long)]
        recipient: String,
        /// Amount in ETH, e.g. 0.25
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long, default_value = "")]
        keyword: String,
    },
    /// Fund a loan and record it
    FundLoan {
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        amount: String,
    },
    /// List ledger transactions
    Transactions {
        /// Only Zakat-tagged transactions
        #[arg(long)]
        zakat: bool,
    },
    /// Show the ledger transaction count
    Count,
    /// Show the pending donation form
    Form,
    /// Replace the pending donation form
    SetForm {
        #[arg(long, default_value = "")]
        recipient: String,
        #[arg(long, default_value = "")]
        amount: String,
        #[arg(long, default_value = "")]
        message: String,
        #[arg(long, default_value = "")]
        keyword: String,
    },
    /// Submit the pending donation form
    SubmitForm,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }
    let url = |path: &str| format!("{}{}", cli.url.trim_end_matches('/'), path);

    let request = match cli.command {
        Commands::Health => client.get(url("/health")),
        Commands::Session => client.get(url("/api/v1/session")),
        Commands::Connect => client.post(url("/api/v1/session/connect")),
        Commands::Donate { recipient, amount, message, keyword } => client
            .post(url("/api/v1/donations"))
            .json(&json!({
                "recipient": recipient,
                "amount": amount,
                "message": message,
                "keyword": keyword,
            })),
        Commands::FundLoan { recipient, amount } => client
            .post(url("/api/v1/loans/fund"))
            .json(&json!({ "recipient": recipient, "amount": amount })),
        Commands::Transactions { zakat: false } => client.get(url("/api/v1/transactions")),
        Commands::Transactions { zakat: true } => client.get(url("/api/v1/transactions/zakat")),
        Commands::Count => client.get(url("/api/v1/transactions/count")),
        Commands::Form => client.get(url("/api/v1/form")),
        Commands::SetForm { recipient, amount, message, keyword } => client
            .put(url("/api/v1/form"))
            .json(&json!({
                "recipient": recipient,
                "amount": amount,
                "message": message,
                "keyword": keyword,
            })),
        Commands::SubmitForm => client.post(url("/api/v1/form/submit")),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
