use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Operator CLI for the clinic API guard", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token of an admin account.
    #[arg(short, long, env = "CLINIC_GUARD_TOKEN")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, uptime and the last retention run
    Status,
    /// Run a retention sweep now
    Sweep,
    /// List recent audit events
    Audit {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Only events of this action type
        #[arg(short, long)]
        action: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sweep => {
            let (cookie, token) = fetch_csrf(&client, &cli.url).await?;
            headers.insert(COOKIE, HeaderValue::from_str(&cookie)?);
            headers.insert("x-csrf-token", HeaderValue::from_str(&token)?);
            let res = client
                .post(format!("{}/admin/retention/sweep", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Audit { limit, action } => {
            let mut query = vec![("limit", limit.to_string())];
            if let Some(action) = action {
                query.push(("action_type", action));
            }
            let res = client
                .get(format!("{}/api/audit-events", cli.url))
                .query(&query)
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Returns the `name=value` cookie pair and the token to echo in the header.
async fn fetch_csrf(
    client: &reqwest::Client,
    url: &str,
) -> Result<(String, String), Box<dyn std::error::Error>> {
    let res = client.get(format!("{url}/api/csrf-token")).send().await?;
    let cookie = res
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .ok_or("server did not set a CSRF cookie")?
        .to_string();
    let body: Value = res.json().await?;
    let token = body["csrfToken"]
        .as_str()
        .ok_or("server did not return a CSRF token")?
        .to_string();
    Ok((cookie, token))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
