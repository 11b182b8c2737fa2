use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use rewrite_proxy::cache::{ClientCache, MemoryClientStore};
use rewrite_proxy::intercept::{InterceptPolicy, Interceptor, Outcome, RemoteForwarder};
use rewrite_proxy::proxy::{Content, ProxyRequest};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Client for the rewriting proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy server.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Management path prefix on the proxy server.
    #[arg(long, default_value = "/__proxy")]
    prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page through the proxy, with client-cache fallback
    Fetch {
        target: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Client cache file, created if missing.
        #[arg(long, default_value = "proxy-client-cache.json")]
        cache_file: PathBuf,

        #[arg(long, default_value_t = 45)]
        timeout_secs: u64,
    },
    /// Check proxy health
    Health,
    /// Inspect the server cache
    Cache,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();
    let prefix = cli.prefix.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Fetch {
            target,
            method,
            cache_file,
            timeout_secs,
        } => {
            let store = MemoryClientStore::load_from_file(&cache_file)?;
            let forwarder = RemoteForwarder::new(&base, Duration::from_secs(timeout_secs))?;
            let control_host = reqwest::Url::parse(&base)?
                .host_str()
                .map(str::to_string)
                .unwrap_or_default();

            let interceptor = Interceptor::new(
                InterceptPolicy::new(control_host, prefix),
                Arc::new(forwarder),
                ClientCache::new(Arc::new(store.clone())),
            );

            let mut request = ProxyRequest::get(target);
            request.method = method;

            match interceptor.handle(request).await {
                Outcome::Bypass(request) => {
                    eprintln!("Not intercepted, fetch {} directly", request.url);
                }
                Outcome::Succeeded(response) => {
                    eprintln!("{} {}", response.status, response.status_text);
                    print_content(&response.content);
                }
                Outcome::Failed {
                    response,
                    from_cache,
                    error,
                } => {
                    eprintln!("Forwarding failed: {}", error);
                    if from_cache {
                        eprintln!("Serving cached copy");
                    }
                    eprintln!("{} {}", response.status, response.status_text);
                    print_content(&response.content);
                }
            }

            store.save_to_file()?;
        }
        Commands::Health => {
            let res = reqwest::get(format!("{}{}/health", base, prefix)).await?;
            print_response(res).await?;
        }
        Commands::Cache => {
            let res = reqwest::get(format!("{}{}/cache", base, prefix)).await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn print_content(content: &Content) {
    match content {
        Content::Text { text, .. } => println!("{}", text),
        Content::Binary(bytes) => eprintln!("<{} bytes of binary content>", bytes.len()),
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
