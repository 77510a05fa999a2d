use std::net::SocketAddr;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::{fmt::time::Uptime, EnvFilter};

use guess_party::server::{run_server, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "party_server")]
#[command(about = "Run the party-game lobby coordinator", long_about = None)]
struct Args {
    /// Socket address to listen on
    #[arg(long, env = "PARTY_BIND", default_value = "0.0.0.0:3001")]
    bind: SocketAddr,

    /// Comma-separated list of allowed CORS origins
    #[arg(
        long,
        env = "PARTY_ALLOWED_ORIGINS",
        default_value = "http://localhost:3000"
    )]
    allowed_origins: String,

    /// Toggle structured (JSON) tracing output
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json)?;

    let allowed_origins = args
        .allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect();

    run_server(ServerConfig {
        bind: args.bind,
        allowed_origins,
    })
    .await
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("party_server=info,guess_party=info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(Uptime::default())
            .with_ansi(false)
            .json()
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}
