use tracing_subscriber::{EnvFilter, fmt};

use access_relay::config::{self, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if config::has_flag(&args, "--help") || config::has_flag(&args, "-h") {
        println!("{}", config::USAGE);
        return Ok(());
    }

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    tracing::info!(target: "startup", "RUST_LOG='{}'", rust_log);

    let cfg = RelayConfig::from_process(&args)?;
    access_relay::server::run(cfg).await
}
