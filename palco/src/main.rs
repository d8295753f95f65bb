mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use palco_core::{logging, Config};

use server::{PalcoServer, Services};

#[derive(Debug, Parser)]
#[command(name = "palco", about = "Live-streaming coordination server")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "PALCO_CONFIG")]
    config: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let mut config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;
    if let Some(port) = cli.port {
        config.server.http_port = port;
    }

    // 2. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 3. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Palco server starting...");
    info!(
        "HTTP address: {}:{}",
        config.server.host, config.server.http_port
    );

    // 4. Build services (restores the financial snapshot)
    let services = Services::build(&config).await?;

    // 5. Serve
    PalcoServer::new(config, services).run().await
}
