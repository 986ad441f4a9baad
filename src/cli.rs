//! Command-line entry point for the extraction service.

use clap::Parser;
use tracing::info;

use crate::config::Settings;
use crate::server;

#[derive(Debug, Parser)]
#[command(name = "billex", about = "Bill line-item extraction service", version)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check verbosity before clap parses, so logging can be set up first.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Run the service.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;
    info!("configuration validated: {}", settings.summary());

    server::serve(&settings, &cli.host, cli.port).await
}
