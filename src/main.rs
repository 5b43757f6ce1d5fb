use clap::Parser;
use tracing_subscriber::EnvFilter;

use dental_admin::cli::{self, Cli};
use dental_admin::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;
    tracing::debug!(api = %cfg.api_base_url, state_dir = %cfg.state_dir.display(), "config loaded");

    cli::run(cli, cfg).await
}
