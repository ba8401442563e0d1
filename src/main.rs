//! ansible-charm CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ansible_charm::cli::{self, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Invoked as hooks/<name>: run that hook
    let argv0 = std::env::args().next().unwrap_or_default();
    if let Some(hook) = cli::hook_from_argv0(&argv0) {
        let config = ansible_charm::config::config()?;
        return cli::run_hook(config, &hook, None, None, None).await;
    }

    // Parse and execute CLI
    let cli = Cli::parse();
    cli.execute().await
}
