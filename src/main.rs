use clap::Parser;
use tracing_subscriber::EnvFilter;

use lit_critic::cli::{self, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lit_critic=info")))
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();

    if let Err(err) = cli::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
