//! devauth CLI binary entry point.

use clap::Parser;
use devauth::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Login => devauth::cli::auth::handle_login(config, &cli.session).await,
        Commands::Status => devauth::cli::auth::handle_status(config, &cli.session).await,
        Commands::Logout => devauth::cli::auth::handle_logout(config, &cli.session).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
