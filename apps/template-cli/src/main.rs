//! tmplctl binary
//!
//! Results go to stdout; logs go to stderr so output can be piped.

use clap::Parser;
use template_cli::{run, AppConfig, Args};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("tmplctl v{}", env!("CARGO_PKG_VERSION"));

    let output = run(args.command, &config)?;
    println!("{}", output);
    Ok(())
}
