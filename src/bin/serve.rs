use anyhow::Result;
use clap::Parser;
use covid_stats::serve;
use std::{env, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, EnvFilter};

/// Serve a directory of static files over plain HTTP.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Listen address; ":port" binds every interface
    #[arg(long, default_value = ":8080")]
    listen: String,

    /// Directory to serve
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or_else(|_| LevelFilter::INFO.into())),
        )
        .init();

    let args = Args::parse();
    let addr = serve::parse_listen(&args.listen)?;
    info!(listen = %args.listen, dir = %args.dir.display(), "starting static file server");

    serve::run(addr, &args.dir).await
}
