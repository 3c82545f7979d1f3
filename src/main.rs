use anyhow::{Context, Result};
use clap::Parser;
use covid_stats::{
    config::Settings,
    display::{ConsoleSink, HtmlPage},
    fetch, Tracker,
};
use std::{env, path::PathBuf};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Fetch the COVID-19 time series and show the latest figures.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML settings file; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the CSV files from this directory instead of the network
    #[arg(long)]
    from_dir: Option<PathBuf>,

    /// Also write an index.html with the figures into this directory
    #[arg(long)]
    out: Option<PathBuf>,

    /// Use this fixed table row for every dataset instead of a country lookup
    #[arg(long)]
    row_index: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or_else(|_| LevelFilter::INFO.into())),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) settings ─────────────────────────────────────────────────
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(index) = args.row_index {
        settings = settings.with_row_index(index);
    }
    info!(datasets = settings.datasets.len(), "startup");

    // ─── 3) load dataset buffers ─────────────────────────────────────
    let buffers = match &args.from_dir {
        Some(dir) => fetch::load_dir(dir, &settings.datasets)
            .await
            .with_context(|| format!("loading datasets from {}", dir.display()))?,
        None => {
            let client = fetch::build_client(&settings)?;
            fetch::fetch_all(&client, &settings)
                .await
                .context("fetching datasets")?
        }
    };

    // ─── 4) update displays ──────────────────────────────────────────
    let tracker = Tracker::new(settings.datasets, buffers);
    let ok = match &args.out {
        Some(dir) => {
            let mut page = HtmlPage::new();
            let ok = tracker.update((ConsoleSink::new(), &mut page));
            page.write_to(dir)
                .with_context(|| format!("writing page to {}", dir.display()))?;
            ok
        }
        None => tracker.update(ConsoleSink::new()),
    };

    if !ok {
        warn!("one or more datasets could not be updated");
        anyhow::bail!("update incomplete");
    }
    info!("all done");
    Ok(())
}
