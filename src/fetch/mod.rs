// src/fetch/mod.rs

pub mod contents;

use futures::future::try_join_all;
use reqwest::{header, Client};
use std::{collections::BTreeMap, path::Path, time::Duration};
use tokio::{fs, time::sleep};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{DatasetConfig, DatasetKind, Settings, SourceFormat};
use crate::error::FetchError;
pub use contents::decode_contents;

/// Raw CSV bytes per dataset, handed to the update step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetBuffers {
    buffers: BTreeMap<DatasetKind, Vec<u8>>,
}

impl DatasetBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: DatasetKind, content: impl Into<Vec<u8>>) {
        self.buffers.insert(kind, content.into());
    }

    pub fn with(mut self, kind: DatasetKind, content: impl Into<Vec<u8>>) -> Self {
        self.insert(kind, content);
        self
    }

    pub fn get(&self, kind: DatasetKind) -> Option<&[u8]> {
        self.buffers.get(&kind).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// HTTP client carrying the configured user agent and timeout.
/// The GitHub API refuses requests without a `User-Agent`.
pub fn build_client(settings: &Settings) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.timeout())
        .build()
        .map_err(|e| FetchError::Network {
            url: String::new(),
            source: e,
        })
}

async fn get_bytes(client: &Client, ds: &DatasetConfig) -> Result<Vec<u8>, FetchError> {
    debug!(url = %ds.url, "GET");
    let mut req = client.get(&ds.url);
    if ds.source == SourceFormat::GithubContents {
        req = req.header(header::ACCEPT, "application/vnd.github+json");
    }

    let network = |e: reqwest::Error| FetchError::Network {
        url: ds.url.clone(),
        source: e,
    };
    let resp = req.send().await.map_err(network)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: ds.url.clone(),
            status,
        });
    }
    let body = resp.bytes().await.map_err(network)?;
    Ok(body.to_vec())
}

/// Exponential backoff before retry `attempt` (1-based), saturating instead of overflowing.
fn backoff_delay_ms(initial_backoff_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    initial_backoff_ms.saturating_mul(factor)
}

async fn get_bytes_with_retry(
    client: &Client,
    ds: &DatasetConfig,
    max_retries: u32,
    initial_backoff_ms: u64,
) -> Result<Vec<u8>, FetchError> {
    let mut attempts = 0;
    loop {
        match get_bytes(client, ds).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempts < max_retries => {
                attempts += 1;
                let backoff = backoff_delay_ms(initial_backoff_ms, attempts);
                warn!(
                    url = %ds.url,
                    attempt = attempts,
                    delay_ms = backoff,
                    error = %e,
                    "Retrying"
                );
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => {
                error!(url = %ds.url, error = %e, "giving up");
                return Err(e);
            }
        }
    }
}

/// Fetch one dataset and return its CSV bytes.
#[instrument(level = "info", skip(client, ds, settings), fields(dataset = %ds.kind))]
pub async fn fetch_dataset(
    client: &Client,
    ds: &DatasetConfig,
    settings: &Settings,
) -> Result<Vec<u8>, FetchError> {
    let body = get_bytes_with_retry(client, ds, settings.max_retries, settings.backoff_ms).await?;
    let csv = match ds.source {
        SourceFormat::GithubContents => decode_contents(&body)?,
        SourceFormat::Raw => body,
    };
    info!(bytes = csv.len(), "fetched");
    Ok(csv)
}

/// Fetch every configured dataset concurrently.
pub async fn fetch_all(
    client: &Client,
    settings: &Settings,
) -> Result<DatasetBuffers, FetchError> {
    let fetches = settings.datasets.iter().map(|ds| async move {
        let csv = fetch_dataset(client, ds, settings).await?;
        Ok::<_, FetchError>((ds.kind, csv))
    });

    let mut buffers = DatasetBuffers::new();
    for (kind, csv) in try_join_all(fetches).await? {
        buffers.insert(kind, csv);
    }
    Ok(buffers)
}

/// Read each dataset from `<dir>/<file name of its url>` instead of the network.
pub async fn load_dir(
    dir: impl AsRef<Path>,
    datasets: &[DatasetConfig],
) -> Result<DatasetBuffers, FetchError> {
    let dir = dir.as_ref();
    let mut buffers = DatasetBuffers::new();
    for ds in datasets {
        let path = dir.join(ds.file_name());
        debug!(dataset = %ds.kind, path = %path.display(), "loading local file");
        let content = fs::read(&path).await?;
        buffers.insert(ds.kind, content);
    }
    info!(count = buffers.len(), dir = %dir.display(), "loaded local datasets");
    Ok(buffers)
}
