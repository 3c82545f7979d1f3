// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path, time::Duration};

use crate::extract::{ExtractionRequest, RowSelector};

const CONTENTS_BASE: &str = "https://api.github.com/repos/CSSEGISandData/COVID-19/contents/csse_covid_19_data/csse_covid_19_time_series/";

/// The three time series published by the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Confirmed,
    Deaths,
    Recovered,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Confirmed,
        DatasetKind::Deaths,
        DatasetKind::Recovered,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DatasetKind::Confirmed => "confirmed",
            DatasetKind::Deaths => "deaths",
            DatasetKind::Recovered => "recovered",
        }
    }

    /// Page element the summary is bound to.
    pub fn element_id(&self) -> &'static str {
        match self {
            DatasetKind::Confirmed => "confdata",
            DatasetKind::Deaths => "deathdata",
            DatasetKind::Recovered => "recdata",
        }
    }

    pub fn file_name(&self) -> String {
        format!("time_series_covid19_{}_global.csv", self.as_str())
    }

    pub fn default_url(&self) -> String {
        format!("{}{}", CONTENTS_BASE, self.file_name())
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the response body at a dataset URL is laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// GitHub contents API JSON envelope with a base64 `content` field.
    #[default]
    GithubContents,
    /// Plain CSV body.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    pub url: String,
    #[serde(default)]
    pub source: SourceFormat,
    /// Display label; also the country looked up when no row index is given.
    pub label: String,
    /// Country to look up, when it differs from the label.
    #[serde(default)]
    pub country: Option<String>,
    /// Fixed table row. Overrides the country lookup.
    #[serde(default)]
    pub row_index: Option<usize>,
    #[serde(default)]
    pub element_id: Option<String>,
}

impl DatasetConfig {
    pub fn new(kind: DatasetKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            url: kind.default_url(),
            source: SourceFormat::default(),
            label: label.into(),
            country: None,
            row_index: None,
            element_id: None,
        }
    }

    pub fn selector(&self) -> RowSelector {
        match self.row_index {
            Some(i) => RowSelector::Index(i),
            None => {
                RowSelector::Country(self.country.clone().unwrap_or_else(|| self.label.clone()))
            }
        }
    }

    pub fn request(&self) -> ExtractionRequest {
        ExtractionRequest::new(self.selector(), self.label.clone())
    }

    pub fn element_id(&self) -> &str {
        self.element_id
            .as_deref()
            .unwrap_or_else(|| self.kind.element_id())
    }

    /// Last path segment of the URL, used when loading from a local directory.
    pub fn file_name(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|segments| segments.last().map(str::to_string))
            })
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.kind.file_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
    pub datasets: Vec<DatasetConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            max_retries: 3,
            backoff_ms: 500,
            timeout_secs: 30,
            datasets: DatasetKind::ALL
                .iter()
                .map(|&kind| DatasetConfig::new(kind, "US"))
                .collect(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(text)?;
        if settings.datasets.is_empty() {
            anyhow::bail!("no datasets configured");
        }
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Force the positional selector on every dataset.
    pub fn with_row_index(mut self, index: usize) -> Self {
        for ds in &mut self.datasets {
            ds.row_index = Some(index);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.datasets.len(), 3);
        assert_eq!(s.max_retries, 3);
        let confirmed = &s.datasets[0];
        assert_eq!(confirmed.kind, DatasetKind::Confirmed);
        assert_eq!(confirmed.element_id(), "confdata");
        assert_eq!(confirmed.selector(), RowSelector::Country("US".into()));
        assert!(confirmed
            .url
            .ends_with("time_series_covid19_confirmed_global.csv"));
        assert_eq!(
            confirmed.file_name(),
            "time_series_covid19_confirmed_global.csv"
        );
        assert_eq!(s.datasets[1].element_id(), "deathdata");
        assert_eq!(s.datasets[2].element_id(), "recdata");
    }

    #[test]
    fn test_load_yaml() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        write!(
            tmp,
            r#"
max_retries: 1
datasets:
  - kind: deaths
    url: https://example.com/data/deaths.csv
    source: raw
    label: United States
    country: US
  - kind: recovered
    url: https://example.com/data/recovered.csv
    label: US
    row_index: 226
    element_id: rec
"#
        )?;

        let s = Settings::load(tmp.path())?;
        assert_eq!(s.max_retries, 1);
        assert_eq!(s.backoff_ms, 500);
        assert_eq!(s.datasets.len(), 2);

        let deaths = &s.datasets[0];
        assert_eq!(deaths.source, SourceFormat::Raw);
        assert_eq!(deaths.selector(), RowSelector::Country("US".into()));
        assert_eq!(deaths.request().country_label, "United States");
        assert_eq!(deaths.file_name(), "deaths.csv");

        let recovered = &s.datasets[1];
        assert_eq!(recovered.source, SourceFormat::GithubContents);
        assert_eq!(recovered.selector(), RowSelector::Index(226));
        assert_eq!(recovered.element_id(), "rec");
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_fields_and_empty_datasets() {
        assert!(Settings::from_yaml("retries: 3\n").is_err());
        assert!(Settings::from_yaml("datasets: []\n").is_err());
    }

    #[test]
    fn test_with_row_index() {
        let s = Settings::default().with_row_index(226);
        assert!(s
            .datasets
            .iter()
            .all(|d| d.selector() == RowSelector::Index(226)));
    }
}
