// src/update.rs

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DatasetConfig, DatasetKind};
use crate::display::Sink;
use crate::error::ExtractError;
use crate::extract::{extract_request, ExtractionResult};
use crate::fetch::DatasetBuffers;

/// Why one dataset could not be shown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("no data loaded for {0}")]
    MissingBuffer(DatasetKind),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Result of updating one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub kind: DatasetKind,
    pub element_id: String,
    pub result: Result<ExtractionResult, UpdateError>,
}

impl Outcome {
    /// Text bound to the element: the summary, or an explicit error indicator.
    pub fn display_text(&self, label: &str) -> String {
        match &self.result {
            Ok(r) => r.to_string(),
            Err(e) => format!("{}: data unavailable ({})\n", label, e),
        }
    }
}

/// Holds the injected dataset buffers and refreshes the display from them.
#[derive(Debug, Clone)]
pub struct Tracker {
    datasets: Vec<DatasetConfig>,
    buffers: DatasetBuffers,
}

impl Tracker {
    pub fn new(datasets: Vec<DatasetConfig>, buffers: DatasetBuffers) -> Self {
        Self { datasets, buffers }
    }

    pub fn datasets(&self) -> &[DatasetConfig] {
        &self.datasets
    }

    /// Run every extraction independently. No display side effects.
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.datasets
            .iter()
            .map(|ds| Outcome {
                kind: ds.kind,
                element_id: ds.element_id().to_string(),
                result: self.extract_one(ds),
            })
            .collect()
    }

    fn extract_one(&self, ds: &DatasetConfig) -> Result<ExtractionResult, UpdateError> {
        let content = self
            .buffers
            .get(ds.kind)
            .ok_or(UpdateError::MissingBuffer(ds.kind))?;
        Ok(extract_request(content, &ds.request())?)
    }

    /// Refresh every display element; `true` iff all datasets succeeded.
    pub fn update<S: Sink>(&self, mut sink: S) -> bool {
        let mut ok = true;
        for (ds, outcome) in self.datasets.iter().zip(self.outcomes()) {
            match &outcome.result {
                Ok(r) => info!(
                    dataset = %ds.kind,
                    date = %r.date,
                    as_of = ?r.as_of(),
                    value = %r.value,
                    "updated"
                ),
                Err(e) => {
                    warn!(
                        dataset = %ds.kind,
                        selector = %ds.selector(),
                        error = %e,
                        "update failed"
                    );
                    ok = false;
                }
            }
            sink.set_text(&outcome.element_id, &outcome.display_text(&ds.label));
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::display::HtmlPage;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,covid_stats=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const CONFIRMED: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
                             ,Afghanistan,33.9,67.7,0,0\n\
                             ,US,40.0,-100.0,1,2\n";
    const DEATHS: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
                          ,Afghanistan,33.9,67.7,0,0\n\
                          ,US,40.0,-100.0,0,1\n";
    const RECOVERED: &str = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
                             ,US,40.0,-100.0,0,0\n";

    fn buffers() -> DatasetBuffers {
        DatasetBuffers::new()
            .with(DatasetKind::Confirmed, CONFIRMED)
            .with(DatasetKind::Deaths, DEATHS)
            .with(DatasetKind::Recovered, RECOVERED)
    }

    #[test]
    fn test_update_all_datasets() {
        init_test_logging();
        let tracker = Tracker::new(Settings::default().datasets, buffers());
        let mut page = HtmlPage::new();

        assert!(tracker.update(&mut page));
        assert_eq!(page.text("confdata"), Some("US on 1/23/20\n2\n"));
        assert_eq!(page.text("deathdata"), Some("US on 1/23/20\n1\n"));
        assert_eq!(page.text("recdata"), Some("US on 1/23/20\n0\n"));
    }

    #[test]
    fn test_update_reports_failures_in_place() {
        init_test_logging();
        let buffers = DatasetBuffers::new()
            .with(DatasetKind::Confirmed, CONFIRMED)
            .with(DatasetKind::Deaths, "Province/State,Country/Region\n\"unterminated\n");
        let tracker = Tracker::new(Settings::default().datasets, buffers);
        let mut page = HtmlPage::new();

        assert!(!tracker.update(&mut page));
        assert_eq!(page.text("confdata"), Some("US on 1/23/20\n2\n"));

        let deaths = page.text("deathdata").unwrap();
        assert!(deaths.starts_with("US: data unavailable (malformed CSV input"));
        let recovered = page.text("recdata").unwrap();
        assert_eq!(recovered, "US: data unavailable (no data loaded for recovered)\n");
    }

    #[test]
    fn test_positional_selector() {
        let settings = Settings::default().with_row_index(2);
        let tracker = Tracker::new(settings.datasets, buffers());
        let outcomes = tracker.outcomes();

        assert_eq!(outcomes[0].result.as_ref().unwrap().value, "2");
        assert_eq!(outcomes[1].result.as_ref().unwrap().value, "1");
        // recovered has a single data row
        assert_eq!(
            outcomes[2].result,
            Err(UpdateError::Extract(ExtractError::IndexOutOfRange {
                index: 2,
                rows: 2
            }))
        );
    }

    #[test]
    fn test_outcomes_are_repeatable() {
        let tracker = Tracker::new(Settings::default().datasets, buffers());
        assert_eq!(tracker.outcomes(), tracker.outcomes());
    }
}
