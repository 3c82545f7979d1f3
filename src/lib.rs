pub mod config;
pub mod display;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod serve;
pub mod update;

pub use config::{DatasetConfig, DatasetKind, Settings};
pub use error::{ExtractError, FetchError};
pub use extract::{extract, extract_country, ExtractionRequest, ExtractionResult, RowSelector};
pub use update::Tracker;
