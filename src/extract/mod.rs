// src/extract/mod.rs

pub mod date_parser;
pub mod table;

use chrono::NaiveDate;
use std::fmt;

use crate::error::ExtractError;
pub use date_parser::parse_header_date;
pub use table::CsvTable;

/// How the data row is located inside a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelector {
    /// Fixed table position. Valid iff `1 <= n < row count`.
    Index(usize),
    /// Row whose country column equals the name.
    Country(String),
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSelector::Index(i) => write!(f, "row {}", i),
            RowSelector::Country(c) => write!(f, "country {}", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub target: RowSelector,
    pub country_label: String,
}

impl ExtractionRequest {
    pub fn new(target: RowSelector, country_label: impl Into<String>) -> Self {
        Self {
            target,
            country_label: country_label.into(),
        }
    }
}

/// The latest value of one row. `Display` yields `"{label} on {date}\n{value}\n"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub country_label: String,
    pub date: String,
    pub value: String,
}

impl ExtractionResult {
    /// The date label as a calendar date, when it is in `M/D/YY` form.
    pub fn as_of(&self) -> Option<NaiveDate> {
        parse_header_date(&self.date)
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}\n{}\n", self.country_label, self.date, self.value)
    }
}

/// Summarise the most recent value of row `target_row_index`.
pub fn extract(
    content: &[u8],
    target_row_index: usize,
    country_label: &str,
) -> Result<String, ExtractError> {
    let request = ExtractionRequest::new(RowSelector::Index(target_row_index), country_label);
    extract_request(content, &request).map(|r| r.to_string())
}

/// Summarise the most recent value of the row belonging to `country`.
pub fn extract_country(content: &[u8], country: &str) -> Result<String, ExtractError> {
    let request = ExtractionRequest::new(RowSelector::Country(country.to_string()), country);
    extract_request(content, &request).map(|r| r.to_string())
}

pub fn extract_request(
    content: &[u8],
    request: &ExtractionRequest,
) -> Result<ExtractionResult, ExtractError> {
    let table = CsvTable::parse(content)?;
    extract_from_table(&table, request)
}

pub fn extract_from_table(
    table: &CsvTable,
    request: &ExtractionRequest,
) -> Result<ExtractionResult, ExtractError> {
    let row_index = match &request.target {
        RowSelector::Index(i) => *i,
        RowSelector::Country(name) => find_country_row(table, name)?,
    };

    let out_of_range = || ExtractError::IndexOutOfRange {
        index: row_index,
        rows: table.row_count(),
    };
    if row_index == 0 {
        return Err(out_of_range());
    }

    let header = table.header().ok_or_else(out_of_range)?;
    let date_index = table.latest_column().ok_or_else(out_of_range)?;
    let row = table.row(row_index).ok_or_else(out_of_range)?;
    let value = row.get(date_index).ok_or_else(out_of_range)?;

    Ok(ExtractionResult {
        country_label: request.country_label.clone(),
        date: header[date_index].clone(),
        value: value.clone(),
    })
}

/// Table index of the country-level row for `country`.
fn find_country_row(table: &CsvTable, country: &str) -> Result<usize, ExtractError> {
    let country_col = table
        .column_starting_with("country")
        .ok_or(ExtractError::MissingColumn("country"))?;
    let province_col = table.column_starting_with("province");
    let wanted = country.trim();

    let matches: Vec<(usize, &[String])> = table
        .data_rows()
        .filter(|(_, row)| row[country_col].trim().eq_ignore_ascii_case(wanted))
        .collect();

    let country_level = matches.iter().find(|(_, row)| match province_col {
        Some(p) => row[p].trim().is_empty(),
        None => true,
    });

    match (country_level, matches.len()) {
        (Some((i, _)), _) => Ok(*i),
        (None, 0) => Err(ExtractError::CountryNotFound(wanted.to_string())),
        (None, 1) => Ok(matches[0].0),
        (None, n) => Err(ExtractError::AmbiguousCountry {
            country: wanted.to_string(),
            matches: n,
        }),
    }
}
