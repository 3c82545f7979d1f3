use csv::ReaderBuilder;
use std::io::Cursor;

use crate::error::ExtractError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parsed CSV content. Row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parse raw CSV bytes. Every row must have the header's cell count.
    pub fn parse(content: &[u8]) -> Result<Self, ExtractError> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

        check_quotes(content)?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(false)
            .from_reader(Cursor::new(content));

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| ExtractError::MalformedInput(e.to_string()))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { rows })
    }

    /// Build a table from rows already in memory, checking the width invariant.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self, ExtractError> {
        if let Some(width) = rows.first().map(Vec::len) {
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                return Err(ExtractError::MalformedInput(format!(
                    "row {} has {} cells, header has {}",
                    i,
                    row.len(),
                    width
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Index of the last header column, i.e. the most recent date.
    pub fn latest_column(&self) -> Option<usize> {
        self.header().and_then(|h| h.len().checked_sub(1))
    }

    /// Position of the first header cell starting with `prefix` (case-insensitive).
    pub fn column_starting_with(&self, prefix: &str) -> Option<usize> {
        let prefix = prefix.to_ascii_lowercase();
        self.header()?
            .iter()
            .position(|h| h.trim().to_ascii_lowercase().starts_with(&prefix))
    }

    /// Data rows with their table index, header excluded.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, r)| (i, r.as_slice()))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` seen inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
}

/// RFC 4180 quote rules. The csv reader accepts stray quotes in unquoted
/// fields and closes an open quote at EOF, so both are rejected up front.
fn check_quotes(content: &[u8]) -> Result<(), ExtractError> {
    use QuoteState::*;

    let mut state = FieldStart;
    let mut line = 1;
    for &b in content {
        state = match (state, b) {
            (FieldStart, b'"') => Quoted,
            (Unquoted, b'"') => {
                return Err(ExtractError::MalformedInput(format!(
                    "bare quote in unquoted field on line {}",
                    line
                )))
            }
            (FieldStart | Unquoted, b',' | b'\r') => FieldStart,
            (FieldStart | Unquoted, b'\n') => {
                line += 1;
                FieldStart
            }
            (FieldStart | Unquoted, _) => Unquoted,
            (Quoted, b'"') => QuoteInQuoted,
            (Quoted, b) => {
                if b == b'\n' {
                    line += 1;
                }
                Quoted
            }
            (QuoteInQuoted, b'"') => Quoted,
            (QuoteInQuoted, b',' | b'\r') => FieldStart,
            (QuoteInQuoted, b'\n') => {
                line += 1;
                FieldStart
            }
            (QuoteInQuoted, _) => {
                return Err(ExtractError::MalformedInput(format!(
                    "extraneous character after closing quote on line {}",
                    line
                )))
            }
        };
    }

    if state == Quoted {
        return Err(ExtractError::MalformedInput(
            "unterminated quoted field".to_string(),
        ));
    }
    Ok(())
}
