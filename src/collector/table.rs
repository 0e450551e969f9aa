// src/collector/table.rs
//! Column-oriented parsing for whitespace-delimited tool output.
//!
//! Values are always addressed by column name, so a tool version that
//! reorders or adds columns still yields the same metric.

use crate::error::{ProbeError, ProbeResult};
use std::collections::HashMap;

/// Parse a numeric token that may use either `.` or `,` as decimal separator.
/// Anything unparsable becomes `0.0`.
pub fn parse_decimal(token: &str) -> f64 {
    let token = token.trim();
    token
        .parse::<f64>()
        .or_else(|_| token.replace(',', ".").parse::<f64>())
        .unwrap_or(0.0)
}

/// A header row plus the data rows that follow it.
#[derive(Debug, Clone)]
pub struct ColumnTable {
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl ColumnTable {
    /// Build a table from a header line and data lines.
    pub fn new<'a>(header: &str, rows: impl IntoIterator<Item = &'a str>) -> Self {
        // First occurrence wins if a tool repeats a column name.
        let mut index = HashMap::new();
        for (i, name) in header.split_whitespace().enumerate() {
            index.entry(name.to_string()).or_insert(i);
        }

        let rows = rows
            .into_iter()
            .map(|line| {
                line.split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|tokens| !tokens.is_empty())
            .collect();

        Self { index, rows }
    }

    /// Locate the first line accepted by `is_header` and treat every later
    /// line as a data row. `marker` only labels the error.
    pub fn locate(text: &str, marker: &str, is_header: impl Fn(&str) -> bool) -> ProbeResult<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let header_at = lines
            .iter()
            .position(|line| is_header(line))
            .ok_or_else(|| ProbeError::MarkerNotFound(marker.to_string()))?;

        Ok(Self::new(lines[header_at], lines[header_at + 1..].iter().copied()))
    }

    /// Fixed-offset layout: the marker line anchors the block, the column
    /// header sits `header_offset` lines below it and the single data row
    /// `data_offset` lines below it.
    pub fn at_offsets(
        text: &str,
        marker: &str,
        is_marker: impl Fn(&str) -> bool,
        header_offset: usize,
        data_offset: usize,
    ) -> ProbeResult<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let marker_at = lines
            .iter()
            .position(|line| is_marker(line))
            .ok_or_else(|| ProbeError::MarkerNotFound(marker.to_string()))?;

        let header = lines
            .get(marker_at + header_offset)
            .ok_or_else(|| ProbeError::MarkerNotFound(format!("{marker} header")))?;
        let data = lines
            .get(marker_at + data_offset)
            .ok_or_else(|| ProbeError::MarkerNotFound(format!("{marker} data")))?;

        Ok(Self::new(header, [*data]))
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Resolve a column name to its position in the header.
    pub fn column_index(&self, name: &str) -> ProbeResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ProbeError::ColumnMissing(name.to_string()))
    }

    /// Resolve the first of several alternative names present in the header.
    pub fn column_index_any(&self, names: &[&str]) -> ProbeResult<usize> {
        names
            .iter()
            .find_map(|name| self.index.get(*name).copied())
            .ok_or_else(|| ProbeError::ColumnMissing(names.join("|")))
    }

    /// The first data row whose first token equals `key` exactly.
    pub fn row(&self, key: &str) -> ProbeResult<&[String]> {
        self.rows
            .iter()
            .find(|tokens| tokens[0] == key)
            .map(Vec::as_slice)
            .ok_or_else(|| ProbeError::KeyNotFound(key.to_string()))
    }

    /// The first data row containing `token` anywhere.
    pub fn row_containing(&self, token: &str) -> ProbeResult<&[String]> {
        self.rows
            .iter()
            .find(|tokens| tokens.iter().any(|t| t == token))
            .map(Vec::as_slice)
            .ok_or_else(|| ProbeError::KeyNotFound(token.to_string()))
    }

    /// Read the token of `row` at the position of the first present column
    /// in `columns`.
    pub fn cell<'r>(&self, row: &'r [String], columns: &[&str]) -> ProbeResult<&'r str> {
        let at = self.column_index_any(columns)?;
        row.get(at)
            .map(String::as_str)
            .ok_or_else(|| ProbeError::ShortRow {
                key: row.first().cloned().unwrap_or_default(),
                column: columns.join("|"),
            })
    }

    /// Raw token for `key` in `column`.
    pub fn value(&self, key: &str, column: &str) -> ProbeResult<&str> {
        self.cell(self.row(key)?, &[column])
    }

    /// Decimal value for `key` under the first present of `columns`.
    pub fn float(&self, key: &str, columns: &[&str]) -> ProbeResult<f64> {
        let row = self.row(key)?;
        self.cell(row, columns).map(parse_decimal)
    }

    /// Decimal values for every listed key that has a row. Keys without a
    /// row are skipped; a missing column is still an error.
    pub fn floats(&self, keys: &[&str], column: &str) -> ProbeResult<Vec<f64>> {
        let at = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .filter(|tokens| keys.contains(&tokens[0].as_str()))
            .filter_map(|tokens| tokens.get(at))
            .map(|token| parse_decimal(token))
            .collect())
    }
}

/// Tokens of the first line whose leading token is one of `labels`, e.g. the
/// `Mem:` summary row of `free` or its localized spelling.
pub fn labeled_row<'a>(text: &'a str, labels: &[&str]) -> ProbeResult<Vec<&'a str>> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .find(|tokens| tokens.first().is_some_and(|first| labels.contains(first)))
        .ok_or_else(|| ProbeError::MarkerNotFound(labels.join("|")))
}

/// Paired-column layout used by `ifstat`: `names_line` lists one name per
/// entity, `data_line` holds two values per entity side by side. Returns the
/// pair belonging to `name`.
pub fn paired_columns<'a>(
    text: &'a str,
    names_line: usize,
    data_line: usize,
    name: &str,
) -> ProbeResult<(&'a str, &'a str)> {
    let lines: Vec<&str> = text.lines().collect();
    let names: Vec<&str> = lines
        .get(names_line)
        .ok_or_else(|| ProbeError::MarkerNotFound("interface list".to_string()))?
        .split_whitespace()
        .collect();
    let data: Vec<&str> = lines
        .get(data_line)
        .ok_or_else(|| ProbeError::MarkerNotFound("interface data".to_string()))?
        .split_whitespace()
        .collect();

    let position = names
        .iter()
        .position(|n| *n == name)
        .ok_or_else(|| ProbeError::KeyNotFound(name.to_string()))?;

    match (data.get(position * 2), data.get(position * 2 + 1)) {
        (Some(first), Some(second)) => Ok((*first, *second)),
        _ => Err(ProbeError::ShortRow {
            key: name.to_string(),
            column: format!("{}", position * 2),
        }),
    }
}
