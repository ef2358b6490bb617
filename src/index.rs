// src/index.rs
//! Record rows, the borrower index and the snapshot that pairs them
use crate::constants;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// One line of the dataset sheet, cells normalised to text.
///
/// The Sheets API drops trailing empty cells, so a column past the end of
/// `cells` is *absent* rather than empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordRow {
    cells: Vec<String>,
}

impl RecordRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Build a row from raw Sheets API values
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            cells: values.into_iter().map(cell_text).collect(),
        }
    }

    /// Cell at `col`, `None` when the column is absent
    pub fn cell(&self, col: usize) -> Option<&str> {
        self.cells.get(col).map(String::as_str)
    }

    /// Cell at `col` if present and non-empty
    pub fn non_empty(&self, col: usize) -> Option<&str> {
        self.cell(col).filter(|s| !s.is_empty())
    }

    /// Trimmed borrower name, `None` when blank
    pub fn borrower_name(&self) -> Option<&str> {
        self.cell(constants::COL_BORROWER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        self.cell(constants::COL_CATEGORY)
    }
}

/// Render a Sheets cell value as text
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Borrower name -> positions of that borrower's rows, in source order
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    by_name: HashMap<String, Vec<usize>>,
}

impl RowIndex {
    pub fn build(rows: &[RecordRow]) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, row) in rows.iter().enumerate() {
            let Some(name) = row.borrower_name() else {
                continue;
            };
            by_name.entry(name.to_string()).or_default().push(pos);
        }
        Self { by_name }
    }

    pub fn positions(&self, name: &str) -> Option<&[usize]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// One load generation: every row plus the index derived from exactly those rows.
///
/// The only constructor builds both halves together, and the index stores
/// positions into this snapshot's own row list, so a snapshot can never pair
/// rows and index from different loads.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    rows: Vec<RecordRow>,
    index: RowIndex,
}

impl Snapshot {
    pub fn new(generation: u64, rows: Vec<RecordRow>) -> Self {
        let index = RowIndex::build(&rows);
        Self {
            generation,
            loaded_at: Utc::now(),
            rows,
            index,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn rows(&self) -> &[RecordRow] {
        &self.rows
    }

    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    /// Rows of one borrower in source order; empty when unknown
    pub fn rows_for(&self, name: &str) -> Vec<&RecordRow> {
        self.index
            .positions(name)
            .unwrap_or_default()
            .iter()
            .filter_map(|&pos| self.rows.get(pos))
            .collect()
    }

    pub fn borrower_count(&self) -> usize {
        self.index.len()
    }
}
