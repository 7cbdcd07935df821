use std::collections::HashMap;

use chrono::NaiveDate;

/// A single spreadsheet cell, detached from whichever reader produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// A flat row table as loaded from one worksheet or CSV file.
///
/// `headers` defines the column set: an offset at or beyond `width()` does not
/// exist in this table even if a ragged row happens to be longer.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn has_column(&self, offset: usize) -> bool {
        offset < self.width()
    }
}

/// A cost-report sheet that could not be processed. Other sheets carry on.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetFailure {
    pub sheet: String,
    pub reason: String,
}

/// The relevant sheets of one cost-report workbook.
#[derive(Debug, Clone, Default)]
pub struct CostWorkbook {
    /// Listing / Display / affiliate sheets in workbook order.
    pub sheets: Vec<Table>,
    /// Relevant sheets that could not be read.
    pub failures: Vec<SheetFailure>,
}

/// One master-table entry mapping an ad code to its media and category.
#[derive(Debug, Clone, PartialEq)]
pub struct AdCodeRecord {
    pub code: String,
    pub media: String,
    pub category: String,
}

/// Ad code → (media, category) lookup built from the master table.
#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    entries: HashMap<String, (String, String)>,
}

impl MasterTable {
    pub fn from_records(records: impl IntoIterator<Item = AdCodeRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|r| (r.code, (r.media, r.category)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, code: &str) -> Option<(&str, &str)> {
        self.entries
            .get(code)
            .map(|(media, category)| (media.as_str(), category.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inclusive reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
