use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::aggregate::DailyAmount;

pub const TOTAL_ROW_LABEL: &str = "Total";

/// Day-indexed table with one column per label and no missing cells.
///
/// Date rows are ascending. `total` is the synthetic column-wise sum row and
/// is kept apart from `rows` so it never takes part in date computations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
    pub total: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

impl Pivot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
impl Pivot {
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn value(&self, date: NaiveDate, label: &str) -> Option<f64> {
        let col = self.column_index(label)?;
        self.rows
            .iter()
            .find(|r| r.date == date)
            .map(|r| r.values[col])
    }
}

pub fn format_pivot_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// Order `present` by `canonical`: canonical labels that are present come
/// first in canonical order, any other present labels follow in their
/// original order. Canonical labels absent from `present` are dropped.
fn apply_canonical_order(present: Vec<String>, canonical: &[&str]) -> Vec<String> {
    let mut ordered: Vec<String> = canonical
        .iter()
        .filter(|c| present.iter().any(|p| p == *c))
        .map(|c| c.to_string())
        .collect();
    for label in present {
        if !ordered.contains(&label) {
            ordered.push(label);
        }
    }
    ordered
}

pub fn build_pivot(daily: &[DailyAmount], canonical_order: Option<&[&str]>) -> Pivot {
    let mut columns: Vec<String> = Vec::new();
    for entry in daily {
        if !columns.contains(&entry.label) {
            columns.push(entry.label.clone());
        }
    }
    if let Some(order) = canonical_order {
        columns = apply_canonical_order(columns, order);
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for entry in daily {
        // Labels come from `daily` itself, so the lookup always succeeds.
        let Some(col) = columns.iter().position(|c| *c == entry.label) else {
            continue;
        };
        let values = by_date
            .entry(entry.date)
            .or_insert_with(|| vec![0.0; columns.len()]);
        values[col] += entry.amount;
    }

    let rows: Vec<PivotRow> = by_date
        .into_iter()
        .map(|(date, values)| PivotRow { date, values })
        .collect();

    let total = if rows.is_empty() {
        None
    } else {
        let mut sums = vec![0.0; columns.len()];
        for row in &rows {
            for (sum, v) in sums.iter_mut().zip(&row.values) {
                *sum += v;
            }
        }
        Some(sums)
    };

    Pivot { columns, rows, total }
}
