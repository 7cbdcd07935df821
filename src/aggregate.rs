use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::classifier::classify;
use crate::filter::DatedRow;
use crate::models::{Cell, MasterTable, Table};

// ---------------------------------------------------------------------------
// Cell amounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnError {
    /// The sheet is narrower than the configured offset.
    Missing { offset: usize, width: usize },
    /// A cell in the column holds text that is not a number.
    NotNumeric { offset: usize, value: String },
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { offset, width } => {
                write!(f, "column {offset} is out of range (sheet has {width} columns)")
            }
            Self::NotNumeric { offset, value } => {
                write!(f, "column {offset} holds non-numeric value {value:?}")
            }
        }
    }
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', "").replace('¥', "").replace('￥', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

/// Numeric value of a cell. Blank cells are `Some(None)`: present but empty.
fn cell_amount(cell: &Cell) -> Result<Option<f64>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) => Ok(Some(*n)),
        Cell::Text(s) if s.trim().is_empty() => Ok(None),
        Cell::Text(s) => parse_amount(s).map(Some).ok_or_else(|| s.clone()),
        Cell::Date(d) => Err(d.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LabelTotal {
    pub label: String,
    pub amount: Result<f64, ColumnError>,
}

/// Sum each label's column over `rows`, one entry per label in map order.
pub fn total_by_label(
    rows: &[DatedRow<'_>],
    column_map: &[(&str, usize)],
    width: usize,
) -> Vec<LabelTotal> {
    column_map
        .iter()
        .map(|(label, offset)| LabelTotal {
            label: label.to_string(),
            amount: sum_column(rows, *offset, width),
        })
        .collect()
}

fn sum_column(rows: &[DatedRow<'_>], offset: usize, width: usize) -> Result<f64, ColumnError> {
    if offset >= width {
        return Err(ColumnError::Missing { offset, width });
    }
    let mut total = 0.0;
    for row in rows {
        match cell_amount(row.cell(offset)) {
            Ok(v) => total += v.unwrap_or(0.0),
            Err(value) => return Err(ColumnError::NotNumeric { offset, value }),
        }
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Daily series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DailyAmount {
    pub date: NaiveDate,
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    /// Summed amounts, ordered by label (map order) then date.
    pub amounts: Vec<DailyAmount>,
    /// Labels left out of the series and why.
    pub skipped: Vec<(String, ColumnError)>,
}

/// Pair every row's date with each label's amount and sum per (date, label).
///
/// Blank and non-numeric cells count as zero so every filtered date shows up
/// under every usable label.
pub fn daily_by_label(
    rows: &[DatedRow<'_>],
    column_map: &[(&str, usize)],
    width: usize,
) -> DailySeries {
    let mut series = DailySeries::default();
    for (label, offset) in column_map {
        if *offset >= width {
            series.skipped.push((
                label.to_string(),
                ColumnError::Missing { offset: *offset, width },
            ));
            continue;
        }
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for row in rows {
            let amount = cell_amount(row.cell(*offset)).ok().flatten().unwrap_or(0.0);
            *by_date.entry(row.date).or_default() += amount;
        }
        series.amounts.extend(by_date.into_iter().map(|(date, amount)| DailyAmount {
            date,
            label: label.to_string(),
            amount,
        }));
    }
    series
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CodeTotal {
    pub code: String,
    pub media: String,
    pub category: String,
    pub cv_total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedConversion {
    pub category: String,
    pub media: String,
    pub cv_total: f64,
}

/// Sum every classifiable ad-code column of the conversion log over `rows`.
/// Column 0 is the date; unclassified codes are dropped.
pub fn total_by_code(log: &Table, rows: &[DatedRow<'_>], master: &MasterTable) -> Vec<CodeTotal> {
    log.headers
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(offset, code)| {
            let class = classify(code.trim(), master)?;
            let cv_total = rows
                .iter()
                .map(|row| cell_amount(row.cell(offset)).ok().flatten().unwrap_or(0.0))
                .sum();
            Some(CodeTotal {
                code: code.trim().to_string(),
                media: class.media,
                category: class.category,
                cv_total,
            })
        })
        .collect()
}

/// Group code totals by (category, media), sorted by category then media.
pub fn group_by_category(codes: &[CodeTotal]) -> Vec<ClassifiedConversion> {
    let mut groups: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for c in codes {
        *groups.entry((c.category.as_str(), c.media.as_str())).or_default() += c.cv_total;
    }
    groups
        .into_iter()
        .map(|((category, media), cv_total)| ClassifiedConversion {
            category: category.to_string(),
            media: media.to_string(),
            cv_total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_by_date;
    use crate::models::AdCodeRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
    }

    /// Rows shaped `[date, a, b]`.
    fn sheet(rows: &[(u32, Cell, Cell)]) -> Vec<Vec<Cell>> {
        rows.iter()
            .map(|(day, a, b)| vec![Cell::Date(d(*day)), a.clone(), b.clone()])
            .collect()
    }

    const MAP: &[(&str, usize)] = &[("A", 1), ("B", 2)];

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount(" 42 "), Some(42.0));
        assert_eq!(parse_amount("¥1,000"), Some(1000.0));
        assert_eq!(parse_amount("(500)"), Some(-500.0));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_total_by_label_sums_columns() {
        let data = sheet(&[
            (1, Cell::Number(10.0), Cell::Number(1.5)),
            (2, Cell::Number(20.0), Cell::Empty),
            (3, Cell::Text("1,000".into()), Cell::Number(2.5)),
        ]);
        let rows = filter_by_date(&data, 0, d(1), d(31));
        let totals = total_by_label(&rows, MAP, 3);
        assert_eq!(totals[0].label, "A");
        assert_eq!(totals[0].amount, Ok(1030.0));
        assert_eq!(totals[1].amount, Ok(4.0));
    }

    #[test]
    fn test_total_missing_column_is_per_label_error() {
        let data = sheet(&[(1, Cell::Number(10.0), Cell::Number(1.0))]);
        let rows = filter_by_date(&data, 0, d(1), d(31));
        let map: &[(&str, usize)] = &[("A", 1), ("Far", 40)];
        let totals = total_by_label(&rows, map, 3);
        assert_eq!(totals[0].amount, Ok(10.0));
        assert_eq!(
            totals[1].amount,
            Err(ColumnError::Missing { offset: 40, width: 3 })
        );
    }

    #[test]
    fn test_total_non_numeric_is_per_label_error() {
        let data = sheet(&[
            (1, Cell::Number(10.0), Cell::Text("n/a".into())),
            (2, Cell::Number(5.0), Cell::Number(1.0)),
        ]);
        let rows = filter_by_date(&data, 0, d(1), d(31));
        let totals = total_by_label(&rows, MAP, 3);
        assert_eq!(totals[0].amount, Ok(15.0));
        assert!(matches!(totals[1].amount, Err(ColumnError::NotNumeric { offset: 2, .. })));
    }

    #[test]
    fn test_total_of_no_rows_is_zero() {
        let data = sheet(&[(1, Cell::Number(10.0), Cell::Number(1.0))]);
        let rows = filter_by_date(&data, 0, d(20), d(31));
        assert!(rows.is_empty());
        let totals = total_by_label(&rows, MAP, 3);
        assert!(totals.iter().all(|t| t.amount == Ok(0.0)));
    }

    #[test]
    fn test_daily_combines_same_date() {
        let data = sheet(&[
            (1, Cell::Number(10.0), Cell::Number(1.0)),
            (1, Cell::Number(5.0), Cell::Number(2.0)),
            (2, Cell::Number(7.0), Cell::Empty),
        ]);
        let rows = filter_by_date(&data, 0, d(1), d(31));
        let series = daily_by_label(&rows, MAP, 3);
        assert!(series.skipped.is_empty());
        assert_eq!(
            series.amounts,
            vec![
                DailyAmount { date: d(1), label: "A".into(), amount: 15.0 },
                DailyAmount { date: d(2), label: "A".into(), amount: 7.0 },
                DailyAmount { date: d(1), label: "B".into(), amount: 3.0 },
                DailyAmount { date: d(2), label: "B".into(), amount: 0.0 },
            ]
        );
    }

    #[test]
    fn test_daily_skips_missing_columns() {
        let data = sheet(&[(1, Cell::Number(10.0), Cell::Number(1.0))]);
        let rows = filter_by_date(&data, 0, d(1), d(31));
        let map: &[(&str, usize)] = &[("A", 1), ("Far", 99)];
        let series = daily_by_label(&rows, map, 3);
        assert_eq!(series.amounts.len(), 1);
        assert_eq!(series.skipped.len(), 1);
        assert_eq!(series.skipped[0].0, "Far");
    }

    fn cv_log() -> Table {
        Table {
            name: "cv".into(),
            headers: vec!["日付".into(), "GEN001".into(), "AF100".into(), "UNKNOWN".into()],
            rows: vec![
                vec![Cell::Text("20251001".into()), Cell::Number(3.0), Cell::Number(2.0), Cell::Number(9.0)],
                vec![Cell::Text("20251002".into()), Cell::Number(5.0), Cell::Number(1.0), Cell::Number(9.0)],
            ],
        }
    }

    fn master() -> MasterTable {
        MasterTable::from_records([AdCodeRecord {
            code: "AF100".into(),
            media: "Google".into(),
            category: "SEM".into(),
        }])
    }

    #[test]
    fn test_conversion_scenario() {
        let log = cv_log();
        let rows = filter_by_date(&log.rows, 0, d(1), d(2));
        let codes = total_by_code(&log, &rows, &master());
        assert_eq!(codes.len(), 2);
        let grouped = group_by_category(&codes);
        assert_eq!(
            grouped,
            vec![
                ClassifiedConversion {
                    category: "Affiliate".into(),
                    media: "Affiliate".into(),
                    cv_total: 8.0,
                },
                ClassifiedConversion {
                    category: "SEM".into(),
                    media: "Google".into(),
                    cv_total: 3.0,
                },
            ]
        );
    }

    #[test]
    fn test_conversion_respects_date_filter() {
        let log = cv_log();
        let rows = filter_by_date(&log.rows, 0, d(2), d(2));
        let grouped = group_by_category(&total_by_code(&log, &rows, &master()));
        assert_eq!(grouped[0].cv_total, 5.0);
        assert_eq!(grouped[1].cv_total, 1.0);
    }

    #[test]
    fn test_group_merges_codes_in_same_bucket() {
        let codes = vec![
            CodeTotal { code: "GEN1".into(), media: "Affiliate".into(), category: "Affiliate".into(), cv_total: 2.0 },
            CodeTotal { code: "AFA1".into(), media: "Affiliate".into(), category: "Affiliate".into(), cv_total: 3.0 },
            CodeTotal { code: "X1".into(), media: "Yahoo".into(), category: "SEM".into(), cv_total: 1.0 },
            CodeTotal { code: "X2".into(), media: "Google".into(), category: "SEM".into(), cv_total: 4.0 },
        ];
        let grouped = group_by_category(&codes);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].cv_total, 5.0);
        assert_eq!((grouped[1].category.as_str(), grouped[1].media.as_str()), ("SEM", "Google"));
        assert_eq!((grouped[2].category.as_str(), grouped[2].media.as_str()), ("SEM", "Yahoo"));
    }
}
