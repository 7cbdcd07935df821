use chrono::{Duration, NaiveDate};

use crate::models::{Cell, DateRange};

/// A source row that survived date filtering, paired with its parsed date.
#[derive(Debug, Clone, Copy)]
pub struct DatedRow<'a> {
    pub date: NaiveDate,
    pub cells: &'a [Cell],
}

impl<'a> DatedRow<'a> {
    pub fn cell(&self, offset: usize) -> &'a Cell {
        self.cells.get(offset).unwrap_or(&Cell::Empty)
    }
}

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

fn parse_compact(digits: &str) -> Option<NaiveDate> {
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(d) = parse_compact(raw) {
        return Some(d);
    }
    // Drop a trailing time part: "2025-10-01 00:00:00", "2025-10-01T00:00:00"
    let day = raw.split([' ', 'T']).next().unwrap_or(raw);
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"] {
        if let Ok(d) = NaiveDate::parse_from_str(day, fmt) {
            return Some(d);
        }
    }
    None
}

/// Coerce a cell to a date. Anything that does not read as a date is `None`.
pub fn parse_cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => {
            if n.fract() == 0.0 && (19_000_101.0..=29_991_231.0).contains(n) {
                parse_compact(&format!("{}", *n as i64))
            } else {
                excel_serial_to_date(*n)
            }
        }
        Cell::Text(s) => parse_date_str(s),
        Cell::Empty => None,
    }
}

/// Keep the rows whose `date_column` parses to a date within `start..=end`.
///
/// The range is not validated: an inverted range simply matches nothing.
pub fn filter_by_date<'a>(
    rows: &'a [Vec<Cell>],
    date_column: usize,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DatedRow<'a>> {
    let range = DateRange::new(start, end);
    rows.iter()
        .filter_map(|row| {
            let date = row.get(date_column).and_then(parse_cell_date)?;
            range.contains(date).then_some(DatedRow { date, cells: row })
        })
        .collect()
}

/// Earliest and latest parsable date in `date_column`, if any.
pub fn date_span(rows: &[Vec<Cell>], date_column: usize) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = rows
        .iter()
        .filter_map(|row| row.get(date_column).and_then(parse_cell_date));
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rows(dates: &[Cell]) -> Vec<Vec<Cell>> {
        dates
            .iter()
            .enumerate()
            .map(|(i, c)| vec![c.clone(), Cell::Number(i as f64)])
            .collect()
    }

    #[test]
    fn test_parse_date_str() {
        assert_eq!(parse_date_str("20251001"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date_str("2025-10-01"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date_str("2025/10/01"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date_str("2025-10-01 00:00:00"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date_str("2025年10月1日"), Some(d(2025, 10, 1)));
        assert_eq!(parse_date_str("合計"), None);
        assert_eq!(parse_date_str("20251301"), None);
        assert_eq!(parse_date_str(""), None);
    }

    #[test]
    fn test_parse_cell_date_numbers() {
        assert_eq!(parse_cell_date(&Cell::Number(20251001.0)), Some(d(2025, 10, 1)));
        assert_eq!(parse_cell_date(&Cell::Number(45931.0)), Some(d(2025, 10, 1)));
        assert_eq!(parse_cell_date(&Cell::Number(45931.75)), Some(d(2025, 10, 1)));
        assert_eq!(parse_cell_date(&Cell::Number(0.0)), None);
        assert_eq!(parse_cell_date(&Cell::Number(-3.0)), None);
        assert_eq!(parse_cell_date(&Cell::Empty), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), Some(d(2025, 1, 10)));
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_filter_is_inclusive_on_both_ends() {
        let data = rows(&[
            Cell::Date(d(2025, 9, 30)),
            Cell::Date(d(2025, 10, 1)),
            Cell::Date(d(2025, 10, 15)),
            Cell::Date(d(2025, 10, 31)),
            Cell::Date(d(2025, 11, 1)),
        ]);
        let kept = filter_by_date(&data, 0, d(2025, 10, 1), d(2025, 10, 31));
        let dates: Vec<NaiveDate> = kept.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2025, 10, 1), d(2025, 10, 15), d(2025, 10, 31)]);
    }

    #[test]
    fn test_filter_single_day_range() {
        let data = rows(&[Cell::Text("20251001".into()), Cell::Text("20251002".into())]);
        let kept = filter_by_date(&data, 0, d(2025, 10, 2), d(2025, 10, 2));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cells[1], Cell::Number(1.0));
    }

    #[test]
    fn test_filter_drops_unparsable_and_missing_dates() {
        let mut data = rows(&[Cell::Text("n/a".into()), Cell::Empty, Cell::Text("2025-10-01".into())]);
        data.push(vec![]);
        let kept = filter_by_date(&data, 0, d(2025, 1, 1), d(2025, 12, 31));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, d(2025, 10, 1));
    }

    #[test]
    fn test_filter_uses_designated_column() {
        let data = vec![
            vec![Cell::Text("x".into()), Cell::Date(d(2025, 10, 1))],
            vec![Cell::Date(d(2025, 10, 1)), Cell::Text("x".into())],
        ];
        let kept = filter_by_date(&data, 1, d(2025, 10, 1), d(2025, 10, 1));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cells[0], Cell::Text("x".into()));
    }

    #[test]
    fn test_inverted_range_matches_nothing() {
        let data = rows(&[Cell::Date(d(2025, 10, 1)), Cell::Date(d(2025, 10, 2))]);
        let kept = filter_by_date(&data, 0, d(2025, 10, 2), d(2025, 10, 1));
        assert!(kept.is_empty());
    }

    #[test]
    fn test_date_span() {
        let data = rows(&[
            Cell::Text("20251005".into()),
            Cell::Text("bad".into()),
            Cell::Text("20251001".into()),
            Cell::Text("20251003".into()),
        ]);
        assert_eq!(date_span(&data, 0), Some((d(2025, 10, 1), d(2025, 10, 5))));
        assert_eq!(date_span(&rows(&[Cell::Empty]), 0), None);
    }

    #[test]
    fn test_dated_row_cell_out_of_range_is_empty() {
        let data = vec![vec![Cell::Date(d(2025, 10, 1))]];
        let kept = filter_by_date(&data, 0, d(2025, 10, 1), d(2025, 10, 1));
        assert_eq!(kept[0].cell(5), &Cell::Empty);
    }
}
