//! Workbook export of an assembled report.
//!
//! Sheet layout:
//!
//! ```text
//! 申込件数          | 分類 | 媒体 | CV合計 |
//! Listing_集計      | 日付 | Listing ALL | Googleその他 | ... |   (+ Total row)
//! Display_集計      | 日付 | Display ALL | Meta | ... |         (+ Total row)
//! <sheet>_合計      | 項目 | 合計値 |                           (with totals only)
//! ```

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::{ReportError, Result};
use crate::fmt::ERROR_MARKER;
use crate::models::DateRange;
use crate::pivot::{format_pivot_date, Pivot, TOTAL_ROW_LABEL};
use crate::reports::{ConversionReport, Report, SheetReport};

/// Excel rejects longer sheet names.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

pub const CONVERSION_SHEET: &str = "申込件数";

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Add one label-totals sheet per cost sheet.
    pub include_totals: bool,
}

struct Formats {
    header: Format,
    amount: Format,
    count: Format,
    total_label: Format,
    total_amount: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            amount: Format::new().set_num_format("#,##0.00"),
            count: Format::new().set_num_format("#,##0"),
            total_label: Format::new().set_bold(),
            total_amount: Format::new().set_bold().set_num_format("#,##0.00"),
        }
    }
}

pub fn default_filename(range: &DateRange) -> String {
    format!(
        "申込件数配信費集計_{}_{}.xlsx",
        range.start.format("%Y%m%d"),
        range.end.format("%Y%m%d")
    )
}

/// Make `base` a legal, unused sheet name: forbidden characters become `_`,
/// the name is cut to 31 characters and clashes get a ` (n)` suffix.
fn unique_sheet_name(base: &str, used: &mut Vec<String>) -> String {
    let clean: String = base
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .collect();
    let mut n = 1;
    loop {
        let suffix = if n == 1 { String::new() } else { format!(" ({n})") };
        let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
        let candidate: String = clean.chars().take(keep).collect::<String>() + &suffix;
        let folded = candidate.to_lowercase();
        if !used.iter().any(|u| u.to_lowercase() == folded) {
            used.push(candidate.clone());
            return candidate;
        }
        n += 1;
    }
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    Ok(())
}

fn write_conversions(
    sheet: &mut Worksheet,
    conversions: &ConversionReport,
    formats: &Formats,
) -> Result<()> {
    write_headers(sheet, &["分類", "媒体", "CV合計"], &formats.header)?;
    for (i, group) in conversions.grouped.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &group.category)?;
        sheet.write_string(row, 1, &group.media)?;
        sheet.write_number_with_format(row, 2, group.cv_total, &formats.count)?;
    }
    sheet.set_column_width(0, 16)?;
    sheet.set_column_width(1, 16)?;
    sheet.set_column_width(2, 10)?;
    Ok(())
}

fn write_pivot(sheet: &mut Worksheet, pivot: &Pivot, formats: &Formats) -> Result<()> {
    let mut headers = vec!["日付"];
    headers.extend(pivot.columns.iter().map(String::as_str));
    write_headers(sheet, &headers, &formats.header)?;

    let mut row = 1u32;
    for date_row in &pivot.rows {
        sheet.write_string(row, 0, format_pivot_date(date_row.date))?;
        for (col, value) in date_row.values.iter().enumerate() {
            sheet.write_number_with_format(row, col as u16 + 1, *value, &formats.amount)?;
        }
        row += 1;
    }
    if let Some(total) = &pivot.total {
        sheet.write_string_with_format(row, 0, TOTAL_ROW_LABEL, &formats.total_label)?;
        for (col, value) in total.iter().enumerate() {
            sheet.write_number_with_format(row, col as u16 + 1, *value, &formats.total_amount)?;
        }
    }

    sheet.set_column_width(0, 12)?;
    for col in 1..=pivot.columns.len() {
        sheet.set_column_width(col as u16, 16)?;
    }
    Ok(())
}

fn write_totals(sheet: &mut Worksheet, report: &SheetReport, formats: &Formats) -> Result<()> {
    write_headers(sheet, &["項目", "合計値"], &formats.header)?;
    for (i, total) in report.totals.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &total.label)?;
        match &total.amount {
            Ok(v) => sheet.write_number_with_format(row, 1, *v, &formats.amount)?,
            Err(_) => sheet.write_string(row, 1, ERROR_MARKER)?,
        };
    }
    sheet.set_column_width(0, 20)?;
    sheet.set_column_width(1, 16)?;
    Ok(())
}

/// Render the report as xlsx bytes.
pub fn render_workbook(report: &Report, options: ExportOptions) -> Result<Vec<u8>> {
    if report.conversions.is_none() && report.sheets.is_empty() {
        return Err(ReportError::Other("nothing to export".into()));
    }

    let mut workbook = Workbook::new();
    let formats = Formats::new();
    let mut used: Vec<String> = Vec::new();

    if let Some(conversions) = &report.conversions {
        let sheet = workbook.add_worksheet();
        sheet.set_name(unique_sheet_name(CONVERSION_SHEET, &mut used))?;
        write_conversions(sheet, conversions, &formats)?;
    }

    for sheet_report in &report.sheets {
        let sheet = workbook.add_worksheet();
        let base = format!("{}_集計", sheet_report.sheet_type);
        sheet.set_name(unique_sheet_name(&base, &mut used))?;
        write_pivot(sheet, &sheet_report.pivot, &formats)?;
    }

    if options.include_totals {
        for sheet_report in &report.sheets {
            let sheet = workbook.add_worksheet();
            let base = format!("{}_合計", sheet_report.sheet);
            sheet.set_name(unique_sheet_name(&base, &mut used))?;
            write_totals(sheet, sheet_report, &formats)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Write the workbook to `path`, creating parent directories as needed.
pub fn write_workbook(report: &Report, options: ExportOptions, path: &Path) -> Result<PathBuf> {
    let bytes = render_workbook(report, options)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), "wrote workbook");
    Ok(path.to_path_buf())
}
