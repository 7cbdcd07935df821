use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{run_report, InputArgs};
use crate::error::Result;
use crate::fmt::{amount, count, total};
use crate::pivot::{format_pivot_date, Pivot, TOTAL_ROW_LABEL};
use crate::reports::{ConversionReport, Report, SheetReport};

pub fn run(input: &InputArgs) -> Result<()> {
    let report = run_report(input)?;
    println!("{}", format_report(&report));
    let issues = format_issues(&report);
    if !issues.is_empty() {
        eprintln!("{issues}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report data → String)
// ---------------------------------------------------------------------------

pub fn format_report(report: &Report) -> String {
    let mut sections = vec![format!(
        "Period: {} to {}",
        report.range.start, report.range.end
    )];
    if let Some(conversions) = &report.conversions {
        sections.push(format_conversions(conversions));
    }
    for sheet in &report.sheets {
        sections.push(format_sheet(sheet));
    }
    sections.join("\n\n")
}

pub fn format_conversions(data: &ConversionReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["分類", "媒体", "CV合計"]);
    for group in &data.grouped {
        table.add_row(vec![
            Cell::new(&group.category),
            Cell::new(&group.media),
            Cell::new(count(group.cv_total)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(count(data.total())),
    ]);
    format!(
        "Conversions: {} rows in range, {} classified codes\n{table}",
        data.rows_in_range,
        data.codes.len()
    )
}

pub fn format_sheet(sheet: &SheetReport) -> String {
    let mut totals = Table::new();
    totals.set_header(vec!["項目", "合計値"]);
    for item in &sheet.totals {
        let value = match &item.amount {
            Ok(_) => Cell::new(total(&item.amount)),
            Err(_) => Cell::new(total(&item.amount).red()),
        };
        totals.add_row(vec![Cell::new(&item.label), value]);
    }

    let heading = format!(
        "{} [{}] ({} rows in range)",
        sheet.sheet.bold(),
        sheet.sheet_type,
        sheet.rows_in_range
    );
    let daily = if sheet.pivot.is_empty() {
        "No daily data in range.".dimmed().to_string()
    } else {
        format_pivot(&sheet.pivot)
    };
    format!("{heading}\n{totals}\n{daily}")
}

pub fn format_pivot(pivot: &Pivot) -> String {
    let mut table = Table::new();
    let mut header = vec!["日付".to_string()];
    header.extend(pivot.columns.iter().cloned());
    table.set_header(header);

    for row in &pivot.rows {
        let mut cells = vec![Cell::new(format_pivot_date(row.date))];
        cells.extend(row.values.iter().map(|v| Cell::new(amount(*v))));
        table.add_row(cells);
    }
    if let Some(sums) = &pivot.total {
        let mut cells = vec![Cell::new(TOTAL_ROW_LABEL.bold())];
        cells.extend(sums.iter().map(|v| Cell::new(amount(*v).bold())));
        table.add_row(cells);
    }
    table.to_string()
}

/// Warnings and skipped sheets, or an empty string when the run was clean.
pub fn format_issues(report: &Report) -> String {
    let mut lines = Vec::new();
    for warning in &report.warnings {
        lines.push(format!("{} {warning}", "warning:".yellow().bold()));
    }
    for failure in &report.failures {
        lines.push(format!(
            "{} {}: {}",
            "skipped:".red().bold(),
            failure.sheet,
            failure.reason
        ));
    }
    lines.join("\n")
}
