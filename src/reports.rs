use std::fmt;

use chrono::NaiveDate;

use crate::aggregate::{
    daily_by_label, group_by_category, total_by_code, total_by_label, ClassifiedConversion,
    CodeTotal, ColumnError, LabelTotal,
};
use crate::columns::{columns_for, date_offset, SheetType};
use crate::filter::{date_span, filter_by_date, parse_cell_date};
use crate::models::{CostWorkbook, DateRange, MasterTable, SheetFailure, Table};
use crate::pivot::{build_pivot, Pivot};

/// The CV log always carries its date in the first column.
const CV_DATE_COLUMN: usize = 0;

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    InvertedRange { start: NaiveDate, end: NaiveDate },
    NoParsableDates { table: String, column: usize },
    LabelSkipped { sheet: String, label: String, error: ColumnError },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertedRange { start, end } => {
                write!(f, "start date {start} is after end date {end}; nothing will match")
            }
            Self::NoParsableDates { table, column } => {
                write!(f, "{table}: no parsable dates in column {column}")
            }
            Self::LabelSkipped { sheet, label, error } => {
                write!(f, "{sheet}: {label} left out of the daily series ({error})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// Everything one report run reads and accumulates. Built fresh per run.
pub struct RunContext<'a> {
    pub range: DateRange,
    pub master: &'a MasterTable,
    warnings: Vec<Warning>,
    failures: Vec<SheetFailure>,
}

impl<'a> RunContext<'a> {
    pub fn new(range: DateRange, master: &'a MasterTable) -> Self {
        let mut ctx = Self {
            range,
            master,
            warnings: Vec::new(),
            failures: Vec::new(),
        };
        if range.is_inverted() {
            ctx.warn(Warning::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }
        ctx
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn fail(&mut self, failure: SheetFailure) {
        tracing::warn!(sheet = %failure.sheet, reason = %failure.reason, "sheet skipped");
        self.failures.push(failure);
    }

    /// Warn when a non-empty table has no parsable date at all, so an empty
    /// result is never silent.
    fn check_dates(&mut self, table: &Table, column: usize) {
        let any_date = table
            .rows
            .iter()
            .any(|row| row.get(column).and_then(parse_cell_date).is_some());
        if !table.rows.is_empty() && !any_date {
            self.warn(Warning::NoParsableDates {
                table: table.name.clone(),
                column,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub rows_in_range: usize,
    pub codes: Vec<CodeTotal>,
    pub grouped: Vec<ClassifiedConversion>,
}

impl ConversionReport {
    pub fn total(&self) -> f64 {
        self.grouped.iter().map(|g| g.cv_total).sum()
    }
}

#[derive(Debug, Clone)]
pub struct SheetReport {
    pub sheet: String,
    pub sheet_type: SheetType,
    pub rows_in_range: usize,
    pub totals: Vec<LabelTotal>,
    pub pivot: Pivot,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub range: DateRange,
    pub conversions: Option<ConversionReport>,
    pub sheets: Vec<SheetReport>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<SheetFailure>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Default reporting period: the CV log's date span, else `today` alone.
pub fn default_range(cv_log: Option<&Table>, today: NaiveDate) -> DateRange {
    cv_log
        .and_then(|log| date_span(&log.rows, CV_DATE_COLUMN))
        .map(|(start, end)| DateRange::new(start, end))
        .unwrap_or_else(|| DateRange::new(today, today))
}

pub fn build_conversion_report(ctx: &mut RunContext<'_>, log: &Table) -> ConversionReport {
    ctx.check_dates(log, CV_DATE_COLUMN);
    let rows = filter_by_date(&log.rows, CV_DATE_COLUMN, ctx.range.start, ctx.range.end);
    let codes = total_by_code(log, &rows, ctx.master);
    tracing::info!(
        rows = rows.len(),
        classified = codes.len(),
        columns = log.width().saturating_sub(1),
        "aggregated CV log"
    );
    let grouped = group_by_category(&codes);
    ConversionReport {
        rows_in_range: rows.len(),
        codes,
        grouped,
    }
}

pub fn build_sheet_report(
    ctx: &mut RunContext<'_>,
    sheet: &Table,
) -> std::result::Result<SheetReport, SheetFailure> {
    let sheet_type = SheetType::from_sheet_name(&sheet.name);
    let date_column = date_offset(sheet_type);
    if !sheet.has_column(date_column) {
        return Err(SheetFailure {
            sheet: sheet.name.clone(),
            reason: format!(
                "date column {date_column} is missing (sheet has {} columns)",
                sheet.width()
            ),
        });
    }
    ctx.check_dates(sheet, date_column);

    let rows = filter_by_date(&sheet.rows, date_column, ctx.range.start, ctx.range.end);
    let columns = columns_for(sheet_type);
    let totals = total_by_label(&rows, columns, sheet.width());
    let daily = daily_by_label(&rows, columns, sheet.width());
    for (label, error) in daily.skipped {
        ctx.warn(Warning::LabelSkipped {
            sheet: sheet.name.clone(),
            label,
            error,
        });
    }
    let pivot = build_pivot(&daily.amounts, sheet_type.canonical_order());
    tracing::info!(
        sheet = %sheet.name,
        sheet_type = %sheet_type,
        rows = rows.len(),
        dates = pivot.rows.len(),
        "aggregated cost sheet"
    );

    Ok(SheetReport {
        sheet: sheet.name.clone(),
        sheet_type,
        rows_in_range: rows.len(),
        totals,
        pivot,
    })
}

/// Run the whole pipeline. Sheet failures are collected, never propagated.
pub fn assemble(
    mut ctx: RunContext<'_>,
    cv_log: Option<&Table>,
    cost: Option<&CostWorkbook>,
) -> Report {
    let conversions = cv_log.map(|log| build_conversion_report(&mut ctx, log));

    let mut sheets = Vec::new();
    if let Some(cost) = cost {
        for failure in &cost.failures {
            ctx.fail(failure.clone());
        }
        for sheet in &cost.sheets {
            match build_sheet_report(&mut ctx, sheet) {
                Ok(report) => sheets.push(report),
                Err(failure) => ctx.fail(failure),
            }
        }
    }

    Report {
        range: ctx.range,
        conversions,
        sheets,
        warnings: ctx.warnings,
        failures: ctx.failures,
    }
}
