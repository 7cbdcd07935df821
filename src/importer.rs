use std::path::Path;

use calamine::{Data, Range, Reader};
use serde::Deserialize;

use crate::columns::is_relevant_sheet;
use crate::error::{ReportError, Result};
use crate::filter::parse_date_str;
use crate::models::{AdCodeRecord, Cell, CostWorkbook, MasterTable, SheetFailure, Table};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"))
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReportError::MissingReference(path.to_path_buf()))
    }
}

pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        // as_datetime honours the workbook's 1904 date system
        Data::DateTime(dt) if dt.is_datetime() => dt
            .as_datetime()
            .map_or(Cell::Number(dt.as_f64()), |t| Cell::Date(t.date())),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => parse_date_str(s).map_or_else(|| Cell::Text(s.clone()), Cell::Date),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

fn header_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Date(d) => d.to_string(),
    }
}

fn cell_text(row: &[Cell], col: usize) -> String {
    row.get(col).map(header_text).unwrap_or_default()
}

/// Lay a calamine range out on absolute sheet coordinates.
///
/// calamine trims leading empty rows and columns; the cost-report offsets are
/// absolute, so the trimmed area is padded back with empty cells.
fn sheet_grid(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let pad = start_col as usize;
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; pad];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }
    grid
}

fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(|c| *c == Cell::Empty)
}

/// Split a grid into a header row and the data rows below it. The header is
/// the first non-blank row at or after `header_row`.
fn grid_to_table(name: &str, mut grid: Vec<Vec<Cell>>, header_row: usize) -> Table {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let Some(header_row) = (header_row..grid.len()).find(|&i| !is_blank_row(&grid[i])) else {
        return Table {
            name: name.to_string(),
            headers: vec![String::new(); width],
            rows: Vec::new(),
        };
    };
    let rows = grid.split_off(header_row + 1);
    let mut headers: Vec<String> = grid[header_row].iter().map(header_text).collect();
    headers.resize(width, String::new());
    let rows = rows
        .into_iter()
        .filter(|r| !is_blank_row(r))
        .collect();
    Table {
        name: name.to_string(),
        headers,
        rows,
    }
}

fn read_csv_table(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<Cell> = record.iter().map(Cell::from).collect();
        if is_blank_row(&cells) {
            continue;
        }
        rows.push(cells);
    }
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(headers.len());
    headers.resize(width, String::new());
    Ok(Table {
        name: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        headers,
        rows,
    })
}

// ---------------------------------------------------------------------------
// AF master
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MasterCsvRow {
    #[serde(rename = "AFコード")]
    code: String,
    #[serde(rename = "媒体")]
    media: String,
    #[serde(rename = "分類")]
    category: String,
}

/// Load the ad-code master. A missing file is fatal for the whole run.
///
/// xlsx layout: first sheet, header on the second row, code/media/category in
/// columns B:D. csv layout: a header row naming AFコード, 媒体, 分類.
pub fn load_master(path: &Path) -> Result<MasterTable> {
    require_file(path)?;
    let records = if is_csv(path) {
        load_master_csv(path)?
    } else {
        load_master_workbook(path)?
    };
    tracing::info!(path = %path.display(), codes = records.len(), "loaded AF master");
    Ok(MasterTable::from_records(records))
}

fn load_master_csv(path: &Path) -> Result<Vec<AdCodeRecord>> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::Reader::from_reader(std::io::BufReader::new(file));
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let row: MasterCsvRow = result?;
        let code = row.code.trim();
        if code.is_empty() {
            continue;
        }
        records.push(AdCodeRecord {
            code: code.to_string(),
            media: row.media.trim().to_string(),
            category: row.category.trim().to_string(),
        });
    }
    Ok(records)
}

fn load_master_workbook(path: &Path) -> Result<Vec<AdCodeRecord>> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::EmptyWorkbook(path.to_path_buf()))?;
    let range = workbook.worksheet_range(&first)?;
    let table = grid_to_table(&first, sheet_grid(&range), 1);

    Ok(table
        .rows
        .iter()
        .filter_map(|row| {
            let code = cell_text(row, 1);
            if code.is_empty() {
                return None;
            }
            Some(AdCodeRecord {
                code,
                media: cell_text(row, 2),
                category: cell_text(row, 3),
            })
        })
        .collect())
}

// ---------------------------------------------------------------------------
// CV log
// ---------------------------------------------------------------------------

/// Load the conversion log: first column the date, one column per ad code.
pub fn load_conversion_log(path: &Path) -> Result<Table> {
    require_file(path)?;
    let table = if is_csv(path) {
        read_csv_table(path)?
    } else {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReportError::EmptyWorkbook(path.to_path_buf()))?;
        let range = workbook.worksheet_range(&first)?;
        grid_to_table(&first, sheet_grid(&range), 0)
    };
    tracing::info!(
        path = %path.display(),
        rows = table.rows.len(),
        codes = table.width().saturating_sub(1),
        "loaded CV log"
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Cost report
// ---------------------------------------------------------------------------

pub fn relevant_sheet_names(path: &Path) -> Result<Vec<String>> {
    require_file(path)?;
    let workbook = calamine::open_workbook_auto(path)?;
    Ok(workbook
        .sheet_names()
        .into_iter()
        .filter(|name| is_relevant_sheet(name))
        .collect())
}

/// Read every Listing / Display / affiliate sheet of a cost report.
pub fn load_cost_report(path: &Path) -> Result<CostWorkbook> {
    require_file(path)?;
    let mut workbook = calamine::open_workbook_auto(path)?;
    let names: Vec<String> = workbook
        .sheet_names()
        .into_iter()
        .filter(|name| is_relevant_sheet(name))
        .collect();

    let mut result = CostWorkbook::default();
    for name in names {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let table = grid_to_table(&name, sheet_grid(&range), 0);
                tracing::debug!(sheet = %name, rows = table.rows.len(), width = table.width(), "read cost sheet");
                result.sheets.push(table);
            }
            Err(e) => {
                tracing::warn!(sheet = %name, error = %e, "could not read cost sheet");
                result.failures.push(SheetFailure {
                    sheet: name,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(result)
}
