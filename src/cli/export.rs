use std::path::PathBuf;

use crate::cli::report::format_issues;
use crate::cli::{run_report, InputArgs};
use crate::error::Result;
use crate::export::{default_filename, write_workbook, ExportOptions};
use crate::settings::load_settings;

fn default_path(filename: &str) -> PathBuf {
    load_settings().export_dir().join(filename)
}

pub fn run(input: &InputArgs, output: Option<PathBuf>, with_totals: bool) -> Result<()> {
    let report = run_report(input)?;
    let issues = format_issues(&report);
    if !issues.is_empty() {
        eprintln!("{issues}");
    }

    let path = output.unwrap_or_else(|| default_path(&default_filename(&report.range)));
    let options = ExportOptions {
        include_totals: with_totals,
    };
    let written = write_workbook(&report, options, &path)?;
    println!("Wrote {}", written.display());
    Ok(())
}
