pub mod export;
pub mod init;
pub mod report;
pub mod sheets;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::error::{ReportError, Result};
use crate::filter::parse_date_str;
use crate::importer::{load_conversion_log, load_cost_report, load_master};
use crate::models::{DateRange, MasterTable};
use crate::reports::{assemble, default_range, Report, RunContext};
use crate::settings::load_settings;

#[derive(Parser)]
#[command(
    name = "cvcost",
    version,
    about = "Aggregate conversion logs and ad cost reports by day, channel and media."
)]
pub struct Cli {
    /// Log more (-v info, -vv debug). CVCOST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save the default AF master path and export directory.
    Init {
        /// AF master table (xlsx or csv)
        #[arg(long)]
        master: Option<String>,
        /// Directory for exported workbooks (default: ~/Documents/cvcost)
        #[arg(long = "export-dir")]
        export_dir: Option<String>,
    },
    /// Print conversion and cost summaries for a period.
    Report {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Write the summaries to an xlsx workbook.
    Export {
        #[command(flatten)]
        input: InputArgs,
        /// Output path (default: <export_dir>/申込件数配信費集計_<from>_<to>.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also write one label-totals sheet per cost sheet
        #[arg(long = "with-totals")]
        with_totals: bool,
    },
    /// List the Listing / Display / affiliate sheets of a cost report.
    Sheets {
        /// Cost report workbook
        #[arg(long)]
        cost: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// CV log (xlsx or csv): date column followed by one column per ad code
    #[arg(long)]
    pub cv: Option<PathBuf>,
    /// Cost report workbook
    #[arg(long)]
    pub cost: Option<PathBuf>,
    /// AF master table; defaults to the path saved by `cvcost init`
    #[arg(long)]
    pub master: Option<PathBuf>,
    /// First day of the period (YYYY-MM-DD or YYYYMMDD)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Last day of the period (YYYY-MM-DD or YYYYMMDD)
    #[arg(long = "to")]
    pub to_date: Option<String>,
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    parse_date_str(raw.trim()).ok_or_else(|| ReportError::InvalidDate(raw.to_string()))
}

fn resolve_master_path(arg: Option<&Path>) -> PathBuf {
    match arg {
        Some(path) => path.to_path_buf(),
        None => load_settings().master_path(),
    }
}

/// Load the inputs named on the command line and run the pipeline once.
///
/// The master is only read when a CV log is given; a missing master is fatal.
/// Omitted period bounds fall back to the CV log's date span.
pub(crate) fn run_report(input: &InputArgs) -> Result<Report> {
    if input.cv.is_none() && input.cost.is_none() {
        return Err(ReportError::Other(
            "nothing to do: pass --cv and/or --cost".into(),
        ));
    }

    let cv_log = input.cv.as_deref().map(load_conversion_log).transpose()?;
    let master = match cv_log {
        Some(_) => load_master(&resolve_master_path(input.master.as_deref()))?,
        None => MasterTable::default(),
    };
    if cv_log.is_some() && master.is_empty() {
        tracing::warn!("AF master has no codes; only affiliate prefixes will be classified");
    }
    let cost = input.cost.as_deref().map(load_cost_report).transpose()?;

    let today = chrono::Local::now().date_naive();
    let fallback = default_range(cv_log.as_ref(), today);
    let start = match input.from_date.as_deref() {
        Some(raw) => parse_date_arg(raw)?,
        None => fallback.start,
    };
    let end = match input.to_date.as_deref() {
        Some(raw) => parse_date_arg(raw)?,
        None => fallback.end,
    };
    tracing::info!(%start, %end, codes = master.len(), "running report");

    let ctx = RunContext::new(DateRange::new(start, end), &master);
    Ok(assemble(ctx, cv_log.as_ref(), cost.as_ref()))
}
