mod aggregate;
mod classifier;
mod cli;
mod columns;
mod error;
mod export;
mod filter;
mod fmt;
mod importer;
mod models;
mod pivot;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};

/// `CVCOST_LOG` wins; otherwise `-v` / `-vv` raise the default `warn` level.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_env("CVCOST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("cvcost={default_level}")));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { master, export_dir } => {
            cli::init::run(master.as_deref(), export_dir.as_deref())
        }
        Commands::Report { input } => cli::report::run(&input),
        Commands::Export {
            input,
            output,
            with_totals,
        } => cli::export::run(&input, output, with_totals),
        Commands::Sheets { cost } => cli::sheets::run(&cost),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
