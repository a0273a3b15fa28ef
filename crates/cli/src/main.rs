// dupguard CLI - duplicate detection and cleanup for tabular time series

mod consent;
mod exit_codes;
mod logging;
mod scan;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;
use scan::{InputArgs, OutputArgs};

#[derive(Parser)]
#[command(name = "dupguard")]
#[command(about = "Find and remove duplicate rows across a dataset and its auxiliary series")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only errors; no human summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect duplicates and report findings without changing anything
    #[command(after_help = "\
Examples:
  dupguard scan eurusd.csv
  dupguard scan eurusd.csv --aux M5=eurusd_M5.csv --aux H1=eurusd_H1.csv
  dupguard scan eurusd.csv --discover --json
  dupguard scan eurusd.csv --discover --fail-on-duplicates --fail-on-critical")]
    Scan {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Exit 3 when any duplicate row is found
        #[arg(long)]
        fail_on_duplicates: bool,

        /// Exit 4 when any timestamp column has invalid values
        #[arg(long)]
        fail_on_critical: bool,
    },

    /// Detect duplicates, confirm, and write cleaned copies of every dataset
    #[command(after_help = "\
Examples:
  dupguard fix eurusd.csv --discover
  dupguard fix eurusd.csv --aux M5=eurusd_M5.csv --yes --out-dir cleaned
  dupguard fix eurusd.csv --discover --yes --json > run.json")]
    Fix {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Output directory (overrides remediation.output_dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    #[command(after_help = "\
Examples:
  dupguard config > dupguard.toml
  dupguard config --config dupguard.toml")]
    Config {
        /// TOML config file to load and validate
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  dupguard-dedup ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  dupguard-dedup ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Scan {
            input,
            output,
            fail_on_duplicates,
            fail_on_critical,
        } => scan::cmd_scan(input, output, fail_on_duplicates, fail_on_critical, cli.quiet),
        Commands::Fix {
            input,
            output,
            yes,
            out_dir,
        } => scan::cmd_fix(input, output, yes, out_dir, cli.quiet),
        Commands::Config { config } => scan::cmd_config(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
