// mblock - meta-blocking experiments for two-collection entity resolution

mod exit_codes;
mod experiment;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "mblock")]
#[command(about = "Meta-blocking for entity resolution between two record collections")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an experiment from a TOML config file
    #[command(after_help = "\
Examples:
  mblock run amazon-google.mblock.toml
  mblock run amazon-google.mblock.toml --json
  mblock run amazon-google.mblock.toml --output result.json -v")]
    Run {
        /// Path to the .mblock.toml config file
        config: PathBuf,

        /// Output JSON to stdout in addition to the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate an experiment config without running it
    #[command(after_help = "\
Examples:
  mblock validate amazon-google.mblock.toml")]
    Validate {
        /// Path to the .mblock.toml config file
        config: PathBuf,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("MBLOCK_GIT_HASH"), ")",
        "\nengine:  metablock-engine ", env!("CARGO_PKG_VERSION"),
        "\nbuild:   ", env!("MBLOCK_PROFILE"),
        "\ntarget:  ", env!("MBLOCK_TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            eprintln!("Usage: mblock <command> [options]");
            eprintln!("       mblock --help for more information");
            Err(CliError { code: EXIT_USAGE, message: String::new(), hint: None })
        }
        Some(Commands::Run { config, json, output }) => experiment::cmd_run(config, json, output),
        Some(Commands::Validate { config }) => experiment::cmd_validate(config),
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
