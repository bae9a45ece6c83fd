use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show the outcome
    Quiet,
    #[default]
    Normal,
    /// Show every error bucket with its samples
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Operator tool for submission validation reports
#[derive(Parser, Debug, Clone)]
#[command(name = "submission-validator")]
#[command(about = "Inspect submission validation reports and dictionary file matching")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[arg(long = "format", value_enum, global = true)]
    pub output_format: Option<OutputFormat>,

    #[arg(long = "log-format", value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Render a persisted validation report
    Inspect {
        /// Report document (JSON)
        report: PathBuf,

        /// Only show this submitted file
        #[arg(long = "file")]
        file: Option<String>,
    },

    /// Show how a submission directory maps onto a dictionary
    Classify {
        /// Dictionary document (JSON)
        dictionary: PathBuf,

        /// Directory holding the submitted files
        directory: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
