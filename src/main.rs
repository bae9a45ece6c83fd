use std::path::Path;

use anyhow::{Context, Result};

use submission_validator::cli::{Cli, Command, OutputFormat};
use submission_validator::config::{Config, ConfigManager, OutputFormatConfig};
use submission_validator::dictionary::Dictionary;
use submission_validator::logging::{LogConfig, init_logging};
use submission_validator::output::Output;
use submission_validator::report::Report;
use submission_validator::store::FileSystemSubmissionDirectory;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;

    let log_config = LogConfig::from_level_name(&config.logging.level)
        .with_format(config.logging.format)
        .with_log_file(config.logging.file.clone());
    init_logging(&log_config).context("Failed to initialize logging")?;

    let output = Output::new(config.output.verbosity());
    let format = OutputFormat::from(config.output.format);

    match &cli.command {
        Command::Inspect { report, file } => {
            inspect(&output, format, report, file.as_deref()).await?
        }
        Command::Classify {
            dictionary,
            directory,
        } => classify(&output, format, dictionary, directory).await?,
        Command::Config => print_config(&config)?,
    }

    Ok(())
}

async fn inspect(
    output: &Output,
    format: OutputFormat,
    path: &Path,
    file: Option<&str>,
) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    let report: Report = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report {}", path.display()))?;

    match file {
        Some(file_name) => {
            let file_report = report
                .file_report(file_name)
                .with_context(|| format!("No file named '{}' in report", file_name))?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&file_report)?),
                OutputFormat::Human => print!("{}", output.format_file_report(&file_report)),
            }
        }
        None => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Human => print!("{}", output.format_report(&report)),
        },
    }
    Ok(())
}

async fn classify(
    output: &Output,
    format: OutputFormat,
    dictionary_path: &Path,
    directory: &Path,
) -> Result<()> {
    let dictionary = Dictionary::load(dictionary_path)
        .await
        .with_context(|| format!("Failed to load dictionary {}", dictionary_path.display()))?;

    let files = FileSystemSubmissionDirectory::list_dir(directory)
        .await
        .with_context(|| format!("Failed to list {}", directory.display()))?;

    let classification = dictionary.classify(&files)?;
    match format {
        OutputFormat::Json => {
            let document = serde_json::json!({
                "files": classification.files,
                "conflicts": classification.conflicts,
                "missing": classification.missing,
                "unmatched": classification.unmatched,
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Human => print!("{}", output.format_classification(&classification)),
    }

    if classification.is_malformed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_config(config: &Config) -> Result<()> {
    match config.output.format {
        OutputFormatConfig::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormatConfig::Human => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
