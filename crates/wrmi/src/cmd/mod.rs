use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod info;
pub mod submit;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run program text through a compiler session and print the log.
    Submit(SubmitArgs),
    /// Start a compiler and print host/protocol information.
    Info(InfoArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Submit(args) => submit::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Program file to submit.
    #[arg(conflicts_with = "code")]
    pub file: Option<PathBuf>,
    /// Inline program text.
    #[arg(long, conflicts_with = "file")]
    pub code: Option<String>,
    /// Compiler executable.
    #[arg(long, default_value = "wpslinks")]
    pub program: PathBuf,
    /// Session options as name=value pairs.
    #[arg(long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,
    /// Compiler startup timeout (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub startup_timeout: String,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Compiler executable.
    #[arg(long, default_value = "wpslinks")]
    pub program: PathBuf,
    /// Compiler startup timeout (e.g. 30s, 500ms).
    #[arg(long, default_value = "30s")]
    pub startup_timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Compiler executable to look for.
    #[arg(long, default_value = "wpslinks")]
    pub program: PathBuf,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported timeout unit: {unit}"),
        )),
    }
}

/// Split `--option name=value` arguments into pairs.
pub fn parse_options(options: &[String]) -> CliResult<Vec<(String, String)>> {
    options
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| {
                    CliError::new(USAGE, format!("option '{raw}' is not in name=value form"))
                })
        })
        .collect()
}
