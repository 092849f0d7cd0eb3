use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pd_core::{Controller, ExitChoice, HostConfig, NormalizeFn, PathRepository, PathStore};
use pd_fs::{load_config, parse_env_entries, read_env_var, FsDirectories, PathedConfig, ProfileFile};
use pd_utils::{default_separator, normalize_exact, normalize_folded, parse_separator};

const USAGE: &str = "\
Examples:
  bash/zsh:     export PATH=\"$(pathed)\"
  PowerShell:   $env:PATH = (pathed)
  profile:      pathed --profile ~/.config/pathed/profile.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "pathed",
    version,
    about = "Interactive PATH editor",
    after_help = USAGE
)]
struct Cli {
    /// Edit the system and user lists of a YAML profile instead of the environment.
    #[arg(long, value_name = "FILE")]
    profile: Option<PathBuf>,
    /// Separator placed between entries.
    #[arg(long, value_name = "CHAR", value_parser = separator_arg)]
    separator: Option<char>,
    /// Environment variable to edit.
    #[arg(long, value_name = "NAME", default_value = "PATH")]
    var: String,
    /// Write logs to this file.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn separator_arg(value: &str) -> std::result::Result<char, String> {
    parse_separator(value).map_err(|err| err.to_string())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config().context("failed to load config")?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.log_file.as_ref().map(PathBuf::from));
    let _guard = init_logging(log_file.as_deref(), config.log_level.as_deref())?;

    let dirs = FsDirectories;
    match &cli.profile {
        Some(path) => run_profile(&cli, &config, ProfileFile::new(path.clone()), &dirs),
        None => run_env(&cli, &config, &dirs),
    }
}

fn run_env(cli: &Cli, config: &PathedConfig, dirs: &FsDirectories) -> Result<()> {
    let host = host_config(cli, config, None);
    let separator = host.separator;
    let original = read_env_var(&cli.var);
    let entries = parse_env_entries(&original, separator, dirs);
    info!(var = %cli.var, count = entries.len(), "loaded environment entries");

    let (store, choice) = pd_tui::run(Controller::new(entries, host, 80, 24), dirs)?;
    println!("{}", env_output(&store, choice, &original, separator));
    Ok(())
}

fn run_profile(
    cli: &Cli,
    config: &PathedConfig,
    profile: ProfileFile,
    dirs: &FsDirectories,
) -> Result<()> {
    let entries = profile
        .load(dirs)
        .with_context(|| format!("failed to load profile {}", profile.path().display()))?;
    info!(path = %profile.path().display(), count = entries.len(), "loaded profile entries");

    let host = host_config(cli, config, Some(&profile));
    let (store, choice) = pd_tui::run(Controller::new(entries, host, 80, 24), dirs)?;
    if choice == ExitChoice::Save {
        profile
            .persist(&store)
            .with_context(|| format!("failed to persist {}", profile.path().display()))?;
    }
    Ok(())
}

fn host_config(cli: &Cli, config: &PathedConfig, profile: Option<&ProfileFile>) -> HostConfig {
    let warning = profile.filter(|profile| !profile.is_writable()).map(|profile| {
        format!(
            "{} is read-only - changes cannot be persisted",
            profile.path().display()
        )
    });
    HostConfig {
        sectioned: profile.is_some(),
        separator: cli.separator.unwrap_or_else(default_separator),
        normalize: normalizer(config.case_sensitive),
        warning,
        add_start: config.add_start.clone(),
    }
}

fn normalizer(case_sensitive: Option<bool>) -> NormalizeFn {
    if case_sensitive.unwrap_or(!cfg!(windows)) {
        normalize_exact
    } else {
        normalize_folded
    }
}

/// The value printed for the shell: the edited list, or the untouched input.
fn env_output(store: &PathStore, choice: ExitChoice, original: &str, separator: char) -> String {
    match choice {
        ExitChoice::Save => store.build_output_string(separator),
        ExitChoice::Discard => original.to_string(),
    }
}

/// Send logs to `log_file` when one is configured. The terminal owns stderr
/// and stdout carries the result, so there is no console output.
fn init_logging(log_file: Option<&Path>, level: Option<&str>) -> Result<Option<WorkerGuard>> {
    let Some(path) = log_file else {
        return Ok(None);
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_env("PATHED_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))?;
    Ok(Some(guard))
}
