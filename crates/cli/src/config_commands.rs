use std::path::{Path, PathBuf};

use {
    anyhow::Result,
    clap::Subcommand,
    vocebot_config::{BridgeConfig, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the resolved configuration and report errors/warnings.
    Check,
    /// Write a documented default config file.
    Init {
        /// Destination (defaults to ./vocebot.toml).
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

pub fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check => check(config_path),
        ConfigAction::Init { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from("vocebot.toml"));
            vocebot_config::write_default_config(&path)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        },
    }
}

/// Load the config file (explicit path, or discovered), then apply the
/// legacy environment overrides.
pub fn resolve(config_path: Option<&Path>) -> Result<BridgeConfig> {
    let mut config = match config_path {
        Some(path) => vocebot_config::load_config(path)?,
        None => vocebot_config::discover_and_load(),
    };
    vocebot_config::apply_env_overrides(&mut config)?;
    Ok(config)
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>) -> Result<()> {
    let config = resolve(config_path)?;
    let diagnostics = config.validate();

    for d in &diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let count = |severity: Severity| {
        diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("\n{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
