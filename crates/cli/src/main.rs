mod bridge;
mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    vocebot_config::{BridgeConfig, Severity},
};

#[derive(Parser)]
#[command(name = "vocebot", about = "VoceChat bot bridge for OneBot 12", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Overrides `log.level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, short, global = true, env = "VOCEBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bridge (default when no subcommand is provided).
    Serve,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli, config: &BridgeConfig) {
    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs || config.log.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();

    match cli.command.take() {
        None | Some(Commands::Serve) => {
            // Resolve config first so `log.level` can drive the subscriber.
            let config = config_commands::resolve(cli.config.as_deref())?;
            init_telemetry(&cli, &config);
            info!(version = env!("CARGO_PKG_VERSION"), "vocebot starting");

            let diagnostics = config.validate();
            for d in &diagnostics {
                match d.severity {
                    Severity::Error => error!(path = %d.path, "{}", d.message),
                    Severity::Warning => warn!(path = %d.path, "{}", d.message),
                }
            }
            let errors = diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Error)
                .count();
            if errors > 0 {
                anyhow::bail!("invalid configuration: {errors} error(s)");
            }

            bridge::serve(config).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}
