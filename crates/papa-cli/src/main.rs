mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use papa_core::{LogFormat, LoggingConfig, PapaConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "papa", version, about = "MCP server for questions about event data")]
struct Cli {
    /// Path to the configuration file. Missing files fall back to defaults.
    #[arg(short, long, global = true, default_value = "papa.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server over HTTP and SSE.
    Serve {
        /// Bind host (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides server.port and $PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Require a bearer token on /sse and /message
        #[arg(long, default_value_t = false)]
        require_auth: bool,
    },

    /// Print the tool descriptors advertised to clients.
    Tools,

    /// Run the SQL guard against a statement without executing it.
    CheckSql {
        sql: String,

        /// Only require that the SQL parses
        #[arg(long, default_value_t = false)]
        permissive: bool,
    },

    /// Print the effective configuration with secrets masked.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;

    if let Command::Serve {
        host,
        port,
        require_auth,
    } = &cli.cmd
    {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
        if *require_auth {
            config.server.require_auth = true;
        }
    }

    init_tracing(&config.logging);

    match cli.cmd {
        Command::Serve { .. } => commands::serve::run(config).await?,
        Command::Tools => commands::tools::print()?,
        Command::CheckSql { sql, permissive } => {
            commands::check_sql::run(&config.guard, &sql, permissive)?
        }
        Command::Config => commands::config::print(&config)?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<PapaConfig> {
    PapaConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {:?}", path))
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output on stdout stays clean.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
