mod config;
mod fs_vault;
mod tools;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{Overrides, RedirectorConfig};
use fs_vault::FsVault;
use redirector_core::link_text::LinkFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redirector", about = "Rewrite internal links in a markdown vault to a canonical form")]
struct Cli {
    /// Vault root directory
    #[arg(long, env = "REDIRECTOR_VAULT", default_value = ".", global = true)]
    vault: PathBuf,

    /// Config file (defaults to <vault>/.redirector.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `links.format` from the config file
    #[arg(long, value_enum, global = true)]
    format: Option<FormatArg>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every link in the vault to its canonical text
    FormatLinks {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// List the links of one document with their resolution
    Links {
        /// Document path inside the vault
        path: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Shortest,
    Relative,
    Absolute,
}

impl From<FormatArg> for LinkFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Shortest => LinkFormat::Shortest,
            FormatArg::Relative => LinkFormat::Relative,
            FormatArg::Absolute => LinkFormat::Absolute,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = RedirectorConfig::load(&cli.vault, cli.config.as_deref())?.apply(&Overrides {
        format: cli.format.map(LinkFormat::from),
    });
    let vault = FsVault::open(&cli.vault, &config.vault)
        .with_context(|| format!("failed to open vault {}", cli.vault.display()))?;

    match cli.command {
        Commands::FormatLinks { dry_run } => {
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, stopping after the current document");
                    on_signal.cancel();
                }
            });
            tools::format_links::execute(Arc::new(vault), &config, dry_run, cli.json, cancel).await
        }
        Commands::Links { path } => tools::get_links::execute(&vault, &config.links, &path, cli.json).await,
    }
}
