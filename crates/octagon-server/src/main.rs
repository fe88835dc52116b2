//! Octagon server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `OCTAGON_*` environment variables, opens the SQLite store, and either
//! serves the HTTP API or runs a single pipeline operation and prints JSON.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use octagon_pipeline::Refresh;
use octagon_server::ServerConfig;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Octagon fight analysis server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Resolve the next event through the fallback chain and print it.
  NextEvent,
  /// Load one fighter and print the merged profile.
  Fighter {
    name:    String,
    /// Refetch every source even if cached.
    #[arg(long)]
    refresh: bool,
  },
  /// Analyse an event (the next one by default) and print the result.
  Analyze {
    #[arg(long)]
    event: Option<Uuid>,
  },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = ServerConfig::load(&cli.config).context("failed to load configuration")?;
  let pipeline = octagon_server::open_pipeline(&config)
    .await
    .context("failed to start pipeline")?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => {
      let app = octagon_server::app(pipeline);
      let address = config.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::NextEvent => print_json(&pipeline.load_next_event().await?)?,
    Command::Fighter { name, refresh } => {
      print_json(&pipeline.load_fighter(&name, Refresh::from_flag(refresh)).await?)?
    }
    Command::Analyze { event } => {
      let result = match event {
        Some(id) => pipeline.analyze_event_id(id).await?,
        None => pipeline.analyze_next_event().await?,
      };
      print_json(&result)?
    }
  }

  Ok(())
}
