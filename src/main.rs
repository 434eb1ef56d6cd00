use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use symptom_match::catalog::hasher;
use symptom_match::config::Config;
use symptom_match::search::semantic::{self, Diagnoser};
use symptom_match::server::{self, AppState};

#[derive(Parser)]
#[command(name = "symptom-match", version, about = "Match symptoms to diseases by semantic similarity")]
struct Cli {
    /// Config file (default: ./symptom-match.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the disease table and embedding matrix
    #[arg(long, global = true, env = "SYMPTOM_MATCH_ARTIFACTS")]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[arg(long, env = "SYMPTOM_MATCH_HOST")]
        host: Option<String>,
        /// Port to bind
        #[arg(long, env = "SYMPTOM_MATCH_PORT")]
        port: Option<u16>,
    },
    /// Load the artifacts and encoder and report readiness
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank a single query from the command line
    Query {
        /// Symptom description
        text: String,
        /// Number of results
        #[arg(long)]
        top_k: Option<i64>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build the embedding matrix from the disease table
    Embed,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.artifacts {
        config.catalog.dir = dir;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let diagnoser = Diagnoser::from_config(&config);
            let state = AppState::new(diagnoser, &config);
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            runtime.block_on(server::serve(state, &config.server))
        }
        Commands::Status { json } => {
            let status = Diagnoser::from_config(&config).status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }
            println!("artifacts:   {}", config.catalog.dir.display());
            if status.ready {
                println!("state:       ready");
                println!("records:     {}", status.records);
                println!("dimensions:  {}", status.dimensions);
                println!("model:       {}", status.model.as_deref().unwrap_or("-"));
                println!(
                    "fingerprint: {}",
                    status.fingerprint.as_deref().map(hasher::short).unwrap_or("-")
                );
            } else {
                println!("state:       unavailable");
                println!("reason:      {}", status.reason.as_deref().unwrap_or("unknown"));
            }
            Ok(())
        }
        Commands::Query { text, top_k, json } => {
            let diagnoser = Diagnoser::from_config(&config);
            let top_k = symptom_match::search::resolve_top_k(top_k, config.effective_top_k());
            let results = diagnoser.find_top_diseases(&text, top_k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }
            if results.is_empty() {
                println!("No matches.");
            }
            for (i, r) in results.iter().enumerate() {
                let mut tags = Vec::new();
                if r.contagious {
                    tags.push("contagious");
                }
                if r.chronic {
                    tags.push("chronic");
                }
                let tags = if tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", tags.join(", "))
                };
                println!("{:>2}. {:.4}  {}{tags}", i + 1, r.similarity, r.name);
                println!("    symptoms:   {}", r.symptoms);
                println!("    treatments: {}", r.treatments);
            }
            Ok(())
        }
        Commands::Embed => {
            let embedder = semantic::connect_embedder(&config.embed.backend)?;
            let stats = semantic::embed_catalog(&config.catalog, embedder.as_ref())?;
            println!(
                "Embedded {} records ({} dimensions) into {}",
                stats.records,
                stats.dimensions,
                config.catalog.embeddings_path().display()
            );
            Ok(())
        }
    }
}
