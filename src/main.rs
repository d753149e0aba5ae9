use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inhouse_stats::api::routes::stats::presented;
use inhouse_stats::api::state::AppState;
use inhouse_stats::calculate::{
    aggregate, compute_map_stats, evaluate_achievements, last_n, ACHIEVEMENTS,
};
use inhouse_stats::config::AppConfig;
use inhouse_stats::fetch::{build_client, sync_matches, HttpMatchSource};
use inhouse_stats::parse_duration;
use inhouse_stats::storage::{JsonlReader, StorageConfig};
use inhouse_stats::MatchRecord;

#[derive(Parser)]
#[command(name = "inhouse-stats")]
#[command(about = "CS2 inhouse league stats, queue and accounts service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (overrides config; RUST_LOG wins over both)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port number (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Compute a player's aggregate from a JSONL file of match records
    Stats {
        /// JSONL file with one match record per line
        #[arg(long)]
        file: PathBuf,

        /// Player nickname (case-insensitive)
        #[arg(long)]
        nickname: String,

        /// Only the N most recent matches
        #[arg(long)]
        last: Option<usize>,
    },

    /// Copy match records from the HTTP source into the data directory
    SyncMatches {
        /// Keep running, syncing every --interval
        #[arg(long)]
        watch: bool,

        /// Sync interval (e.g., "30m", "1h")
        #[arg(long, default_value = "30m")]
        interval: String,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(Some(&cli.config))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting inhouse-stats v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let state = AppState::from_config(config)?;
            tracing::info!(
                "Match source: {}, data dir: {}",
                state.match_source.name(),
                state.storage.data_dir.display()
            );

            let app = inhouse_stats::api::build_router(state);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Stats {
            file,
            nickname,
            last,
        } => {
            let records = JsonlReader::<MatchRecord>::new(file.clone())
                .read_existing()
                .with_context(|| format!("reading {}", file.display()))?;
            let mut matches: Vec<MatchRecord> = records
                .into_iter()
                .filter(|m| m.is_player(&nickname))
                .collect();
            if let Some(n) = last {
                matches = last_n(&matches, n);
            }

            let Some(agg) = aggregate(&matches) else {
                println!("No matches for {}", nickname);
                return Ok(());
            };
            let achievements: Vec<String> = evaluate_achievements(&agg, ACHIEVEMENTS)
                .into_iter()
                .collect();

            let report = serde_json::json!({
                "nickname": nickname,
                "aggregate": presented(agg),
                "maps": compute_map_stats(&matches),
                "achievements": achievements,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::SyncMatches {
            watch,
            interval: interval_str,
        } => {
            let Some(url) = config.matches.url.clone() else {
                bail!("matches.url must be set to sync from an HTTP source");
            };
            let client = build_client(&config.upstream)?;
            let source = HttpMatchSource::new(client, &url)?;
            let storage = StorageConfig::new(config.data_dir.clone());

            if !watch {
                let written = sync_matches(&source, &storage).await?;
                println!("Synced {} match records from {}", written, url);
                return Ok(());
            }

            let Some(every) = parse_duration(&interval_str) else {
                bail!("Invalid --interval: {}", interval_str);
            };
            tracing::info!("Running periodic sync (interval: {})...", interval_str);
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = sync_matches(&source, &storage).await {
                            tracing::error!("Sync failed: {}", e);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Stopping periodic sync");
                        break;
                    }
                }
            }
        }
        Commands::Config => {
            print!("{}", config.to_redacted_toml()?);
        }
    }

    Ok(())
}
