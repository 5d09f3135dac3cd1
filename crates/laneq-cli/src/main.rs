use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use laneq_core::{DelayedQueue, EnqueueOptions, LaneqConfig, QueueError};
use tracing::info;

const CONFIG_PATHS: &[&str] = &["laneq.toml", "/etc/laneq/laneq.toml"];
const REDIS_URL_ENV: &str = "LANEQ_REDIS_URL";

#[derive(Parser)]
#[command(name = "laneq", about = "Multi-lane delayed queue CLI")]
struct Cli {
    /// Path to a TOML config file (default: ./laneq.toml, then /etc/laneq/laneq.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Redis URL, overriding the config file and LANEQ_REDIS_URL
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Key prefix shared by every queue structure
    #[arg(long, global = true)]
    identifier: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a JSON payload in a lane
    Enqueue {
        /// Lane name
        lane: String,

        /// Payload as a JSON document
        payload: String,

        /// Relative delay, e.g. "30s", "5 minutes", "250" (ms)
        #[arg(long, conflicts_with = "at")]
        wait: Option<String>,

        /// Absolute due time in milliseconds since the Unix epoch
        #[arg(long)]
        at: Option<u64>,
    },

    /// Take the earliest due item from a lane
    Dequeue {
        /// Lane name
        lane: String,
    },

    /// Show the schedule of a lane
    Stats {
        /// Lane name
        lane: String,
    },

    /// Delete every key under the identifier prefix
    Clear,
}

/// Read the explicit config file, or the first default path that exists.
fn load_config(explicit: Option<&Path>) -> Result<LaneqConfig, QueueError> {
    if let Some(path) = explicit {
        let config = LaneqConfig::from_file(path)?;
        info!(path = %path.display(), "loaded configuration");
        return Ok(config);
    }

    for path in CONFIG_PATHS {
        if Path::new(path).exists() {
            let config = LaneqConfig::from_file(path)?;
            info!(path, "loaded configuration");
            return Ok(config);
        }
    }

    info!("no config file found, using defaults");
    Ok(LaneqConfig::default())
}

/// Apply overrides: environment first, then command-line flags.
fn apply_overrides(
    mut config: LaneqConfig,
    env_redis_url: Option<String>,
    cli: &Cli,
) -> Result<LaneqConfig, QueueError> {
    if let Some(url) = env_redis_url {
        config.redis.url = url;
    }
    if let Some(url) = &cli.redis_url {
        config.redis.url = url.clone();
    }
    if let Some(identifier) = &cli.identifier {
        config.queue.identifier = identifier.clone();
    }
    config.queue.validate()?;
    Ok(config)
}

fn exit_with(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {err}");
    process::exit(1);
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with(e),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

async fn cmd_enqueue(
    queue: &DelayedQueue,
    lane: String,
    payload: String,
    wait: Option<String>,
    at: Option<u64>,
) {
    let payload: serde_json::Value = match serde_json::from_str(&payload) {
        Ok(value) => value,
        Err(e) => exit_with(format!("payload is not valid JSON: {e}")),
    };
    let options = EnqueueOptions {
        wait,
        at: at.map(|ms| UNIX_EPOCH + Duration::from_millis(ms)),
    };

    match queue.enqueue(payload, &lane, options).await {
        Ok(item) => print_json(&item),
        Err(e) => exit_with(e),
    }
}

async fn cmd_dequeue(queue: &DelayedQueue, lane: String) {
    match queue.dequeue(&lane).await {
        Ok(Some(item)) => print_json(&item),
        Ok(None) => println!("No item due in lane \"{lane}\"."),
        Err(e) => exit_with(e),
    }
}

async fn cmd_stats(queue: &DelayedQueue, lane: String) {
    match queue.lane_stats(&lane).await {
        Ok(stats) => {
            println!("Lane: {lane}");
            println!("  Scheduled timestamps: {}", stats.scheduled_timestamps);
            match stats.next_due {
                Some(due) => {
                    let now = now_ms();
                    if due < now {
                        println!("  Next due:             {due} (due now)");
                    } else {
                        println!("  Next due:             {due} (in {} ms)", due - now);
                    }
                }
                None => println!("  Next due:             -"),
            }
        }
        Err(e) => exit_with(e),
    }
}

async fn cmd_clear(queue: &DelayedQueue) {
    match queue.clear().await {
        Ok(count) => println!(
            "Deleted {count} key{} under \"{}\"",
            if count == 1 { "" } else { "s" },
            queue.keys().identifier()
        ),
        Err(e) => exit_with(e),
    }
}

#[tokio::main]
async fn main() {
    laneq_core::telemetry::init_tracing("warn");

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())
        .and_then(|config| apply_overrides(config, std::env::var(REDIS_URL_ENV).ok(), &cli))
        .unwrap_or_else(|e| exit_with(e));

    let queue = DelayedQueue::open(&config).unwrap_or_else(|e| exit_with(e));
    if let Err(e) = queue.connect().await {
        exit_with(format!("cannot connect to {}: {e}", config.redis.url));
    }

    match cli.command {
        Commands::Enqueue {
            lane,
            payload,
            wait,
            at,
        } => cmd_enqueue(&queue, lane, payload, wait, at).await,
        Commands::Dequeue { lane } => cmd_dequeue(&queue, lane).await,
        Commands::Stats { lane } => cmd_stats(&queue, lane).await,
        Commands::Clear => cmd_clear(&queue).await,
    }

    if let Err(e) = queue.disconnect().await {
        exit_with(e);
    }
}
