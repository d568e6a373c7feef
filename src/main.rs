mod api;
mod gateway;
mod jobs;

use clap::{Parser, Subcommand};
use gateway::Gateway;
use leadgate_channels::telegram::send::TelegramClient;
use leadgate_channels::whatsapp::send::WahaClient;
use leadgate_core::{config, templates::ReplyTemplates};
use leadgate_kv::{Kv, MemoryKv, RedisKv};
use leadgate_store::{Store, QUEUE_OPERATOR_NOTIFY, QUEUE_SPREADSHEET_SYNC};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "leadgate",
    version,
    about = "Lead-qualification inbound message core"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server and job runner.
    Serve,
    /// Check config, store, and KV reachability.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve => serve(&cli.config).await,
        Commands::Status => status(&cli.config).await,
    }
}

async fn serve(config_path: &str) -> anyhow::Result<()> {
    let cfg = config::load(config_path)?;

    let store = Store::new(&cfg.store).await?;
    let kv = build_kv(&cfg).await?;
    let templates = ReplyTemplates::load(&cfg.app.data_dir);

    let waha = cfg
        .channel
        .whatsapp
        .as_ref()
        .filter(|c| c.enabled)
        .map(|c| WahaClient::new(c.clone()));
    let telegram = cfg
        .channel
        .telegram
        .as_ref()
        .filter(|c| c.enabled)
        .map(TelegramClient::new);
    if waha.is_none() && telegram.is_none() {
        warn!("no transport enabled; webhooks will be accepted but nothing can reply");
    }

    let gateway = Arc::new(Gateway::new(&cfg, store.clone(), kv, templates));

    // Outbox runner drains spreadsheet-sync and operator-notify.
    let runner = jobs::JobRunner::new(store, cfg.jobs.clone(), telegram.clone());
    tokio::spawn(runner.run());

    info!(
        "{} starting | transports: {}{} | kv: {}",
        cfg.app.name,
        if waha.is_some() { "whatsapp " } else { "" },
        if telegram.is_some() { "telegram" } else { "" },
        cfg.kv.backend,
    );

    let state = api::ApiState {
        gateway,
        waha,
        telegram,
        uptime: Instant::now(),
    };
    api::serve(&cfg.server, state).await
}

async fn status(config_path: &str) -> anyhow::Result<()> {
    let cfg = config::load(config_path)?;
    println!("leadgate — status check\n");
    println!("Config: {config_path}");
    println!("KV backend: {}", cfg.kv.backend);

    match Store::new(&cfg.store).await {
        Ok(store) => {
            let spreadsheet = store.pending_job_count(QUEUE_SPREADSHEET_SYNC).await?;
            let notify = store.pending_job_count(QUEUE_OPERATOR_NOTIFY).await?;
            println!("Store: ok ({})", cfg.store.db_path);
            println!("  pending spreadsheet-sync jobs: {spreadsheet}");
            println!("  pending operator-notify jobs: {notify}");
        }
        Err(e) => println!("Store: UNAVAILABLE ({e})"),
    }

    match build_kv(&cfg).await {
        Ok(_) => println!("KV: ok ({})", cfg.kv.backend),
        Err(e) => println!("KV: UNAVAILABLE ({e})"),
    }

    Ok(())
}

async fn build_kv(cfg: &config::Config) -> anyhow::Result<Arc<dyn Kv>> {
    match cfg.kv.backend.as_str() {
        "redis" => Ok(Arc::new(RedisKv::connect(&cfg.kv.redis_url).await?)),
        "memory" => Ok(Arc::new(MemoryKv::new())),
        other => anyhow::bail!("unsupported kv backend: {other}"),
    }
}
