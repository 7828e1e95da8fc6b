use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use enrollwatch::application::{Notifier, WatcherRegistry};
use enrollwatch::infrastructure::{
    console_notifier::ConsoleNotifier, frontdesk_client::FrontDeskClient,
    multi_notifier::MultiNotifier, slack_notifier::SlackNotifier, sqlite_store::SqliteWatchStore,
};
use enrollwatch::interfaces::config::Config;
use enrollwatch::interfaces::http_api::{ApiState, build_router};
use enrollwatch::interfaces::queue::QueueConsumer;

#[derive(Parser, Debug)]
#[command(name = "enrollwatch")]
struct Args {
    /// Path to config.yaml (optional; env and defaults are used when missing)
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Do not send external notifications (console only)
    #[arg(long)]
    dry_run: bool,

    /// Also read queued watch requests as JSON lines from stdin
    #[arg(long)]
    queue_stdin: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("enrollwatch=info".parse().expect("static directive")),
        )
        .init();
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("watcher failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    // 1) load config
    let cfg = Config::load(&args.config)?;

    // 2) build infra
    let store = SqliteWatchStore::new(&cfg.database_url()).await?;
    let eligibility = FrontDeskClient::new(&cfg.frontdesk_url(), cfg.http_timeout())?;

    // notifiers fanout
    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(ConsoleNotifier::new())];
    if !args.dry_run {
        if let Some(hook) = cfg.slack_webhook() {
            notifiers.push(Box::new(SlackNotifier::new(
                hook,
                cfg.slack_channel(),
                cfg.http_timeout(),
            )?));
        }
    } else {
        tracing::warn!("--dry-run enabled: only console output");
    }

    // 3) registry, seeded from whatever is already watched
    let registry = Arc::new(WatcherRegistry::new(
        Arc::new(store),
        Arc::new(eligibility),
        Arc::new(MultiNotifier::new(notifiers)),
        cfg.poll_policy(),
    ));
    registry.restore().await?;

    // 4) front doors
    if args.queue_stdin {
        let consumer = QueueConsumer {
            registry: registry.clone(),
        };
        tokio::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            match consumer.consume(stdin).await {
                Ok(stats) => tracing::info!(
                    accepted = stats.accepted,
                    rejected = stats.rejected,
                    "queue input closed"
                ),
                Err(e) => tracing::error!("queue consumer failed: {e}"),
            }
        });
    }

    let app = build_router(ApiState {
        registry: registry.clone(),
        api_token: cfg.api_token.clone(),
    });
    let addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "watcher started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    registry.shutdown().await;
    Ok(())
}
