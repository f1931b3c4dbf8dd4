use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use roundup::application::ingest::{IngestWriter, IngestionService};
use roundup::application::processor::{ChangeProcessor, TransferExecutor};
use roundup::application::signature::{SignatureVerifier, sign};
use roundup::config::{EnvSecretSource, RoundUpConfig, load_webhook_secret};
use roundup::domain::ports::{ChangeLogBox, NotificationStoreBox, ProcessedLedgerBox};
use roundup::infrastructure::change_feed::{self, ChangePublisher};
use roundup::infrastructure::in_memory::{InMemoryLedger, InMemoryNotificationStore};
use roundup::interfaces::http::router;
use roundup::interfaces::starling::{DEFAULT_BASE_URL, StarlingClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Receive webhooks and round up card spending into the savings goal
    Serve(ServeArgs),
    /// Print the X-Hook-Signature value for a payload file, using STARLING_WEBHOOK_SECRET
    Sign {
        /// File holding the exact webhook body
        body: PathBuf,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Address the webhook endpoint listens on
    #[arg(long, env = "ROUNDUP_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "ROUNDUP_DB_PATH")]
    db_path: Option<PathBuf>,

    #[arg(long, env = "STARLING_API_URL", default_value = DEFAULT_BASE_URL)]
    api_base_url: String,

    /// Timeout for each savings goal transfer call
    #[arg(long, default_value_t = 5000)]
    api_timeout_ms: u64,

    /// Maximum change events handled per dispatch
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Process every delivered insert, even for keys that already reached the transfer step
    #[arg(long)]
    without_ledger: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Sign { body } => {
            let secret = load_webhook_secret(&EnvSecretSource)
                .await
                .into_diagnostic()?;
            let body = std::fs::read(body).into_diagnostic()?;
            println!("{}", sign(&secret, &body));
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = RoundUpConfig::load(&EnvSecretSource)
        .await
        .into_diagnostic()?;
    tracing::info!(goal = %config.savings_goal, "configuration loaded");

    let (publisher, subscriber) = change_feed::channel();
    let Stores {
        notifications,
        change_log,
        ledger,
    } = open_stores(args.db_path, publisher)?;

    let client = StarlingClient::new(
        args.api_base_url,
        config.access_token.clone(),
        Duration::from_millis(args.api_timeout_ms),
    );
    let mut processor = ChangeProcessor::new(TransferExecutor::new(
        Box::new(client),
        config.savings_goal.clone(),
    ))
    .with_change_log(change_log);
    if args.without_ledger {
        tracing::warn!("idempotency ledger disabled, redelivered inserts will transfer again");
    } else {
        processor = processor.with_ledger(ledger);
    }
    // Before the listener opens, so replayed and live events cannot interleave.
    processor.replay_pending().await;
    let batch_size = args.batch_size.max(1);
    let processing = tokio::spawn(async move { processor.run(subscriber, batch_size).await });

    let service = IngestionService::new(
        SignatureVerifier::new(config.webhook_secret.clone()),
        IngestWriter::new(notifications),
    );
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .into_diagnostic()?;
    tracing::info!(addr = %args.bind, "listening for webhooks");

    axum::serve(listener, router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    // The router owned the last publisher; the processor drains what is left and stops.
    processing.await.into_diagnostic()?;
    Ok(())
}

struct Stores {
    notifications: NotificationStoreBox,
    change_log: ChangeLogBox,
    ledger: ProcessedLedgerBox,
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>, feed: ChangePublisher) -> Result<Stores> {
    use roundup::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "using RocksDB storage");
            let store = RocksDBStore::open(path, feed).into_diagnostic()?;
            Ok(Stores {
                notifications: Box::new(store.clone()),
                change_log: Box::new(store.clone()),
                ledger: Box::new(store),
            })
        }
        None => Ok(in_memory_stores(feed)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>, feed: ChangePublisher) -> Result<Stores> {
    if let Some(path) = db_path {
        tracing::warn!(
            path = %path.display(),
            "built without the storage-rocksdb feature, falling back to in-memory storage"
        );
    }
    Ok(in_memory_stores(feed))
}

fn in_memory_stores(feed: ChangePublisher) -> Stores {
    let store = InMemoryNotificationStore::new(feed);
    Stores {
        notifications: Box::new(store.clone()),
        change_log: Box::new(store),
        ledger: Box::new(InMemoryLedger::new()),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
