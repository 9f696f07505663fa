use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trip_settlement::application::router::VerificationRouter;
use trip_settlement::config::{DEFAULT_PICKUP_WINDOW_HOURS, SettlementConfig};
use trip_settlement::domain::ports::{NotifierHandle, PaymentGatewayHandle, SettlementStoreHandle};
use trip_settlement::infrastructure::in_memory::InMemoryStore;
use trip_settlement::infrastructure::log_notifier::LogNotifier;
#[cfg(feature = "storage-rocksdb")]
use trip_settlement::infrastructure::rocksdb::RocksDBStore;
use trip_settlement::infrastructure::simulated_gateway::SimulatedGateway;
use trip_settlement::interfaces::csv::booking_writer::BookingWriter;
use trip_settlement::interfaces::json::request_reader::RequestReader;
use trip_settlement::interfaces::json::seed::Seed;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Seed JSON file with bookings, trip charges and disputes
    seed: PathBuf,

    /// Admin action requests, one JSON object per line
    requests: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Upper bound on a single payment gateway call, in milliseconds
    #[arg(long, env = "SETTLEMENT_GATEWAY_TIMEOUT_MS", default_value_t = 10_000)]
    gateway_timeout_ms: u64,

    /// Upper bound on delivering a single guest notice, in milliseconds
    #[arg(long, env = "SETTLEMENT_NOTIFY_TIMEOUT_MS", default_value_t = 5_000)]
    notify_timeout_ms: u64,

    /// Length of the pickup window opened on approval, in hours
    #[arg(long, env = "SETTLEMENT_PICKUP_WINDOW_HOURS", default_value_t = DEFAULT_PICKUP_WINDOW_HOURS)]
    pickup_window_hours: u32,
}

fn open_store(db_path: Option<PathBuf>) -> Result<SettlementStoreHandle> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }

    Ok(Arc::new(InMemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trip_settlement=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = SettlementConfig::default()
        .with_gateway_timeout(Duration::from_millis(cli.gateway_timeout_ms))
        .with_notify_timeout(Duration::from_millis(cli.notify_timeout_ms))
        .with_pickup_window_hours(cli.pickup_window_hours);

    let store = open_store(cli.db_path)?;
    let gateway: PaymentGatewayHandle = Arc::new(SimulatedGateway::new());
    let notifier: NotifierHandle = Arc::new(LogNotifier);

    let seed = Seed::from_reader(File::open(cli.seed).into_diagnostic()?).into_diagnostic()?;
    let report = seed.load_into(store.as_ref()).await.into_diagnostic()?;
    info!(loaded = report.loaded, skipped = report.skipped, "seed applied");

    let router = VerificationRouter::new(store.clone(), gateway, notifier, config);

    let file = File::open(cli.requests).into_diagnostic()?;
    let reader = RequestReader::new(file);
    for request in reader.requests() {
        match request {
            Ok(request) => match router.handle(request).await {
                Ok(response) => {
                    info!(
                        booking = %response.booking.id,
                        success = response.success,
                        "{}",
                        response.message
                    );
                }
                Err(e) => {
                    eprintln!("Error processing request: {}", e);
                }
            },
            Err(e) => {
                eprintln!("Error reading request: {}", e);
            }
        }
    }

    // Final booking state
    let bookings = store.all_bookings().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BookingWriter::new(stdout.lock());
    writer.write_bookings(bookings).into_diagnostic()?;

    Ok(())
}
