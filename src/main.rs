use chrono::Duration;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thingstodo::application::Services;
use thingstodo::application::ads::AdService;
use thingstodo::application::catalog::{ActivityFilter, CatalogService};
use thingstodo::application::messages::MessageService;
use thingstodo::application::session::SessionResolver;
use thingstodo::config::{self, Config, DEFAULT_PORT, DEFAULT_WEBHOOK_TOLERANCE_SECS};
use thingstodo::domain::UserId;
use thingstodo::domain::ports::{PaymentGatewayRef, Repositories};
use thingstodo::domain::profile::Profile;
use thingstodo::error::AppError;
use thingstodo::infrastructure::in_memory::InMemoryStore;
use thingstodo::infrastructure::payment_gateway::{HttpPaymentGateway, SimulatedGateway};
#[cfg(feature = "storage-rocksdb")]
use thingstodo::infrastructure::rocksdb::RocksDBStore;
use thingstodo::interfaces::csv::activity_reader::ActivityReader;
use thingstodo::interfaces::csv::ad_report_writer::AdReportWriter;
use thingstodo::interfaces::http;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "THINGS_DB_PATH")]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "THINGS_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(long, env = "THINGS_SESSION_SECRET", hide_env_values = true)]
        session_secret: String,

        #[arg(long, env = "THINGS_WEBHOOK_SECRET", hide_env_values = true)]
        webhook_secret: String,

        /// Intent-creation endpoint. Without it payments are simulated.
        #[arg(long, env = "THINGS_PAYMENT_ENDPOINT")]
        payment_endpoint: Option<String>,

        /// Accept the x-demo-mode header as a stand-in identity
        #[arg(long, env = "THINGS_DEMO_MODE")]
        demo_mode: bool,

        #[arg(long, env = "THINGS_WEBHOOK_TOLERANCE_SECS", default_value_t = DEFAULT_WEBHOOK_TOLERANCE_SECS)]
        webhook_tolerance_secs: u64,
    },
    /// Load the canonical activity list from a CSV file
    ImportActivities {
        /// CSV with columns title,description,category,tags,location
        input: PathBuf,
    },
    /// Write supplier ad performance as CSV to stdout
    AdReport,
    /// Print a session token for a user, optionally granting roles
    IssueToken {
        user_id: UserId,

        #[arg(long, env = "THINGS_SESSION_SECRET", hide_env_values = true)]
        session_secret: String,

        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,

        #[arg(long)]
        moderator: bool,

        #[arg(long)]
        admin: bool,

        #[arg(long)]
        supplier: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let repos = open_repositories(cli.db_path)?;

    match cli.command {
        Command::Serve {
            port,
            session_secret,
            webhook_secret,
            payment_endpoint,
            demo_mode,
            webhook_tolerance_secs,
        } => {
            let config = Config::new(
                port,
                session_secret,
                webhook_secret,
                payment_endpoint,
                demo_mode,
                webhook_tolerance_secs,
            )
            .into_diagnostic()?;

            let gateway: PaymentGatewayRef = match &config.payment_endpoint {
                Some(endpoint) => {
                    Arc::new(HttpPaymentGateway::new(endpoint.clone(), config.payment_timeout).into_diagnostic()?)
                }
                None => {
                    info!("no payment endpoint configured, using simulated payments");
                    Arc::new(SimulatedGateway::new())
                }
            };
            let services = Services::new(repos, gateway, config.session_secret.clone(), config.demo_mode);
            http::serve(&config, services).await.into_diagnostic()?;
        }
        Command::ImportActivities { input } => {
            let catalog = CatalogService::new(repos.activities, MessageService::new(repos.messages));

            let file = File::open(input).into_diagnostic()?;
            let mut imported = 0;
            for draft in ActivityReader::new(file).activities() {
                match draft {
                    Ok(draft) => match catalog.import(draft).await {
                        Ok(_) => imported += 1,
                        Err(e) => eprintln!("Error importing activity: {}", e),
                    },
                    Err(e) => eprintln!("Error reading activity: {}", e),
                }
            }

            let total = catalog.list(&ActivityFilter::default()).await.into_diagnostic()?.len();
            println!("Imported {imported} activities, catalog has {total}");
        }
        Command::AdReport => {
            let catalog = CatalogService::new(repos.activities, MessageService::new(repos.messages));
            let rows = AdService::new(repos.ads, catalog).performance().await.into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = AdReportWriter::new(stdout.lock());
            writer.write_rows(&rows).into_diagnostic()?;
        }
        Command::IssueToken {
            user_id,
            session_secret,
            ttl_hours,
            moderator,
            admin,
            supplier,
        } => {
            config::check_secret("session secret", &session_secret).into_diagnostic()?;
            let ttl = Duration::try_hours(ttl_hours)
                .filter(|ttl| *ttl > Duration::zero())
                .ok_or_else(|| AppError::validation(format!("--ttl-hours must be positive, got {ttl_hours}")))
                .into_diagnostic()?;

            let mut profile = repos
                .profiles
                .get(user_id)
                .await
                .into_diagnostic()?
                .unwrap_or_else(|| Profile::new(user_id));
            profile.is_moderator |= moderator;
            profile.is_admin |= admin;
            profile.is_supplier |= supplier;
            repos.profiles.store(profile).await.into_diagnostic()?;

            let resolver = SessionResolver::new(repos.profiles, session_secret, false);
            let token = resolver
                .issue_token(user_id, ttl)
                .into_diagnostic()?;
            println!("{token}");
        }
    }

    Ok(())
}

fn open_repositories(db_path: Option<PathBuf>) -> Result<Repositories> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Repositories::from_backend(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Repositories::from_backend(InMemoryStore::new()))
        }
        None => Ok(Repositories::from_backend(InMemoryStore::new())),
    }
}
