//! Buildmart CLI - operator and developer tools.
//!
//! # Usage
//!
//! ```bash
//! # Print the ranked order queue
//! bm-cli queue --file orders.json
//!
//! # Price a cart for yard pickup
//! bm-cli quote --file cart.json --mode pickup
//!
//! # Change an order's status or payment status
//! bm-cli order status --id 42 --to processing
//! bm-cli order payment --id 42 --to paid
//! ```
//!
//! # Commands
//!
//! - `queue` - Rank orders for triage
//! - `quote` - Price a cart under a fulfillment mode
//! - `order` - Apply whitelisted status changes via the API

#![cfg_attr(not(test), forbid(unsafe_code))]
// Command output goes to stdout, logs to stderr.
#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buildmart_core::{FulfillmentMode, OrderStatus, PaymentStatus};
use buildmart_storefront::StorefrontConfig;
use buildmart_storefront::config::ConfigError;

mod commands;

#[derive(Parser)]
#[command(name = "bm-cli")]
#[command(author, version, about = "Buildmart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print orders ranked for triage
    Queue {
        /// JSON file with an array of orders
        #[arg(short, long)]
        file: PathBuf,

        /// Rank as of this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<DateTime<Utc>>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Price a cart under a fulfillment mode
    Quote {
        /// JSON file shaped like the `GET /cart` response
        #[arg(short, long)]
        file: PathBuf,

        /// `delivery` or `pickup`
        #[arg(short, long, default_value = "delivery")]
        mode: FulfillmentMode,
    },
    /// Change an order through the remote API
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Set the order status
    Status {
        #[arg(long)]
        id: i64,

        /// `pending`, `processing`, `on_delivery`, `completed` or `canceled`
        #[arg(long)]
        to: OrderStatus,
    },
    /// Set the payment status
    Payment {
        #[arg(long)]
        id: i64,

        /// `pending`, `paid` or `failed`
        #[arg(long)]
        to: PaymentStatus,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn.filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Commands that never reach the API still run without a config
    let config = StorefrontConfig::from_env();

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(
        config
            .as_ref()
            .ok()
            .and_then(|config| config.sentry_dsn.as_deref()),
    );

    // Defaults to info for the buildmart crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "buildmart=info,bm_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: Result<StorefrontConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Queue { file, now, json } => commands::queue::run(&file, now, json)?,
        Commands::Quote { file, mode } => {
            let rules = commands::quote::rules(config)?;
            commands::quote::run(&file, mode, rules)?;
        }
        Commands::Order { action } => {
            let config = config.map_err(commands::CliError::from)?;
            match action {
                OrderAction::Status { id, to } => {
                    commands::order::set_status(&config, id, to).await?;
                }
                OrderAction::Payment { id, to } => {
                    commands::order::set_payment(&config, id, to).await?;
                }
            }
        }
    }
    Ok(())
}
