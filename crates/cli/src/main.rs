//! Concreto CLI - migrations, seeding, and FIFO costing operations.
//!
//! # Usage
//!
//! ```bash
//! # Apply the inventory schema
//! concreto migrate
//!
//! # Load plants, materials, prices, lots and remisions from YAML
//! concreto seed crates/cli/fixtures/fifo_demo.yaml
//!
//! # Allocate a remision's material usage against FIFO lots
//! concreto confirm --remision 1 --actor 7
//!
//! # Value remaining stock of a material at a plant
//! concreto valuation --material 1 --plant 1 --json
//!
//! # Read back FIFO costs
//! concreto cost line 3
//! concreto cost remision 1
//!
//! # List lots of a material at a plant
//! concreto entries --material 1 --plant 1 --all
//! ```
//!
//! Configuration comes from the environment; see `concreto_costing::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concreto_core::{MaterialId, PlantId, RemisionId, RemisionLineId, UserId};
use concreto_costing::{CostingConfig, CostingState};

mod commands;

#[derive(Parser)]
#[command(name = "concreto")]
#[command(author, version, about = "Concreto FIFO costing tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from a YAML file
    Seed {
        /// Path to the seed file
        file: String,
    },
    /// Confirm a remision (allocate its material usage FIFO)
    Confirm {
        /// Remision ID
        #[arg(short, long)]
        remision: i32,

        /// ID of the user confirming
        #[arg(short, long)]
        actor: i32,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Value remaining stock of a material at a plant
    Valuation {
        #[arg(short, long)]
        material: i32,

        #[arg(short, long)]
        plant: i32,

        /// Print the valuation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show FIFO cost from the allocation ledger
    Cost {
        #[command(subcommand)]
        target: CostTarget,

        /// Print the report as JSON
        #[arg(long, global = true)]
        json: bool,
    },
    /// List receiving lots of a material at a plant
    Entries {
        #[arg(short, long)]
        material: i32,

        #[arg(short, long)]
        plant: i32,

        /// Include depleted lots
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum CostTarget {
    /// Cost of one remision line
    Line {
        /// Remision line ID
        id: i32,
    },
    /// Cost of every line of a remision
    Remision {
        /// Remision ID
        id: i32,
    },
}

/// Initialize Sentry error tracking if `SENTRY_DSN` is configured.
fn init_sentry(config: &CostingConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Map tracing levels to Sentry: errors and warnings become events,
/// info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "concreto_costing=info,concreto_cli=info".into());

    // JSON for log shipping, text for terminals
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = CostingConfig::from_env();
    let sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CostingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = CostingState::connect(config).await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&state).await?,
        Commands::Seed { file } => commands::seed::run(&state, &file).await?,
        Commands::Confirm {
            remision,
            actor,
            json,
        } => {
            commands::confirm::run(&state, RemisionId::new(remision), UserId::new(actor), json)
                .await?;
        }
        Commands::Valuation {
            material,
            plant,
            json,
        } => {
            commands::valuation::run(&state, MaterialId::new(material), PlantId::new(plant), json)
                .await?;
        }
        Commands::Cost { target, json } => match target {
            CostTarget::Line { id } => {
                commands::cost::line(&state, RemisionLineId::new(id), json).await?;
            }
            CostTarget::Remision { id } => {
                commands::cost::remision(&state, RemisionId::new(id), json).await?;
            }
        },
        Commands::Entries {
            material,
            plant,
            all,
        } => {
            commands::entries::run(&state, MaterialId::new(material), PlantId::new(plant), all)
                .await?;
        }
    }
    Ok(())
}
