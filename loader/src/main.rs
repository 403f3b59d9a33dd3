use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fundex_core::loader::{index_from_store, CheckpointedLoader};
use fundex_core::persist::CatalogStore;
use fundex_core::query::{search, SearchFilters};
use fundex_core::{Plan, RiskTier};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "fundex-loader")]
#[command(about = "Build and query the fund catalog index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checkpointed load to completion, batch by batch
    Run {
        /// Source catalog file (a single JSON array of fund records)
        #[arg(long)]
        source: String,
        /// Catalog store directory
        #[arg(long, default_value = "./catalog-store")]
        store: String,
        #[arg(long, default_value_t = 500)]
        batch_size: usize,
    },
    /// Process exactly one batch and exit (for external schedulers)
    Batch {
        #[arg(long)]
        source: String,
        #[arg(long, default_value = "./catalog-store")]
        store: String,
        #[arg(long, default_value_t = 500)]
        batch_size: usize,
    },
    /// Print the current checkpoint as JSON
    Status {
        #[arg(long, default_value = "./catalog-store")]
        store: String,
    },
    /// Delete the checkpoint and the entity store (forces a fresh build)
    Reset {
        #[arg(long, default_value = "./catalog-store")]
        store: String,
    },
    /// Rebuild the index from the store and run one query
    Search {
        #[arg(long, default_value = "./catalog-store")]
        store: String,
        /// Free-text query
        #[arg(long)]
        query: Option<String>,
        /// Fund house filter, repeatable
        #[arg(long = "house")]
        houses: Vec<String>,
        /// Category or sub-category filter, repeatable
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Plan filter: direct | regular
        #[arg(long)]
        plan: Option<String>,
        /// Risk tier filter: low | moderately-low | moderate |
        /// moderately-high | high | very-high
        #[arg(long)]
        risk: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            store,
            batch_size,
        } => {
            let mut loader = CheckpointedLoader::open(&source, &store)?;
            let cp = loader.run_to_completion(batch_size)?;
            tracing::info!(
                processed = cp.processed,
                errors = cp.errors.len(),
                "catalog load complete"
            );
            println!("{}", serde_json::to_string_pretty(&cp)?);
        }
        Commands::Batch {
            source,
            store,
            batch_size,
        } => {
            let mut loader = CheckpointedLoader::open(&source, &store)?;
            let progress = loader.process_next_batch(batch_size)?;
            println!(
                "{}",
                serde_json::json!({
                    "processed": progress.processed,
                    "total_records": progress.total_records,
                    "total_is_exact": progress.total_is_exact,
                    "complete": progress.complete,
                    "batch": progress.batch.len(),
                    "errors_in_batch": progress.errors_in_batch,
                })
            );
        }
        Commands::Status { store } => {
            let store = CatalogStore::open(&store)?;
            match store.checkpoint()? {
                Some(cp) => println!("{}", serde_json::to_string_pretty(&cp)?),
                None => println!("null"),
            }
        }
        Commands::Reset { store } => {
            let store = CatalogStore::open(&store)?;
            store.clear()?;
            tracing::info!("catalog store reset");
        }
        Commands::Search {
            store,
            query,
            houses,
            categories,
            plan,
            risk,
            offset,
            limit,
        } => {
            let store = CatalogStore::open(&store)?;
            let index = index_from_store(&store)?;
            let filters = SearchFilters {
                search_text: query,
                fund_houses: houses,
                categories,
                plans: plan
                    .as_deref()
                    .map(parse_plan)
                    .transpose()?
                    .into_iter()
                    .collect(),
                risk_tiers: risk
                    .as_deref()
                    .map(parse_risk)
                    .transpose()?
                    .into_iter()
                    .collect(),
                offset,
                limit,
            };
            let result = search(&index, &filters);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

fn parse_plan(s: &str) -> Result<Plan> {
    match s.to_lowercase().as_str() {
        "direct" => Ok(Plan::Direct),
        "regular" => Ok(Plan::Regular),
        other => bail!("unknown plan {other:?} (expected direct or regular)"),
    }
}

fn parse_risk(s: &str) -> Result<RiskTier> {
    match s.to_lowercase().as_str() {
        "low" => Ok(RiskTier::Low),
        "moderately-low" => Ok(RiskTier::ModeratelyLow),
        "moderate" => Ok(RiskTier::Moderate),
        "moderately-high" => Ok(RiskTier::ModeratelyHigh),
        "high" => Ok(RiskTier::High),
        "very-high" => Ok(RiskTier::VeryHigh),
        other => bail!("unknown risk tier {other:?}"),
    }
}
