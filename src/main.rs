//! # Product Taxonomy CLI (`taxo`)
//!
//! Administrative and exploratory interface for the classification
//! service. All commands accept a `--config` flag pointing to a TOML
//! configuration file; see `config/taxo.example.toml`.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `taxo init` | Create the PostgreSQL schema (idempotent) |
//! | `taxo import unspsc <file>` | Bulk-import licensed UNSPSC codes |
//! | `taxo import etim <file>` | Bulk-import licensed ETIM classes |
//! | `taxo lookup <code>` | Look up one code, enriched |
//! | `taxo search <term>` | Relevance-ranked search |
//! | `taxo hierarchy <code>` | Segment → commodity ancestry |
//! | `taxo children <parent>` | Descendants of a prefix or code |
//! | `taxo similar <code>` | Family/class siblings with similarity |
//! | `taxo validate <code>` | Business-rule check |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use product_taxonomy::cache::redis::RedisCache;
use product_taxonomy::config::{load_config, Config};
use product_taxonomy::graph::neo4j::Neo4jGraph;
use product_taxonomy::graph::GraphStore;
use product_taxonomy::models::{Lookup, ValidationContext};
use product_taxonomy::service::ClassificationService;
use product_taxonomy::store::postgres::PostgresStore;
use product_taxonomy::{db, import, migrate};

/// Product taxonomy service — UNSPSC/ETIM classification lookups over a
/// Redis/PostgreSQL/Neo4j tier.
#[derive(Parser)]
#[command(
    name = "taxo",
    about = "UNSPSC/ETIM classification lookup service for product catalogs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/taxo.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Bulk-import licensed reference data from a CSV file.
    ///
    /// Import aborts on a missing file or unexpected header; individual
    /// malformed rows are skipped with a warning.
    Import {
        #[command(subcommand)]
        dataset: ImportDataset,
    },

    /// Look up a single UNSPSC code.
    Lookup {
        /// Full-width 8-digit code, e.g. 25171501.
        code: String,
    },

    /// Search codes by title/description substring, relevance-ranked.
    Search {
        term: String,

        /// Restrict to a two-digit segment prefix.
        #[arg(long)]
        segment: Option<String>,

        /// Restrict to a four-digit family prefix.
        #[arg(long)]
        family: Option<String>,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,

        /// Attach each result's ancestor codes.
        #[arg(long)]
        hierarchy: bool,
    },

    /// Show the segment → commodity ancestry of a code.
    Hierarchy { code: String },

    /// List descendants of a code or significant prefix (e.g. 2517).
    Children { parent: String },

    /// List similar codes (family/class siblings).
    Similar {
        code: String,

        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Run the business-rule chain for a code.
    Validate {
        code: String,

        /// Industry context for advisory recommendations.
        #[arg(long)]
        industry: Option<String>,
    },
}

#[derive(Subcommand)]
enum ImportDataset {
    /// UNSPSC codes CSV (columns: Code, Title, optional Description).
    Unspsc { file: PathBuf },
    /// ETIM classes CSV (columns: ClassCode, DescriptionEN, optional
    /// Version, DescriptionDE, DescriptionFR, ParentClass).
    Etim { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Schema initialized.");
        }
        Commands::Import { dataset } => {
            let pool = db::connect(&config).await?;
            let store = PostgresStore::new(pool);
            let report = match dataset {
                ImportDataset::Unspsc { file } => import::import_unspsc(&store, &file).await?,
                ImportDataset::Etim { file } => import::import_etim(&store, &file).await?,
            };
            println!(
                "Import finished: {} upserted, {} skipped.",
                report.upserted, report.skipped
            );
        }
        Commands::Lookup { code } => {
            let service = build_service(&config).await?;
            match service.get_code(&code).await? {
                Lookup::Found(rec) => {
                    println!("{}  {}", rec.record.code, rec.record.title);
                    if let Some(desc) = &rec.record.description {
                        println!("    {}", desc);
                    }
                    println!("    level: {}", rec.record.level);
                    if let Some(seg) = &rec.segment_title {
                        println!("    segment: {}", seg);
                    }
                    println!("    context: {}", rec.business_context);
                    println!("    cache hit: {}", rec.cache_hit);
                }
                Lookup::NotFound => println!("No such code."),
                Lookup::Invalid => println!("Invalid code format (want 8 digits, not 00-prefixed)."),
            }
        }
        Commands::Search {
            term,
            segment,
            family,
            limit,
            hierarchy,
        } => {
            let service = build_service(&config).await?;
            let results = service
                .search(&term, segment.as_deref(), family.as_deref(), limit, hierarchy)
                .await?;
            if results.is_empty() {
                println!("No results.");
            }
            for (i, r) in results.iter().enumerate() {
                println!("{}. [{}] {}  {}", i + 1, r.relevance, r.record.code, r.record.title);
                if let Some(path) = &r.hierarchy {
                    println!("    path: {}", path.join(" > "));
                }
            }
        }
        Commands::Hierarchy { code } => {
            let service = build_service(&config).await?;
            let path = service.get_hierarchy_path(&code).await?;
            if path.is_empty() {
                println!("No hierarchy (unknown or invalid code).");
            }
            for (depth, rec) in path.iter().enumerate() {
                println!("{}{}  {}", "  ".repeat(depth), rec.record.code, rec.record.title);
            }
        }
        Commands::Children { parent } => {
            let service = build_service(&config).await?;
            let children = service.get_children_codes(&parent).await?;
            if children.is_empty() {
                println!("No children.");
            }
            for c in &children {
                println!("{}  {}", c.code, c.title);
            }
        }
        Commands::Similar { code, limit } => {
            let service = build_service(&config).await?;
            let similar = service.get_similar_codes(&code, limit).await?;
            if similar.is_empty() {
                println!("No similar codes.");
            }
            for s in &similar {
                println!("[{:.1}] {}  {}", s.similarity, s.record.code, s.record.title);
            }
        }
        Commands::Validate { code, industry } => {
            let service = build_service(&config).await?;
            let context = industry.map(|industry| ValidationContext {
                industry: Some(industry),
            });
            let report = service
                .validate_business_rules(&code, context.as_ref())
                .await?;
            println!(
                "valid: {} ({} rules checked)",
                report.valid, report.rules_checked
            );
            for v in &report.violations {
                println!("  violation: {}", v);
            }
            for w in &report.warnings {
                println!("  warning: {}", w);
            }
            for r in &report.recommendations {
                println!("  recommendation: {}", r);
            }
        }
    }

    Ok(())
}

async fn build_service(config: &Config) -> Result<ClassificationService> {
    let pool = db::connect(config).await?;
    let store = Arc::new(PostgresStore::new(pool));
    let cache = Arc::new(RedisCache::connect(&config.redis).await?);
    let graph: Option<Arc<dyn GraphStore>> = if config.neo4j.enabled {
        Some(Arc::new(Neo4jGraph::connect(&config.neo4j).await?))
    } else {
        None
    };
    Ok(ClassificationService::new(
        store,
        cache,
        graph,
        config.clone(),
    ))
}
