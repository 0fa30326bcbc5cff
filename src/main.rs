use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use udeps::app::add_use_case::AddUseCase;
use udeps::app::docs_use_case::generate_docs;
use udeps::app::ports::{ArtifactStore, CatalogFetcher};
use udeps::app::remove_use_case::RemoveUseCase;
use udeps::app::search_use_case::SearchUseCase;
use udeps::app::sort_use_case::SortUseCase;
use udeps::config::{ConfigOverrides, UdepsConfig};
use udeps::constants::{DEFAULT_DOCS_DIR, MAX_SEARCH_RESULTS};
use udeps::infra::{FsArtifactStore, ReqwestCatalogFetcher};
use udeps::logging;

#[derive(Parser)]
#[command(name = "udeps")]
#[command(about = "Copy small, documented utility functions into your project instead of depending on packages")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Project directory (defaults to the nearest directory with a package.json)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Config file, relative to the project directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target libs, e.g. "es2020,dom" (overrides the config file)
    #[arg(long, global = true)]
    lib: Option<String>,

    /// Output file (overrides the config file)
    #[arg(long, global = true)]
    output: Option<String>,

    /// Catalog locators, comma separated (overrides the config file)
    #[arg(long, global = true)]
    registry: Option<String>,

    /// Also append JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add micro-dependencies to your project's output file
    Add {
        #[arg(required = true)]
        names: Vec<String>,
        /// Add even if a native replacement is available
        #[arg(long)]
        force: bool,
    },
    /// Remove micro-dependencies from your project's output file
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Search the configured catalogs
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Generate Markdown documentation for the configured catalogs
    Docs {
        /// Output directory, relative to the project directory
        #[arg(long, default_value = DEFAULT_DOCS_DIR)]
        out: PathBuf,
    },
    /// Sort the exported functions of a catalog or output file by name
    Sort { file: PathBuf },
}

fn load_config(overrides: &ConfigOverrides) -> anyhow::Result<UdepsConfig> {
    let config = UdepsConfig::load(overrides).context("Failed to load configuration")?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn setup(overrides: &ConfigOverrides) -> anyhow::Result<(UdepsConfig, Arc<dyn CatalogFetcher>)> {
    let config = load_config(overrides)?;
    let fetcher = ReqwestCatalogFetcher::new(config.fetch_timeout_secs).context("Failed to build HTTP client")?;
    Ok((config, Arc::new(fetcher)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guards = logging::init_logging(cli.debug, cli.log_file.as_deref())?;

    let overrides = ConfigOverrides {
        project: cli.project.clone(),
        config: cli.config.clone(),
        output: cli.output.clone(),
        lib: cli.lib.clone(),
        registry: cli.registry.clone(),
    };

    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore);

    match cli.command {
        Commands::Add { names, force } => {
            let (config, fetcher) = setup(&overrides)?;
            info!(names = ?names, "adding micro-dependencies");
            let report = AddUseCase::new(fetcher, store).execute(&config, &names, force).await?;
            for skipped in &report.obsolete {
                println!(
                    "⚠️  {} from {} is obsolete and was not added (use --force to add it anyway)",
                    skipped.name, skipped.catalog
                );
                println!("{}", skipped.reason);
            }
            for hint in &report.hints {
                println!("{}: {}", hint.name, hint.reason);
            }
            for name in &report.added {
                println!("✅ Added {}", name);
            }
            for conflict in &report.conflicts {
                println!("❌ {}", conflict);
            }
            for name in &report.unresolved {
                println!("❌ No supported implementation of {} was found", name);
            }
            if report.written {
                println!("📝 Updated {}", config.output_path().display());
            }
            if !report.unresolved.is_empty() || !report.conflicts.is_empty() {
                anyhow::bail!(
                    "{} of {} names could not be added",
                    report.unresolved.len() + report.conflicts.len(),
                    names.len()
                );
            }
        }
        Commands::Remove { names } => {
            let config = load_config(&overrides)?;
            let report = RemoveUseCase::new(store).execute(&config, &names).await?;
            if report.missing_file {
                anyhow::bail!("{} does not exist", config.output_path().display());
            }
            for name in &report.removed {
                println!("🗑️  Removed {}", name);
            }
            for missing in &report.not_found {
                println!("⚠️  {}", missing);
            }
        }
        Commands::Search { query } => {
            let (config, fetcher) = setup(&overrides)?;
            let query = query.join(" ");
            info!(query = %query, "searching");
            let report = SearchUseCase::new(fetcher).execute(&config, &query).await?;
            if !report.unsupported.is_empty() {
                println!("ℹ️  Found {} unsupported matches", report.unsupported.len());
            }
            if report.supported.is_empty() {
                println!("⚠️  No supported matches found in any catalog.");
                return Ok(());
            }
            if report.supported.len() > MAX_SEARCH_RESULTS {
                println!("🔍 Found lots of supported matches:");
            } else {
                println!("🔍 Found {} supported matches:", report.supported.len());
            }
            for hit in report.top() {
                println!("- {}: {}", hit.name, hit.summary);
                if let Some(message) = &hit.obsolescence {
                    println!("{}", message);
                }
            }
            if report.remaining() > 0 {
                println!("...and {} more results.", report.remaining());
            }
        }
        Commands::Docs { out } => {
            let (config, fetcher) = setup(&overrides)?;
            let report = generate_docs(&config, fetcher.as_ref(), store.as_ref(), &out).await?;
            for path in &report.written {
                println!("📄 Wrote {}", path.display());
            }
            for (source, error) in &report.failed {
                println!("❌ {}: {}", source, error);
            }
            if !report.failed.is_empty() {
                anyhow::bail!("{} catalogs could not be documented", report.failed.len());
            }
        }
        Commands::Sort { file } => {
            let path = std::env::current_dir()?.join(file);
            let changed = SortUseCase::new(store)
                .execute(&path)
                .await
                .with_context(|| format!("Failed to sort {}", path.display()))?;
            if changed {
                println!("✅ Sorted {}", path.display());
            } else {
                println!("👌 {} is already sorted", path.display());
            }
        }
    }

    Ok(())
}
