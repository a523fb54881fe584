//! Bibliograph CLI: ingest catalogs, link them, and migrate them into a graph

use anyhow::{bail, Context, Result};
use bibliograph::ingest::{
    ingest_archive, ingest_archive_stats, ingest_openlibrary, read_docs, ArchiveDoc,
    ArchiveStatsRecord, IngestReport, OpenLibraryDoc,
};
use bibliograph::linker::{link_catalog, LinkReport, LinkStrategy};
use bibliograph::migration::{link_and_migrate, migrate, MigrationConfig, MigrationReport, Stage};
use bibliograph::{CatalogStore, GraphStatistics, GraphStore};
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bibliograph", version, about = "Catalog to graph migration")]
struct Cli {
    /// SQLite catalog database
    #[arg(long, global = true, env = "BIBLIOGRAPH_DB")]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum StrategyArg {
    Indexed,
    Naive,
}

impl From<StrategyArg> for LinkStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Indexed => LinkStrategy::Indexed,
            StrategyArg::Naive => LinkStrategy::Naive,
        }
    }
}

#[derive(Args)]
struct MigrateArgs {
    /// YAML config file; flags below override its values
    #[arg(long, env = "BIBLIOGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Graph snapshot to load and save (.json or .json.gz)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Rows per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Stage to run (repeatable); all stages when omitted
    #[arg(long = "stage", value_parser = parse_stage)]
    stages: Vec<Stage>,

    /// Linking strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load decoded catalog documents into the catalog database
    Ingest {
        /// OpenLibrary search response or document array (repeatable)
        #[arg(long)]
        openlibrary: Vec<PathBuf>,

        /// Archive.org advanced-search response or document array (repeatable)
        #[arg(long)]
        archive: Vec<PathBuf>,

        /// Archive document access statistics (repeatable)
        #[arg(long)]
        stats: Vec<PathBuf>,
    },
    /// Link books to archive documents by title
    Link {
        #[arg(long, value_enum, default_value = "indexed")]
        strategy: StrategyArg,
    },
    /// Migrate the catalog into the graph
    Migrate(MigrateArgs),
    /// Link, then migrate
    Run(MigrateArgs),
    /// Show catalog and graph counts
    Stats {
        /// Graph snapshot to summarize
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    s.parse::<Stage>().map_err(|e| e.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Ingest {
            openlibrary,
            archive,
            stats,
        } => run_ingest(&db_path(&cli), openlibrary, archive, stats, cli.format),
        Commands::Link { strategy } => run_link(&db_path(&cli), (*strategy).into(), cli.format),
        Commands::Migrate(args) => run_migrate(&cli, args, false),
        Commands::Run(args) => run_migrate(&cli, args, true),
        Commands::Stats { snapshot } => run_stats(&db_path(&cli), snapshot.as_deref(), cli.format),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn db_path(cli: &Cli) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| MigrationConfig::default().source)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn counts_table(header: [&str; 2], rows: Vec<(String, String)>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    for (name, value) in rows {
        table.add_row(vec![name, value]);
    }
    table
}

fn run_ingest(
    db: &Path,
    openlibrary: &[PathBuf],
    archive: &[PathBuf],
    stats: &[PathBuf],
    format: OutputFormat,
) -> Result<()> {
    if openlibrary.is_empty() && archive.is_empty() && stats.is_empty() {
        bail!("nothing to ingest: pass --openlibrary, --archive or --stats");
    }

    let catalog = CatalogStore::open(db).with_context(|| format!("opening {}", db.display()))?;
    let mut report = IngestReport::default();

    for path in archive {
        let docs: Vec<ArchiveDoc> = read_docs(path).with_context(|| format!("reading {}", path.display()))?;
        report.merge(&ingest_archive(&catalog, &docs)?);
    }
    for path in openlibrary {
        let docs: Vec<OpenLibraryDoc> = read_docs(path).with_context(|| format!("reading {}", path.display()))?;
        report.merge(&ingest_openlibrary(&catalog, &docs)?);
    }
    for path in stats {
        let records: Vec<ArchiveStatsRecord> =
            read_docs(path).with_context(|| format!("reading {}", path.display()))?;
        report.merge(&ingest_archive_stats(&catalog, &records)?);
    }

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            let rows = vec![
                ("books inserted".to_string(), report.books_inserted.to_string()),
                ("books without edition key".to_string(), report.books_without_key.to_string()),
                ("authors inserted".to_string(), report.authors_inserted.to_string()),
                ("authorships inserted".to_string(), report.authorships_inserted.to_string()),
                ("editions inserted".to_string(), report.editions_inserted.to_string()),
                ("editions skipped".to_string(), report.editions_skipped.to_string()),
                ("documents inserted".to_string(), report.documents_inserted.to_string()),
                (
                    "documents without identifier".to_string(),
                    report.documents_without_identifier.to_string(),
                ),
                ("stats inserted".to_string(), report.stats_inserted.to_string()),
                ("stats skipped".to_string(), report.stats_skipped.to_string()),
            ];
            println!("{}", counts_table(["Ingest", "Count"], rows));
            Ok(())
        }
    }
}

fn run_link(db: &Path, strategy: LinkStrategy, format: OutputFormat) -> Result<()> {
    if !db.exists() {
        bail!("catalog database not found: {}", db.display());
    }
    let catalog = CatalogStore::open(db)?;
    let report = link_catalog(&catalog, strategy)?;
    print_link_report(&report, format)
}

fn print_link_report(report: &LinkReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let rows = vec![
                ("strategy".to_string(), report.strategy.to_string()),
                ("books scanned".to_string(), report.books_scanned.to_string()),
                ("books without title".to_string(), report.books_without_title.to_string()),
                ("documents indexed".to_string(), report.documents_indexed.to_string()),
                ("matches".to_string(), report.matches.to_string()),
                ("links inserted".to_string(), report.links_inserted.to_string()),
                ("links already present".to_string(), report.links_existing.to_string()),
            ];
            println!("{}", counts_table(["Link", "Value"], rows));
            Ok(())
        }
    }
}

fn build_config(cli: &Cli, args: &MigrateArgs) -> Result<MigrationConfig> {
    let mut config = match &args.config {
        Some(path) => MigrationConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => MigrationConfig::default(),
    };

    if let Some(db) = &cli.db {
        config.source = db.clone();
    }
    if let Some(snapshot) = &args.snapshot {
        config.target = Some(snapshot.clone());
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if !args.stages.is_empty() {
        config.stages = args.stages.clone();
    }
    if let Some(strategy) = args.strategy {
        config.link_strategy = strategy.into();
    }

    config.validate()?;
    tracing::debug!(?config, "resolved migration config");
    Ok(config)
}

fn run_migrate(cli: &Cli, args: &MigrateArgs, link_first: bool) -> Result<()> {
    let config = build_config(cli, args)?;

    let (link_report, report) = if link_first {
        let (link_report, report) = link_and_migrate(&config)?;
        (Some(link_report), report)
    } else {
        (None, migrate(&config)?)
    };

    match cli.format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Output<'a> {
                #[serde(skip_serializing_if = "Option::is_none")]
                link: Option<&'a LinkReport>,
                migration: &'a MigrationReport,
            }
            print_json(&Output {
                link: link_report.as_ref(),
                migration: &report,
            })
        }
        OutputFormat::Table => {
            if let Some(link_report) = &link_report {
                print_link_report(link_report, OutputFormat::Table)?;
            }
            print_migration_report(&report);
            Ok(())
        }
    }
}

fn print_migration_report(report: &MigrationReport) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Stage", "Status", "Batches", "Attempted", "Succeeded", "Created", "Missing", "Failed",
    ]);
    for stage in &report.stages {
        table.add_row(vec![
            stage.stage.to_string(),
            stage.status.to_string(),
            stage.batches.to_string(),
            stage.counts.attempted.to_string(),
            stage.counts.succeeded.to_string(),
            stage.counts.created.to_string(),
            stage.counts.missing_endpoints.to_string(),
            stage.counts.failed.to_string(),
        ]);
    }
    println!("{}", table);

    for stage in report.stages.iter().filter(|s| s.error.is_some()) {
        println!("{}: {}", stage.stage, stage.error.as_deref().unwrap_or_default());
    }
    println!(
        "Run {} {} in {} ms",
        report.run_id,
        report.status,
        report.duration_ms().unwrap_or(0)
    );
    if let Some(graph) = &report.graph {
        println!("Graph: {} nodes, {} edges", graph.node_count, graph.edge_count);
    }
}

fn run_stats(db: &Path, snapshot: Option<&Path>, format: OutputFormat) -> Result<()> {
    #[derive(Serialize)]
    struct Output {
        #[serde(skip_serializing_if = "Option::is_none")]
        catalog: Option<bibliograph::relational::CatalogCounts>,
        #[serde(skip_serializing_if = "Option::is_none")]
        graph: Option<GraphStatistics>,
    }

    let catalog = if db.exists() {
        Some(CatalogStore::open_read_only(db)?.counts()?)
    } else {
        None
    };
    let graph = match snapshot {
        Some(path) => Some(GraphStore::load_snapshot(path)?.statistics()),
        None => None,
    };
    if catalog.is_none() && graph.is_none() {
        bail!("nothing to show: {} does not exist and no --snapshot given", db.display());
    }

    let output = Output { catalog, graph };
    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            if let Some(counts) = &output.catalog {
                let rows = vec![
                    ("author".to_string(), counts.authors.to_string()),
                    ("book".to_string(), counts.books.to_string()),
                    ("book_author".to_string(), counts.book_authors.to_string()),
                    ("book_edition".to_string(), counts.editions.to_string()),
                    ("archive_document".to_string(), counts.archive_documents.to_string()),
                    ("archive_stats".to_string(), counts.archive_stats.to_string()),
                    ("book_archive_link".to_string(), counts.book_archive_links.to_string()),
                ];
                println!("{}", counts_table(["Table", "Rows"], rows));
            }
            if let Some(stats) = &output.graph {
                let rows = stats
                    .nodes_by_label
                    .iter()
                    .map(|(label, n)| (format!(":{}", label), n.to_string()))
                    .chain(
                        stats
                            .edges_by_type
                            .iter()
                            .map(|(edge_type, n)| (format!("[:{}]", edge_type), n.to_string())),
                    )
                    .collect();
                println!("{}", counts_table(["Label / Type", "Count"], rows));
                println!("{} nodes, {} edges", stats.node_count, stats.edge_count);
            }
            Ok(())
        }
    }
}
