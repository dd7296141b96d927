mod config;
mod corpus;
mod error;
mod extract;
mod sink;
mod themes;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use tracing::warn;

use config::Config;
use error::IndexError;
use extract::record::{CorpusMeta, Record};
use sink::{ImportReport, SinkClient};

#[derive(Parser)]
#[command(
    name = "docsearch_indexer",
    about = "Index static documentation HTML into a Typesense collection"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Typesense host
    #[arg(long, default_value = "localhost")]
    host: String,
    /// Typesense port
    #[arg(long, default_value_t = 8108)]
    port: u16,
    /// Connection protocol (http or https)
    #[arg(long, default_value = "http")]
    protocol: String,
    /// Admin API key (falls back to TYPESENSE_API_KEY)
    #[arg(long, default_value = "")]
    api_key: String,
    /// Collection to operate on
    #[arg(long, default_value = "docs")]
    collection: String,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from a build output tree and upsert them
    Index {
        /// Directory containing the built HTML
        out_dir: PathBuf,
        #[command(flatten)]
        conn: ConnectionArgs,
        /// Documentation theme used for content-selector inference
        #[arg(long)]
        theme: Option<String>,
        /// Content-root selector override (repeatable, tried in order)
        #[arg(long = "selector")]
        selectors: Vec<String>,
        /// Version tag stamped on every record
        #[arg(long, default_value = "")]
        doc_version: String,
        /// Language tag stamped on every record
        #[arg(long, default_value = "en")]
        language: String,
        /// Drop and recreate the collection first (destructive)
        #[arg(long)]
        drop_existing: bool,
        /// Resolve configuration but skip extraction and upload
        #[arg(long)]
        disable_indexing: bool,
    },
    /// Extract records and report them without touching the network
    Extract {
        /// Directory containing the built HTML
        out_dir: PathBuf,
        /// Documentation theme used for content-selector inference
        #[arg(long)]
        theme: Option<String>,
        /// Content-root selector override (repeatable, tried in order)
        #[arg(long = "selector")]
        selectors: Vec<String>,
        /// Print every record as a JSON line
        #[arg(long)]
        dump: bool,
    },
    /// Delete the collection and everything in it (destructive)
    Drop {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
    /// Show the collection's document count
    Stats {
        #[command(flatten)]
        conn: ConnectionArgs,
    },
    /// Print the JSON configuration consumed by the search widget
    WidgetConfig {
        #[command(flatten)]
        conn: ConnectionArgs,
        /// Documentation theme, used for the default container selector
        #[arg(long)]
        theme: Option<String>,
        /// Search-only API key (falls back to TYPESENSE_SEARCH_API_KEY)
        #[arg(long, default_value = "")]
        search_api_key: String,
        /// Input placeholder text
        #[arg(long, default_value = "Search documentation...")]
        placeholder: String,
        /// Typo tolerance (0-2)
        #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=2))]
        num_typos: u8,
        /// Results per page
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        per_page: u32,
        /// Widget mount-point selector (defaults to the theme's placement)
        #[arg(long)]
        container: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Index {
            out_dir,
            conn,
            theme,
            selectors,
            doc_version,
            language,
            drop_existing,
            disable_indexing,
        } => {
            let mut config = base_config(&conn);
            config.out_dir = out_dir;
            config.theme = theme;
            config.content_selectors = selectors;
            config.doc_version = doc_version;
            config.language = language;
            config.drop_existing = drop_existing;
            config.indexing_enabled = !disable_indexing;
            config.resolve_env();
            run_index(config).await
        }
        Commands::Extract {
            out_dir,
            theme,
            selectors,
            dump,
        } => run_extract(&out_dir, theme.as_deref(), &selectors, dump),
        Commands::Drop { conn } => {
            let mut config = base_config(&conn);
            config.resolve_env();
            config.validate()?;
            let client = SinkClient::new(&config)?;
            if client.drop_collection().await? {
                println!(
                    "Dropped collection '{}' at {}",
                    config.collection,
                    config.base_url()
                );
            } else {
                println!(
                    "Collection '{}' does not exist at {}",
                    config.collection,
                    config.base_url()
                );
            }
            Ok(())
        }
        Commands::Stats { conn } => {
            let mut config = base_config(&conn);
            config.resolve_env();
            config.validate()?;
            let client = SinkClient::new(&config)?;
            let info = client.collection_stats().await?;
            println!("Collection: {}", info.name);
            println!("Documents:  {}", info.num_documents);
            Ok(())
        }
        Commands::WidgetConfig {
            conn,
            theme,
            search_api_key,
            placeholder,
            num_typos,
            per_page,
            container,
        } => {
            let mut config = base_config(&conn);
            config.search_api_key = search_api_key;
            // Only the search-side settings matter here; no admin key needed.
            config.indexing_enabled = false;
            config.resolve_env();
            config.validate()?;
            print_widget_config(
                &config,
                theme.as_deref(),
                &placeholder,
                num_typos,
                per_page,
                container,
            )
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn base_config(conn: &ConnectionArgs) -> Config {
    Config {
        out_dir: PathBuf::new(),
        theme: None,
        content_selectors: Vec::new(),
        collection: conn.collection.clone(),
        doc_version: String::new(),
        language: String::new(),
        host: conn.host.clone(),
        port: conn.port,
        protocol: conn.protocol.clone(),
        api_key: conn.api_key.clone(),
        search_api_key: String::new(),
        drop_existing: false,
        indexing_enabled: true,
        timeout_secs: conn.timeout,
    }
}

async fn run_index(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let (content_selectors, _) =
        themes::resolve(config.theme.as_deref(), &config.content_selectors);
    let meta = CorpusMeta {
        version: config.doc_version.clone(),
        language: config.language.clone(),
    };

    let corpus = corpus::assemble(
        &config.out_dir,
        &content_selectors,
        &meta,
        config.indexing_enabled,
    )?;
    if !config.indexing_enabled {
        println!("Indexing disabled; nothing extracted, nothing sent.");
        return Ok(());
    }
    println!(
        "Extracted {} records from {} pages ({} unreadable).",
        corpus.records.len(),
        corpus.pages,
        corpus.pages_skipped
    );
    if corpus.id_collisions > 0 {
        println!(
            "Warning: {} document id collisions (later records won).",
            corpus.id_collisions
        );
    }

    if corpus.records.is_empty() {
        // An empty build output is a successful run, not a failure.
        println!(
            "No indexable content found; collection '{}' left untouched.",
            config.collection
        );
        return Ok(());
    }

    let client = SinkClient::new(&config)?;
    match push_corpus(&client, &config, &corpus.records).await {
        Ok(report) => {
            println!(
                "Indexed {} documents into '{}' at {} ({} rejected).",
                report.accepted,
                config.collection,
                config.base_url(),
                report.failures.len()
            );
            for failure in report.failures.iter().take(5) {
                warn!("Rejected document: {}", failure);
            }
            Ok(())
        }
        Err(e) => {
            println!(
                "Indexing aborted ({} error): {} documents extracted, none confirmed in '{}' at {}.",
                e.category(),
                corpus.records.len(),
                config.collection,
                config.base_url()
            );
            println!("A re-run reproduces the same batch; already-sent documents upsert in place.");
            Err(e.into())
        }
    }
}

async fn push_corpus(
    client: &SinkClient,
    config: &Config,
    records: &[Record],
) -> Result<ImportReport, IndexError> {
    client.check_health().await?;
    client.ensure_collection(config.drop_existing).await?;
    client.upsert_batch(records).await
}

fn run_extract(
    out_dir: &std::path::Path,
    theme: Option<&str>,
    selectors: &[String],
    dump: bool,
) -> anyhow::Result<()> {
    let (content_selectors, _) = themes::resolve(theme, selectors);
    let corpus = corpus::assemble(out_dir, &content_selectors, &CorpusMeta::default(), true)?;

    if dump {
        for record in &corpus.records {
            println!("{}", serde_json::to_string(record)?);
        }
    }
    println!(
        "Extracted {} records from {} pages ({} unreadable, {} id collisions).",
        corpus.records.len(),
        corpus.pages,
        corpus.pages_skipped,
        corpus.id_collisions
    );
    Ok(())
}

fn print_widget_config(
    config: &Config,
    theme: Option<&str>,
    placeholder: &str,
    num_typos: u8,
    per_page: u32,
    container: Option<String>,
) -> anyhow::Result<()> {
    let (_, placement) = themes::resolve(theme, &[]);
    let container = container
        .or_else(|| placement.first().cloned())
        .unwrap_or_else(|| "#docsearch-container".to_string());

    let widget = serde_json::json!({
        "collectionName": config.collection,
        "host": config.host,
        "port": config.port.to_string(),
        "protocol": config.protocol,
        "apiKey": config.search_api_key,
        "placeholder": placeholder,
        "numTypos": num_typos,
        "perPage": per_page,
        "container": container,
    });
    println!("{}", serde_json::to_string_pretty(&widget)?);
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
