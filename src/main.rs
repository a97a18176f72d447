use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use message_search_backfill::backfill::{
    BackfillDependencies, BackupSearchIndexer, FullTextSearchBackfill,
};
use message_search_backfill::background_jobs::AppReadiness;
use message_search_backfill::checkpoint::CheckpointStore;
use message_search_backfill::clock::SystemClock;
use message_search_backfill::config::{AppConfig, CliConfig, FileConfig};
use message_search_backfill::interaction_import::import_jsonl;
use message_search_backfill::metrics;
use message_search_backfill::search::{
    Fts5MessageIndex, Fts5ThreadNameIndex, SqliteMentionStore, ThreadNameIndexer,
};
use message_search_backfill::store::{Database, SqliteInteractionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[command(name = "search-backfill", about = "Rebuild message search indexes")]
struct CliArgs {
    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite message database file.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Longest a single backfill batch may hold the write transaction.
    #[clap(long, default_value_t = 90)]
    pub batch_duration_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append interactions from a JSON lines file.
    Import {
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },
    /// Index all thread names.
    IndexThreads,
    /// Index thread names, schedule a full messages backfill and run it to completion.
    Schedule,
    /// Finish a backfill left pending by an earlier process.
    Resume,
    /// Print the backfill checkpoint and index sizes.
    Status,
    /// Search indexed message bodies.
    Search {
        query: String,
        #[clap(long, default_value_t = 20)]
        limit: usize,
    },
}

fn init_tracing(default_level: LevelFilter) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init();
}

fn build_backfill(
    database: &Database,
    interaction_store: Arc<SqliteInteractionStore>,
    config: &AppConfig,
) -> Arc<FullTextSearchBackfill> {
    FullTextSearchBackfill::new(BackfillDependencies {
        database: database.clone(),
        interaction_store,
        full_text_indexer: Arc::new(Fts5MessageIndex::new()),
        mention_indexer: Arc::new(SqliteMentionStore::new()),
        thread_name_indexer: Arc::new(Fts5ThreadNameIndex::new()),
        clock: Arc::new(SystemClock),
        readiness: AppReadiness::ready(),
        settings: config.backfill.clone(),
    })
}

fn print_checkpoint(backfill: &FullTextSearchBackfill) -> Result<()> {
    let checkpoint = backfill.checkpoint()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "checkpoint": checkpoint,
            "pending": checkpoint.is_pending(),
        }))?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db.clone(),
        batch_duration_ms: cli_args.batch_duration_ms,
        log_level: None,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let default_level = config
        .log_level
        .as_deref()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO);
    init_tracing(default_level);
    metrics::init_metrics();

    let database = Database::open(&config.db_path)?;
    let interaction_store = Arc::new(SqliteInteractionStore::new());

    match cli_args.command {
        Command::Import { file } => {
            let count = import_jsonl(&file, &database, interaction_store.as_ref())?;
            println!("Imported {} interactions", count);
        }
        Command::IndexThreads => {
            let indexer = Fts5ThreadNameIndex::new();
            database.write(|tx| indexer.index_threads(tx))?;
            println!("Thread names indexed");
        }
        Command::Schedule => {
            let backfill = build_backfill(&database, interaction_store, &config);
            database.write(|tx| {
                backfill.index_threads(tx)?;
                backfill.schedule_messages_job(tx)
            })?;
            // The committed schedule has already enqueued its attempt
            backfill.flush().await.context("Messages backfill failed")?;
            backfill.shutdown();
            print_checkpoint(&backfill)?;
            print!("{}", metrics::gather_metrics());
        }
        Command::Resume => {
            let backfill = build_backfill(&database, interaction_store, &config);
            let outcome = backfill
                .run_messages_job_now()
                .await
                .context("Messages backfill failed")?;
            backfill.shutdown();
            info!("Resume outcome: {:?}", outcome);
            print_checkpoint(&backfill)?;
        }
        Command::Status => {
            let message_index = Fts5MessageIndex::new();
            let mention_store = SqliteMentionStore::new();
            let checkpoint_store = CheckpointStore::new();
            let (checkpoint, indexed, mentions) = database.read(|tx| {
                Ok((
                    checkpoint_store.load(tx)?,
                    message_index.indexed_count(tx)?,
                    mention_store.all(tx)?.len(),
                ))
            })?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "checkpoint": checkpoint,
                    "pending": checkpoint.is_pending(),
                    "indexed_messages": indexed,
                    "mentions": mentions,
                }))?
            );
        }
        Command::Search { query, limit } => {
            let index = Fts5MessageIndex::new();
            let hits = database.read(|tx| index.search(&query, limit, tx))?;
            for hit in hits {
                println!("{}\t{:.3}\t{}", hit.interaction_id, hit.score, hit.body);
            }
        }
    }

    Ok(())
}
