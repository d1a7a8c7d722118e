mod display;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use counterbalance_core::{CachePolicy, Construction, EngineConfig, LogRequest};
use counterbalance_store::{CachedOrderStore, DuckStore, EventSink, ExportTable, OrderService};
use tracing_subscriber::EnvFilter;

const SHOWABLE_TABLES: &[&str] = &["orders", "documents", "queries", "logs"];

#[derive(Parser)]
#[command(name = "counterbalance", version, about = "Counterbalanced document orders for user studies")]
struct Cli {
    /// DuckDB database file.
    #[arg(long, env = "COUNTERBALANCE_DB", default_value = "counterbalance.duckdb", global = true)]
    db: PathBuf,

    /// JSON engine configuration; flags below override its fields.
    #[arg(long, env = "COUNTERBALANCE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "COUNTERBALANCE_SQUARE_SIZE", global = true)]
    square_size: Option<usize>,

    /// `cyclic` (true Latin square) or `sampled` (distinct rows only).
    #[arg(long, env = "COUNTERBALANCE_CONSTRUCTION", global = true)]
    construction: Option<Construction>,

    /// Order cache lifetime in seconds; 0 disables the cache.
    #[arg(long, env = "COUNTERBALANCE_CACHE_TTL_SECS", global = true)]
    cache_ttl_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create missing tables and load the sample corpus into empty ones.
    Init,
    /// Resolve (creating on first access) a participant's document order.
    Order {
        #[arg(long)]
        user: String,
        #[arg(long)]
        query: i64,
        /// Print only the comma-separated document ids.
        #[arg(long)]
        ids_only: bool,
    },
    /// Append an interaction event. Pass the JSON payload, or `-` for stdin.
    Log { payload: String },
    /// Print the configured order matrix.
    Square,
    /// Export orders and logs as Parquet files.
    Export {
        #[arg(long)]
        out: PathBuf,
        /// Export only this table (`orders` or `logs`).
        #[arg(long)]
        table: Option<String>,
    },
    /// Print rows of a table.
    Show {
        table: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(n) = self.square_size {
            config.square_size = n;
        }
        if let Some(c) = self.construction {
            config.construction = c;
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache = CachePolicy::from_ttl_secs(secs);
        }
        config.validate().context("invalid engine configuration")?;
        Ok(config)
    }

    fn open_db(&self) -> anyhow::Result<DuckStore> {
        DuckStore::open_persistent(&self.db)
            .with_context(|| format!("opening {}", self.db.display()))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("counterbalance v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = cli.engine_config()?;

    match &cli.command {
        Command::Init => {
            let db = cli.open_db()?;
            let report = db.seed_if_empty().context("seeding reference data")?;
            println!(
                "database ready: {} documents and {} queries inserted",
                report.documents, report.queries
            );
        }
        Command::Order {
            user,
            query,
            ids_only,
        } => {
            let db = cli.open_db()?;
            let service = OrderService::new(&config, CachedOrderStore::new(&db, config.cache), &db)?;
            let presentation = service
                .presented_documents(user, *query)
                .with_context(|| format!("resolving order for {user}/{query}"))?;
            if *ids_only {
                display::print_ids(&presentation);
            } else {
                display::print_presentation(user, &presentation);
            }
        }
        Command::Log { payload } => {
            let body = if payload == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("reading payload from stdin")?;
                buf
            } else {
                payload.clone()
            };
            let event = LogRequest::from_json(&body)?.into_event(chrono::Utc::now())?;
            let db = cli.open_db()?;
            db.append(&event).context("appending event")?;
            tracing::info!(user_id = %event.user_id, event_type = %event.event_type, "event logged");
        }
        Command::Square => {
            display::print_matrix(&config.matrix()?);
        }
        Command::Export { out, table } => {
            let tables = match table.as_deref() {
                Some(name) => vec![name.parse::<ExportTable>()?],
                None => vec![ExportTable::Orders, ExportTable::Logs],
            };
            std::fs::create_dir_all(out)
                .with_context(|| format!("creating {}", out.display()))?;
            let db = cli.open_db()?;
            for t in tables {
                let path = out.join(format!("{}.parquet", t.name()));
                let rows = db
                    .export_parquet(t, &path)
                    .with_context(|| format!("exporting {}", t.name()))?;
                println!("{:<8} {:>6} rows -> {}", t.name(), rows, path.display());
            }
        }
        Command::Show { table, limit } => {
            if !SHOWABLE_TABLES.contains(&table.as_str()) {
                bail!("unknown table '{table}', expected one of {SHOWABLE_TABLES:?}");
            }
            let db = cli.open_db()?;
            let batches = db.query_arrow(&format!("SELECT * FROM {table} LIMIT {limit}"))?;
            display::print_batches(&batches)?;
        }
    }
    Ok(())
}
