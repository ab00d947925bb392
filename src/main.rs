use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pcpsync::{
    config::{SinkConfig, SyncConfig},
    energy::build_energy_log,
    grid::XlsxWorkbook,
    process::{self, provenance::SourceMeta},
    reference::{build_material_targets, read_materials_sheet},
    sink::{deliver, DeliveryReport, MemorySink, ParquetSink, SinkRecord, WriteMode},
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Normalizes rolling-mill planning workbooks into columnar tables"
)]
struct Args {
    /// YAML file overriding the built-in thresholds.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root directory of the parquet tables.
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,
    /// Deliver into memory and log a sample record instead of writing.
    #[arg(long, global = true)]
    dry_run: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Operational schedule; replaces the whole table.
    Schedule {
        #[arg(long)]
        file: PathBuf,
        /// Sheet name; picked by preference when omitted.
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Material-master targets; upserts by material code.
    Materials {
        #[arg(long)]
        file: PathBuf,
    },
    /// Daily energy log; upserts by date.
    Energy {
        #[arg(long)]
        file: PathBuf,
    },
}

async fn send<R: SinkRecord>(
    records: &[R],
    mode: WriteMode,
    cfg: &SinkConfig,
    dry_run: bool,
) -> Result<DeliveryReport> {
    if dry_run {
        if let Some(first) = records.first() {
            info!(sample = %serde_json::to_string(first)?, "dry run; first record");
        }
        let mut sink = MemorySink::new();
        return deliver(&mut sink, records, mode, cfg.batch_size).await;
    }
    let mut sink = ParquetSink::new(&cfg.out_dir);
    deliver(&mut sink, records, mode, cfg.batch_size).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    let mut cfg = SyncConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.out_dir {
        cfg.sink.out_dir = dir;
    }
    info!(out_dir = %cfg.sink.out_dir.display(), dry_run = args.dry_run, "startup");

    let report = match args.command {
        Command::Schedule { file, sheet } => {
            let source = SourceMeta::from_path(&file)?;
            let mut workbook = XlsxWorkbook::open(&file)?;
            let (_, grid) =
                process::read_schedule_sheet(&mut workbook, sheet.as_deref(), &cfg.schedule)?;
            let run = process::build_schedule(&grid, &cfg.schedule, &source, Utc::now())?;
            if run.records.is_empty() {
                warn!("no schedule records; the stored table will be emptied");
            }
            send(&run.records, WriteMode::Replace, &cfg.sink, args.dry_run).await?
        }
        Command::Materials { file } => {
            let mut workbook = XlsxWorkbook::open(&file)?;
            let (sheet, grid) = read_materials_sheet(&mut workbook)?;
            info!(sheet = %sheet, "using material sheet");
            let targets = build_material_targets(&grid)?;
            send(&targets, WriteMode::Upsert, &cfg.sink, args.dry_run).await?
        }
        Command::Energy { file } => {
            let mut workbook = XlsxWorkbook::open(&file)?;
            let days = build_energy_log(&mut workbook)?;
            send(&days, WriteMode::Upsert, &cfg.sink, args.dry_run).await?
        }
    };

    if report.failed > 0 {
        warn!(
            succeeded = report.succeeded,
            failed = report.failed,
            batches = report.failed_batches,
            "some batches failed"
        );
    }
    Ok(())
}
