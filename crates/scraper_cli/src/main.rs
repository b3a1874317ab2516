use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use vrs_gtfs_core::progress::ProgressHandler;
use vrs_gtfs_core::settings::DEFAULT_CITY;
use vrs_gtfs_core::{
    load_routes, read_table, FeedAssembler, HttpTransport, HttpTransportConfig, RetryPolicy,
    RunStatus, ScrapeSettings,
};
use vrs_gtfs_model::{Agency, Calendar, GtfsTime};

#[derive(Debug, Parser)]
#[command(name = "vrs-gtfs")]
#[command(about = "Scrape the VRS journey planner into a GTFS feed")]
struct Args {
    /// Directory holding one `*.data` route definition per line and direction
    #[arg(short = 'r', long = "routes-dir", default_value = "vrs")]
    routes_dir: PathBuf,

    #[arg(short = 'o', long = "output", default_value = "gtfs")]
    output: PathBuf,

    /// Stop cache reused across runs
    #[arg(short = 'c', long = "cache", default_value = "cache.json")]
    cache: PathBuf,

    /// Time of day queried on each service's first matching date
    #[arg(long = "offset", default_value = "06:00:00")]
    offset: String,

    #[arg(long = "city", default_value = DEFAULT_CITY)]
    city: String,

    /// GTFS calendar.txt replacing the built-in Monday service
    #[arg(long = "calendar")]
    calendar: Option<PathBuf>,

    /// GTFS agency.txt replacing the built-in agency
    #[arg(long = "agency")]
    agency: Option<PathBuf>,

    /// Keep the last journey planner response in this file
    #[arg(long = "dump-html")]
    dump_html: Option<PathBuf>,

    #[arg(long = "max-attempts", default_value_t = 5)]
    max_attempts: u32,

    #[arg(long = "timeout-secs", default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = ScrapeSettings {
        city: args.city.clone(),
        daily_offset: parse_offset(&args.offset)?,
        connection_retry: RetryPolicy::connection().with_max_attempts(args.max_attempts),
        unavailable_retry: RetryPolicy::unavailable().with_max_attempts(args.max_attempts),
        dump_html: args.dump_html.clone(),
        ..ScrapeSettings::default()
    };
    let transport = HttpTransport::new(&HttpTransportConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        ..HttpTransportConfig::default()
    })
    .context("build http client")?;

    let routes = load_routes(&args.routes_dir)
        .with_context(|| format!("load routes from {}", args.routes_dir.display()))?;
    info!("{} routes loaded from {}", routes.len(), args.routes_dir.display());

    let mut assembler = FeedAssembler::open(transport, settings, routes, &args.cache)
        .with_context(|| format!("load stop cache {}", args.cache.display()))?;
    if let Some(path) = &args.calendar {
        assembler = assembler.with_calendar(read_records::<Calendar>(path)?);
    }
    if let Some(path) = &args.agency {
        assembler = assembler.with_agency(read_records::<Agency>(path)?);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    spawn_interrupt_listener(Arc::clone(&interrupted))?;
    let progress = Arc::new(IndicatifHandler::new());
    let mut assembler = assembler
        .with_progress(progress.clone())
        .with_interrupt(interrupted);

    let outcome = assembler.run();
    progress.finish();

    match outcome {
        Ok(status) => {
            if status == RunStatus::Interrupted {
                warn!("Interrupted, saving what was collected so far");
            }
            assembler
                .save(&args.output)
                .with_context(|| format!("save feed to {}", args.output.display()))?;
            Ok(())
        }
        Err(err) => {
            if let Err(save_err) = assembler.save(&args.output) {
                error!("could not save partial feed: {}", save_err);
            } else {
                info!("partial feed saved to {}", args.output.display());
            }
            Err(err).context("scrape failed")
        }
    }
}

fn parse_offset(value: &str) -> anyhow::Result<chrono::Duration> {
    let time = GtfsTime::parse(value.trim())
        .with_context(|| format!("invalid --offset {}", value))?;
    Ok(chrono::Duration::seconds(i64::from(time.total_seconds())))
}

fn read_records<R: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<R>> {
    let records: Vec<R> =
        read_table(path).with_context(|| format!("read {}", path.display()))?;
    if records.is_empty() {
        bail!("{} has no rows", path.display());
    }
    Ok(records)
}

/// First Ctrl-C asks the run to stop after the current query; a second one
/// exits at once.
fn spawn_interrupt_listener(flag: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("Ctrl-C received, finishing the current query");
                flag.store(true, Ordering::SeqCst);
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        })
        .context("spawn interrupt listener")?;
    Ok(())
}

use indicatif::{ProgressBar, ProgressStyle};

struct IndicatifHandler {
    query_pb: ProgressBar,
}

impl IndicatifHandler {
    fn new() -> Self {
        let query_pb = ProgressBar::new(0);
        query_pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        query_pb.set_message("Waiting for routes...");
        Self { query_pb }
    }

    fn finish(&self) {
        self.query_pb.finish_with_message("done");
    }
}

impl ProgressHandler for IndicatifHandler {
    fn set_total_queries(&self, count: usize) {
        self.query_pb.set_length(count as u64);
    }

    fn on_start_query(&self, route_id: &str, service_id: &str) {
        self.query_pb
            .set_message(format!("Route {} (service {})", route_id, service_id));
    }

    fn on_finish_query(&self, _route_id: &str, _service_id: &str, _trips: usize) {
        self.query_pb.inc(1);
    }
}
