//! `replay` command implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use contracts::{NetworkSender, RawEvent, TelemetryConfig};
use dispatcher::{DispatchSnapshot, LogSender};
use ingestion::{EventPipeline, PipelineSnapshot};
use observability::DeliverySummary;
use tracing::{info, warn};

use crate::cli::ReplayArgs;
use crate::error::{self, CliError};

/// Outcome of one replay run
#[derive(Debug)]
struct ReplayReport {
    reported: usize,
    queued: usize,
    dropped: usize,
    issues_by_code: BTreeMap<u32, usize>,
    remaining: usize,
    pipeline: PipelineSnapshot,
    dispatch: DispatchSnapshot,
    delivery: DeliverySummary,
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Replay Summary ===")?;
        writeln!(f, "Reported: {}", self.reported)?;
        writeln!(f, "Queued: {}", self.queued)?;
        writeln!(f, "Dropped: {}", self.dropped)?;
        if !self.issues_by_code.is_empty() {
            writeln!(f, "Issues by code:")?;
            for (code, count) in &self.issues_by_code {
                writeln!(f, "  {code}: {count}")?;
            }
        }
        writeln!(f, "Left in queue: {}", self.remaining)?;
        writeln!(f, "Pipeline: {}", self.pipeline)?;
        writeln!(f, "Dispatch: {}", self.dispatch)?;
        write!(f, "{}", self.delivery)
    }
}

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let config = load_config(args)?;
    let events = read_events(&args.events)?;
    info!(
        tenant = config.tenant_id,
        events = events.len(),
        store = ?config.store.path,
        "Replaying events"
    );

    let drain_timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let report = match &args.endpoint {
        None => replay(config, events, LogSender::default(), drain_timeout).await?,
        Some(endpoint) => {
            replay_http(config, events, endpoint, args.request_timeout, drain_timeout).await?
        }
    };

    println!("{report}");
    info!(remaining = report.remaining, "Replay finished");
    Ok(())
}

#[cfg(feature = "http")]
async fn replay_http(
    config: TelemetryConfig,
    events: Vec<RawEvent>,
    endpoint: &str,
    request_timeout: u64,
    drain_timeout: Option<Duration>,
) -> error::Result<ReplayReport> {
    let sender =
        dispatcher::HttpSender::new("http", endpoint, Duration::from_secs(request_timeout))?;
    replay(config, events, sender, drain_timeout).await
}

#[cfg(not(feature = "http"))]
async fn replay_http(
    _config: TelemetryConfig,
    _events: Vec<RawEvent>,
    endpoint: &str,
    _request_timeout: u64,
    _drain_timeout: Option<Duration>,
) -> error::Result<ReplayReport> {
    Err(CliError::HttpUnavailable {
        endpoint: endpoint.to_string(),
    })
}

fn load_config(args: &ReplayArgs) -> error::Result<TelemetryConfig> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()));
    }
    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)?;
    if let Some(ref store) = args.store {
        info!(store = %store.display(), "Overriding queue store from CLI");
        config.store.path = Some(store.clone());
    }
    Ok(config)
}

/// Parse a JSON lines file; blank lines are skipped
fn read_events(path: &Path) -> error::Result<Vec<RawEvent>> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<RawEvent>(line)
                .map_err(|e| CliError::event_parse(idx + 1, e.to_string()))
        })
        .collect()
}

/// Report everything, then drain the queue with one dispatch-now cycle
async fn replay<S>(
    config: TelemetryConfig,
    events: Vec<RawEvent>,
    sender: S,
    drain_timeout: Option<Duration>,
) -> error::Result<ReplayReport>
where
    S: NetworkSender + Sync + 'static,
{
    let pipeline = EventPipeline::builder(config, sender).build()?;

    let reported = events.len();
    let outcomes = pipeline.report_all(events);
    let queued = outcomes.iter().filter(|o| o.is_queued()).count();
    let mut issues_by_code = BTreeMap::new();
    for issue in outcomes.iter().flat_map(|o| o.issues()) {
        *issues_by_code.entry(issue.code).or_insert(0) += 1;
    }
    pipeline.flush();

    tokio::select! {
        finished = drain(&pipeline, drain_timeout) => {
            if !finished {
                warn!("Drain timed out, remaining events stay queued");
            }
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping replay...");
        }
    }

    pipeline.shutdown().await;

    Ok(ReplayReport {
        reported,
        queued,
        dropped: reported - queued,
        issues_by_code,
        remaining: pipeline.queue().len(),
        pipeline: pipeline.metrics(),
        dispatch: pipeline.dispatcher().metrics(),
        delivery: pipeline.dispatcher().delivery_summary(),
    })
}

/// Returns false when the timeout elapsed first
async fn drain<S>(pipeline: &EventPipeline<S>, timeout: Option<Duration>) -> bool
where
    S: NetworkSender + Sync + 'static,
{
    let work = async {
        // A realtime-triggered cycle may already be running
        pipeline.dispatcher().wait_idle().await;
        pipeline.dispatch_now();
        pipeline.dispatcher().wait_idle().await;
    };
    match timeout {
        Some(limit) => tokio::time::timeout(limit, work).await.is_ok(),
        None => {
            work.await;
            true
        }
    }
}

/// Ctrl+C and SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
