//! Command handlers.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use offline_request_queue::{
    DrainOutcome, HttpTransport, OfflineOutbox, OutboxConfig, RequestMethod, RequestRecord,
    SenderConfig, Submission,
};
use outbox_config_and_utils::{Config, Paths};
use outbox_storage::{create_store, KeyValueStore};
use reachability_monitor::{spawn_poller, ReachabilityMonitor, TcpProbe};
use tracing::info;

type AppResult<T> = Result<T, Box<dyn Error>>;

const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Arguments of the `submit` command.
pub struct SubmitRequest {
    pub method: RequestMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub data: Option<serde_json::Value>,
    pub object_hint: Option<String>,
    pub offline: bool,
}

fn probe(config: &Config) -> TcpProbe {
    TcpProbe::new(config.reachability_probe_addr.clone(), PROBE_CONNECT_TIMEOUT)
}

fn open_outbox(
    config: &Config,
    paths: &Paths,
    monitor: Arc<ReachabilityMonitor>,
) -> AppResult<OfflineOutbox> {
    let store: Arc<dyn KeyValueStore> = Arc::from(create_store(config, paths)?);
    let transport = HttpTransport::new(SenderConfig {
        request_timeout: config.request_timeout(),
        ..Default::default()
    })?;

    let outbox = OfflineOutbox::open(
        store,
        Arc::new(transport),
        monitor,
        OutboxConfig {
            storage_key: config.queue_storage_key.clone(),
        },
    )?;
    Ok(outbox)
}

/// Monitor seeded with one probe result.
async fn probed_monitor(config: &Config) -> Arc<ReachabilityMonitor> {
    let reachable = probe(config).check().await;
    info!(reachable = reachable, addr = %config.reachability_probe_addr, "Probed reachability");
    Arc::new(ReachabilityMonitor::new(reachable))
}

pub async fn submit(config: &Config, paths: &Paths, request: SubmitRequest) -> AppResult<()> {
    let target = config.resolve_target(&request.url)?;

    let mut record = RequestRecord::new(request.method, target.as_str())
        .with_headers(request.headers.into_iter().collect());
    if let Some(data) = request.data {
        record = record.with_payload(data);
    }
    if let Some(hint) = request.object_hint {
        record = record.with_object_hint(hint);
    }

    let monitor = if request.offline {
        Arc::new(ReachabilityMonitor::new(false))
    } else {
        probed_monitor(config).await
    };
    let outbox = open_outbox(config, paths, monitor)?;

    match outbox.submit(record).await? {
        Submission::Queued { position } => {
            println!("queued at position {}", position);
        }
        Submission::Sent(response) => {
            println!("sent: HTTP {}", response.status);
            if !response.body.is_empty() {
                println!("{}", response.body);
            }
        }
    }
    Ok(())
}

pub async fn list(config: &Config, paths: &Paths) -> AppResult<()> {
    let outbox = open_outbox(config, paths, Arc::new(ReachabilityMonitor::new(false)))?;
    let pending = outbox.pending().await;
    println!("{}", serde_json::to_string_pretty(&pending)?);
    Ok(())
}

pub async fn status(config: &Config, paths: &Paths) -> AppResult<()> {
    let outbox = open_outbox(config, paths, probed_monitor(config).await)?;
    println!("{}", serde_json::to_string_pretty(&outbox.status().await)?);
    Ok(())
}

pub async fn drain(config: &Config, paths: &Paths) -> AppResult<()> {
    let outbox = open_outbox(config, paths, probed_monitor(config).await)?;
    match outbox.drain_now().await {
        DrainOutcome::Completed(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        DrainOutcome::AlreadyDraining => println!("a drain is already running"),
    }
    Ok(())
}

pub async fn run(config: &Config, paths: &Paths) -> AppResult<()> {
    let monitor = probed_monitor(config).await;
    let outbox = open_outbox(config, paths, monitor.clone())?;

    let poller = spawn_poller(
        monitor,
        probe(config),
        config.reachability_poll_interval(),
    );
    outbox.start();
    info!(pending = outbox.pending_count().await, "Outbox running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    outbox.stop();
    poller.abort();
    info!(pending = outbox.pending_count().await, "Outbox stopped");
    Ok(())
}

pub async fn clear(config: &Config, paths: &Paths) -> AppResult<()> {
    let outbox = open_outbox(config, paths, Arc::new(ReachabilityMonitor::new(false)))?;
    let removed = outbox.clear().await?;
    println!("removed {} queued request(s)", removed);
    Ok(())
}
