//! Rack agent daemon entrypoint: loads configuration, brings up logging,
//! and wires the ARP observer, DHCP notification pipeline, DNS session
//! tracker, and image cache into one supervised process.
//!
//! The CLI argument surface, config-file discovery/templating, and the
//! controller RPC transport are the excluded collaborators this binary
//! hands off to (see the crate root docs); this `main` only demonstrates
//! the wiring those collaborators are expected to drive.

use std::path::PathBuf;
use std::sync::Arc;

use rack_agent::cache::ImageCache;
use rack_agent::config::Config;
use rack_agent::dhcp::{self, LeaseStore, NotificationConfig, Notification, SinkError, UploadSink};
use rack_agent::dns::Sessions;
use rack_agent::logging;
use rack_agent::net::capture;

const EXIT_OK: i32 = 0;
const EXIT_FATAL: i32 = 1;
const EXIT_MISSING_ARG: i32 = 2;

/// Logs each flushed batch instead of transmitting it; the real
/// controller RPC transport is an excluded collaborator (§6).
struct LoggingSink;

#[async_trait::async_trait]
impl UploadSink for LoggingSink {
    async fn upload(&self, batch: Vec<Notification>) -> Result<(), SinkError> {
        log::info!("flushing {} lease notification(s) to controller", batch.len());
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: rack-agent <config.yaml>");
            std::process::exit(EXIT_MISSING_ARG);
        }
    };

    if let Err(err) = logging::init_logger("rack-agent", "/var/log/maas") {
        eprintln!("failed to initialize logging: {err}");
        std::process::exit(EXIT_FATAL);
    }

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            log::error!("failed to load configuration: {err}");
            std::process::exit(EXIT_FATAL);
        }
    };

    log::info!("rack-agent starting, controller={}", config.controller);

    let cache = ImageCache::open(
        &config.services.http_proxy.cache.dir,
        config.services.http_proxy.cache.size.bytes(),
    );
    let _cache = match cache {
        Ok(cache) => cache,
        Err(err) => {
            log::error!("failed to open image cache: {err}");
            std::process::exit(EXIT_FATAL);
        }
    };

    let dns_sessions = Sessions::new();
    let (dns_sweep_cancel_tx, dns_sweep_cancel_rx) = tokio::sync::oneshot::channel();
    let dns_sweep = dns_sessions.spawn_sweep(dns_sweep_cancel_rx);

    let store = match LeaseStore::open(&PathBuf::from("/var/lib/maas/rack-agent/leases.sqlite3")) {
        Ok(store) => Some(Arc::new(store)),
        Err(err) => {
            log::warn!("durable lease store unavailable, running in-memory only: {err}");
            None
        }
    };

    let notification_config = NotificationConfig {
        durable: store.is_some(),
        ..NotificationConfig::default()
    };
    let stdin = tokio::io::stdin();
    let (pipeline_handle, pipeline_cancel_tx) = dhcp::pipeline::spawn(
        stdin,
        Arc::new(LoggingSink),
        store,
        notification_config,
    );

    let (capture_result_tx, mut capture_result_rx) = tokio::sync::mpsc::channel(256);
    let (capture_cancel_tx, capture_cancel_rx) = tokio::sync::oneshot::channel();
    let capture_iface = std::env::var("RACK_AGENT_IFACE").unwrap_or_else(|_| "eth0".to_string());
    let capture_handle = tokio::spawn(async move {
        capture::start(&capture_iface, capture_result_tx, capture_cancel_rx).await
    });

    let observer_handle = tokio::spawn(async move {
        while let Some(result) = capture_result_rx.recv().await {
            log::info!(
                "binding event {:?}: ip={} mac={} vid={:?}",
                result.event,
                result.ip,
                result.mac,
                result.vid
            );
        }
    });

    let mut shutdown = std::pin::pin!(shutdown_signal());
    tokio::select! {
        _ = &mut shutdown => {
            log::info!("received shutdown signal, stopping components");
        }
        result = pipeline_handle => {
            log::error!("dhcp notification pipeline exited unexpectedly: {result:?}");
            std::process::exit(EXIT_FATAL);
        }
        result = capture_handle => {
            log::error!("arp capture exited unexpectedly: {result:?}");
            std::process::exit(EXIT_FATAL);
        }
    }

    let _ = dns_sweep_cancel_tx.send(());
    let _ = pipeline_cancel_tx.send(());
    let _ = capture_cancel_tx.send(());
    let _ = dns_sweep.await;
    let _ = observer_handle.await;

    std::process::exit(EXIT_OK);
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
}
