//! DHCP notification pipeline (§4.B): a reader task decodes newline-JSON
//! notifications off a byte stream into a bounded channel; a flusher task
//! owns the priority queue, pops everything past the grace window on each
//! tick, and drives the upstream sink (plus, optionally, durable
//! reconciliation).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::notification::{decode_line, Notification};
use super::queue::NotificationQueue;
use super::store::LeaseStore;

pub const DEFAULT_TICK: Duration = Duration::from_secs(5);
pub const GRACE: Duration = Duration::from_secs(1);
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
#[error("sink rejected batch: {0}")]
pub struct SinkError(pub String);

/// The opaque upstream sink the controller RPC transport implements;
/// bit-exact wire format is out of scope for this crate.
#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload(&self, batch: Vec<Notification>) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationConfig {
    pub tick: Duration,
    pub grace: Duration,
    /// Single explicit mode flag replacing the two conflicting environment
    /// variables named in Design Note 4; set once at construction.
    pub durable: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            grace: GRACE,
            durable: false,
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Reader task: decodes newline-terminated JSON notifications off `stream`
/// into `tx`. An undecodable line is logged and discarded; the next line
/// is still attempted (the "decoder reset" from §4.B falls out naturally
/// from line-at-a-time framing).
pub async fn read_notifications<R: AsyncRead + Unpin + Send>(
    stream: R,
    tx: mpsc::Sender<Notification>,
) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match decode_line(&line) {
                    Ok(notification) => {
                        if tx.send(notification).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        log::warn!("discarding malformed dhcp notification: {err}");
                    }
                }
            }
            Ok(None) => return,
            Err(err) => {
                log::warn!("dhcp notification stream read error: {err}");
                return;
            }
        }
    }
}

/// Pops every notification whose age exceeds `grace` into a batch, in
/// ascending-timestamp order (guaranteed by the heap's pop order).
fn collect_due(heap: &mut NotificationQueue, now: i64, grace: Duration) -> Vec<Notification> {
    let mut batch = Vec::new();
    while let Some(ts) = heap.peek_timestamp() {
        if now - ts > grace.as_secs() as i64 {
            batch.push(heap.pop().expect("peeked element exists"));
        } else {
            break;
        }
    }
    batch
}

/// Runs one flush cycle. Returns the batch that was attempted (possibly
/// empty) for observability/testing.
pub async fn flush_once(
    heap: &mut NotificationQueue,
    sink: &dyn UploadSink,
    store: Option<&LeaseStore>,
    now: i64,
    grace: Duration,
) -> Vec<Notification> {
    let batch = collect_due(heap, now, grace);
    if batch.is_empty() {
        return batch;
    }

    match sink.upload(batch.clone()).await {
        Ok(()) => {
            if let Some(store) = store {
                if let Err(err) = store.reconcile(&batch) {
                    log::error!("durable reconciliation failed, re-queuing batch: {err}");
                    for notification in batch.clone() {
                        heap.push(notification);
                    }
                }
            }
        }
        Err(err) => {
            log::warn!("sink rejected batch, re-queuing: {err}");
            for notification in batch.clone() {
                heap.push(notification);
            }
        }
    }

    batch
}

/// Drives the flusher loop: owns the heap, drains `rx`, ticks every
/// `config.tick`, and flushes due notifications to `sink`. Runs until
/// `cancel` resolves.
pub async fn run(
    mut rx: mpsc::Receiver<Notification>,
    sink: std::sync::Arc<dyn UploadSink>,
    store: Option<std::sync::Arc<LeaseStore>>,
    config: NotificationConfig,
    mut cancel: tokio::sync::oneshot::Receiver<()>,
) {
    let mut heap = NotificationQueue::new();

    if config.durable {
        if let Some(store) = &store {
            match store.load_pending() {
                Ok(pending) => {
                    for notification in pending {
                        heap.push(notification);
                    }
                }
                Err(err) => log::error!("failed to load durable lease store on startup: {err}"),
            }
        }
    }

    let mut ticker = tokio::time::interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut cancel => return,
            maybe = rx.recv() => {
                match maybe {
                    Some(notification) => heap.push(notification),
                    None => return,
                }
            }
            _ = ticker.tick() => {
                let now = now_unix();
                let store_ref = store.as_deref();
                flush_once(&mut heap, sink.as_ref(), store_ref, now, config.grace).await;
            }
        }
    }
}

/// Spawns the reader and flusher as independent tasks sharing a bounded
/// channel, per §5's "(B) One reader task... one flusher".
pub fn spawn<R: AsyncRead + Unpin + Send + 'static>(
    stream: R,
    sink: std::sync::Arc<dyn UploadSink>,
    store: Option<std::sync::Arc<LeaseStore>>,
    config: NotificationConfig,
) -> (tokio::task::JoinHandle<()>, tokio::sync::oneshot::Sender<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(read_notifications(stream, tx));
    let handle = tokio::spawn(run(rx, sink, store, config, cancel_rx));

    (handle, cancel_tx)
}
