//! Lease notification pipeline (§4.B): decodes newline-JSON notifications
//! from the companion DHCP daemon, coalesces them past a grace window, and
//! flushes batches to the controller, with optional durable reconciliation
//! against a local SQLite lease store.

pub mod notification;
pub mod pipeline;
pub mod queue;
pub mod store;

pub use notification::{Action, IpFamily, Notification, NotificationDecodeError};
pub use pipeline::{NotificationConfig, SinkError, UploadSink};
pub use queue::NotificationQueue;
pub use store::{LeaseStore, StoreError};
