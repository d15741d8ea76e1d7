//! Runtime drivers around the core.
//!
//! One OS thread polls telemetry into the metrics log; each recommendation
//! request runs on its own tokio task. The store's files are the only shared
//! state, so there are no locks here.

pub mod dispatch;
pub mod poller;

pub use dispatch::{capture_foreground, dispatch_request, PendingRequest};
pub use poller::MetricsPoller;
