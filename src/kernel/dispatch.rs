use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::advisor::{AdvisorError, RecommendationOrchestrator};
use crate::services::llm::TextGenerator;
use crate::store::RecommendationRecord;
use crate::telemetry::{SystemMonitor, TelemetrySnapshot};

/// An in-flight recommendation request.
pub struct PendingRequest {
    pub request_id: Uuid,
    pub algorithm: String,
    pub handle: JoinHandle<Result<RecommendationRecord, AdvisorError>>,
}

/// Run one recommendation request on its own task so the model call never
/// blocks the caller or the metrics poller. There is no cancellation; the
/// request runs until the model answers or fails.
pub fn dispatch_request<G>(
    orchestrator: Arc<RecommendationOrchestrator<G>>,
    snapshot: TelemetrySnapshot,
    algorithm: String,
    goal: String,
) -> PendingRequest
where
    G: TextGenerator + Send + Sync + 'static,
{
    let request_id = Uuid::new_v4();
    info!("Recommendation request {} dispatched ({})", request_id, algorithm);
    let task_algorithm = algorithm.clone();
    let handle = tokio::spawn(async move {
        orchestrator
            .request(&snapshot, &task_algorithm, &goal)
            .await
    });
    PendingRequest {
        request_id,
        algorithm,
        handle,
    }
}

/// Take a snapshot on the blocking pool. A capture that panics is logged and
/// yields `None`; the caller drops the command and keeps running.
pub async fn capture_foreground(monitor: Arc<SystemMonitor>) -> Option<TelemetrySnapshot> {
    match tokio::task::spawn_blocking(move || monitor.capture()).await {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Foreground telemetry capture failed: {}", e);
            None
        }
    }
}
