use std::sync::{Arc, Mutex};

use chrono::Utc;
use ocadvisor::advisor::{
    diagnostic_message, AdvisorError, RecommendationOrchestrator,
};
use ocadvisor::config::{AppConfig, FailurePolicy};
use ocadvisor::kernel::dispatch_request;
use ocadvisor::services::llm::{GenerationError, TextGenerator};
use ocadvisor::store::{RecommendationStatus, RecordStore};
use ocadvisor::telemetry::{
    CpuMetrics, GpuMetrics, GpuStaticInfo, GpuVendor, RamMetrics, Reading, SystemProfile,
    TelemetrySnapshot,
};

#[derive(Clone, Copy)]
enum Canned {
    Text(&'static str),
    ModelMissing,
    Offline,
}

struct CannedGenerator {
    reply: Canned,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl TextGenerator for CannedGenerator {
    fn model(&self) -> &str {
        "llama3"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Canned::Text(text) => Ok(text.to_string()),
            Canned::ModelMissing => Err(GenerationError::ModelNotFound("llama3".to_string())),
            Canned::Offline => Err(GenerationError::Connection {
                url: "http://localhost:11434".to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<RecordStore>,
    prompts: Arc<Mutex<Vec<String>>>,
    orchestrator: RecommendationOrchestrator<CannedGenerator>,
}

fn harness(reply: Canned, policy: FailurePolicy) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RecordStore::open(dir.path()).unwrap());
    let prompts = Arc::new(Mutex::new(Vec::new()));
    let config = AppConfig {
        priority: "stability".to_string(),
        failure_policy: policy,
        ..AppConfig::default()
    };
    let profile = SystemProfile {
        vendor: GpuVendor::Nvidia,
        os: "Linux".to_string(),
        gpu: GpuStaticInfo {
            model: "Test RTX".to_string(),
            ..GpuStaticInfo::default()
        },
    };
    let orchestrator = RecommendationOrchestrator::new(
        CannedGenerator {
            reply,
            prompts: prompts.clone(),
        },
        store.clone(),
        profile,
        &config,
    );
    Harness {
        _dir: dir,
        store,
        prompts,
        orchestrator,
    }
}

fn snapshot() -> TelemetrySnapshot {
    TelemetrySnapshot {
        timestamp: Utc::now(),
        gpu: GpuMetrics {
            temp_celsius: Reading::Available(65.0),
            power_draw_watts: Reading::Available(200.0),
            ..GpuMetrics::unavailable()
        },
        cpu: CpuMetrics::default(),
        ram: RamMetrics::default(),
    }
}

#[tokio::test]
async fn test_successful_request_is_stored_pending() {
    let h = harness(Canned::Text("Core +100MHz, Memory +500MHz"), FailurePolicy::RecordDiagnostic);
    let snap = snapshot();

    let rec = h.orchestrator.request(&snap, "Ethash", "efficiency").await.unwrap();

    assert_eq!(rec.llm_recommendation_text, "Core +100MHz, Memory +500MHz");
    assert_eq!(rec.applied_status, RecommendationStatus::PendingUserApply);
    assert_eq!(rec.system_snapshot_at_recommendation, snap);
    assert_eq!(h.store.get_recommendation(&rec.id).unwrap(), rec);

    let prompts = h.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Ethash"));
    assert!(prompts[0].contains("efficiency"));
    assert!(prompts[0].contains("Model: Test RTX"));
    assert!(prompts[0].contains("Target Temperature: 70°C"));
}

#[tokio::test]
async fn test_empty_goal_uses_configured_priority() {
    let h = harness(Canned::Text("ok"), FailurePolicy::RecordDiagnostic);

    let rec = h.orchestrator.request(&snapshot(), "KawPow", "   ").await.unwrap();

    assert_eq!(rec.user_goal, "stability");
    assert!(h.prompts.lock().unwrap()[0].contains("stability"));
}

#[tokio::test]
async fn test_missing_algorithm_is_rejected_before_generation() {
    let h = harness(Canned::Text("ok"), FailurePolicy::RecordDiagnostic);

    let err = h.orchestrator.request(&snapshot(), "  ", "efficiency").await.unwrap_err();

    assert!(matches!(err, AdvisorError::MissingAlgorithm));
    assert!(h.prompts.lock().unwrap().is_empty());
    assert!(h.store.list_recommendations().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_model_records_pull_hint() {
    let h = harness(Canned::ModelMissing, FailurePolicy::RecordDiagnostic);

    let rec = h.orchestrator.request(&snapshot(), "Ethash", "").await.unwrap();

    assert!(rec
        .llm_recommendation_text
        .starts_with("Error: Could not get recommendations from LLM."));
    assert!(rec.llm_recommendation_text.contains("ollama pull llama3"));
    assert_eq!(rec.applied_status, RecommendationStatus::PendingUserApply);
    assert_eq!(h.store.list_recommendations().unwrap().len(), 1);
}

#[tokio::test]
async fn test_offline_server_records_connection_hint() {
    let h = harness(Canned::Offline, FailurePolicy::RecordDiagnostic);

    let rec = h.orchestrator.request(&snapshot(), "Ethash", "").await.unwrap();

    assert!(rec.llm_recommendation_text.contains("connection refused"));
    assert!(rec
        .llm_recommendation_text
        .contains("running and accessible (e.g., at http://localhost:11434)"));
}

#[tokio::test]
async fn test_suppress_policy_stores_nothing() {
    let h = harness(Canned::Offline, FailurePolicy::Suppress);

    let err = h.orchestrator.request(&snapshot(), "Ethash", "").await.unwrap_err();

    assert!(matches!(
        err,
        AdvisorError::Generation(GenerationError::Connection { .. })
    ));
    assert!(h.store.list_recommendations().unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_does_not_store() {
    let h = harness(Canned::Text("advice"), FailurePolicy::RecordDiagnostic);

    let text = h.orchestrator.generate(&snapshot(), "Ethash", "").await.unwrap();

    assert_eq!(text, "advice");
    assert!(h.store.list_recommendations().unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatched_requests_complete_independently() {
    let h = harness(Canned::Text("advice"), FailurePolicy::RecordDiagnostic);
    let store = h.store.clone();
    let orchestrator = Arc::new(h.orchestrator);

    let a = dispatch_request(orchestrator.clone(), snapshot(), "Ethash".to_string(), String::new());
    let b = dispatch_request(orchestrator.clone(), snapshot(), "KawPow".to_string(), String::new());
    assert_ne!(a.request_id, b.request_id);

    let rec_a = a.handle.await.unwrap().unwrap();
    let rec_b = b.handle.await.unwrap().unwrap();

    assert_ne!(rec_a.id, rec_b.id);
    assert_eq!(rec_a.mining_algorithm, "Ethash");
    assert_eq!(rec_b.mining_algorithm, "KawPow");
    assert_eq!(store.list_recommendations().unwrap().len(), 2);
}

#[test]
fn test_diagnostic_message_shapes() {
    let missing = diagnostic_message(
        &GenerationError::ModelNotFound("mistral".to_string()),
        "mistral",
        "http://gpu-box:11434",
    );
    assert!(missing.contains("Run `ollama pull mistral`"));
    assert!(!missing.contains("gpu-box"));

    let decode = diagnostic_message(
        &GenerationError::Decode("expected value".to_string()),
        "mistral",
        "http://gpu-box:11434",
    );
    assert!(decode.contains("expected value"));
    assert!(decode.contains("http://gpu-box:11434"));
}
