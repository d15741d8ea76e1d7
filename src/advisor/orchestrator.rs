use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::prompt::build_prompt;
use crate::config::{AppConfig, FailurePolicy};
use crate::services::llm::{GenerationError, TextGenerator};
use crate::store::{RecommendationRecord, RecordStore, StoreError};
use crate::telemetry::{render_summary, SystemProfile, TelemetrySnapshot};

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("a mining algorithm is required")]
    MissingAlgorithm,

    #[error("recommendation not generated: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns a snapshot plus user intent into a stored recommendation.
pub struct RecommendationOrchestrator<G> {
    generator: G,
    store: Arc<RecordStore>,
    profile: SystemProfile,
    base_url: String,
    default_goal: String,
    target_temperature_celsius: f64,
    policy: FailurePolicy,
}

impl<G: TextGenerator> RecommendationOrchestrator<G> {
    pub fn new(
        generator: G,
        store: Arc<RecordStore>,
        profile: SystemProfile,
        config: &AppConfig,
    ) -> Self {
        Self {
            generator,
            store,
            profile,
            base_url: config.ollama_base_url.clone(),
            default_goal: config.priority.clone(),
            target_temperature_celsius: config.target_temperature_celsius,
            policy: config.failure_policy,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// The goal actually used: the user's, or the configured priority.
    pub fn effective_goal<'a>(&'a self, goal: &'a str) -> &'a str {
        let goal = goal.trim();
        if goal.is_empty() {
            self.default_goal.as_str()
        } else {
            goal
        }
    }

    pub fn prompt_for(&self, snapshot: &TelemetrySnapshot, algorithm: &str, goal: &str) -> String {
        let summary = render_summary(
            &self.profile,
            snapshot,
            Some(self.target_temperature_celsius),
        );
        build_prompt(&summary, algorithm, goal)
    }

    /// Ask the model. The outcome is returned as-is; nothing is stored.
    pub async fn generate(
        &self,
        snapshot: &TelemetrySnapshot,
        algorithm: &str,
        goal: &str,
    ) -> Result<String, GenerationError> {
        let prompt = self.prompt_for(snapshot, algorithm, self.effective_goal(goal));
        self.generator.generate(&prompt).await
    }

    /// Generate a recommendation and store it as a new pending record.
    ///
    /// A failed model call is handled by the configured [`FailurePolicy`]:
    /// either a diagnostic is stored as the recommendation text, or nothing
    /// is stored and the failure is returned.
    pub async fn request(
        &self,
        snapshot: &TelemetrySnapshot,
        algorithm: &str,
        goal: &str,
    ) -> Result<RecommendationRecord, AdvisorError> {
        let algorithm = algorithm.trim();
        if algorithm.is_empty() {
            return Err(AdvisorError::MissingAlgorithm);
        }
        let goal = self.effective_goal(goal);

        let text = match self.generate(snapshot, algorithm, goal).await {
            Ok(text) => text,
            Err(e) => match self.policy {
                FailurePolicy::RecordDiagnostic => {
                    warn!("LLM Error: {}", e);
                    diagnostic_message(&e, self.generator.model(), &self.base_url)
                }
                FailurePolicy::Suppress => {
                    warn!("LLM Error (not recorded): {}", e);
                    return Err(e.into());
                }
            },
        };

        let record = self
            .store
            .create_recommendation(&text, snapshot, goal, algorithm)?;
        info!("Recommendation {} created for {}", record.id, algorithm);
        Ok(record)
    }
}

/// User-facing explanation of a failed model call, stored in place of a
/// recommendation under [`FailurePolicy::RecordDiagnostic`].
pub fn diagnostic_message(err: &GenerationError, model: &str, base_url: &str) -> String {
    let hint = match err {
        GenerationError::ModelNotFound(_) => format!(
            "Please ensure the model '{}' is downloaded and available in your Ollama installation. Run `ollama pull {}` in your terminal.",
            model, model
        ),
        _ => format!(
            "Please ensure your Ollama server is running and accessible (e.g., at {}).",
            base_url
        ),
    };
    format!(
        "Error: Could not get recommendations from LLM. Details: {}\n{}",
        err, hint
    )
}
