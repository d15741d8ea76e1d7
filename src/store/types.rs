use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::telemetry::TelemetrySnapshot;

/// Free-form JSON object used for context and reported outcomes.
pub type JsonMap = Map<String, Value>;

/// One line of the append-only metrics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsLogEntry {
    pub timestamp: DateTime<Utc>,
    pub metrics: TelemetrySnapshot,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: JsonMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    PendingUserApply,
    Applied,
    Failed,
    Reverted,
    Cancelled,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::PendingUserApply => "PENDING_USER_APPLY",
            RecommendationStatus::Applied => "APPLIED",
            RecommendationStatus::Failed => "FAILED",
            RecommendationStatus::Reverted => "REVERTED",
            RecommendationStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses a user may report after reviewing a recommendation.
    pub fn outcomes() -> [RecommendationStatus; 4] {
        [
            RecommendationStatus::Applied,
            RecommendationStatus::Failed,
            RecommendationStatus::Reverted,
            RecommendationStatus::Cancelled,
        ]
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status '{0}' (expected APPLIED, FAILED, REVERTED or CANCELLED)")]
pub struct UnknownStatus(pub String);

impl FromStr for RecommendationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING_USER_APPLY" | "PENDING" => Ok(RecommendationStatus::PendingUserApply),
            "APPLIED" => Ok(RecommendationStatus::Applied),
            "FAILED" => Ok(RecommendationStatus::Failed),
            "REVERTED" => Ok(RecommendationStatus::Reverted),
            "CANCELLED" | "CANCELED" => Ok(RecommendationStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// A persisted recommendation and its user-reported outcome.
///
/// Field names match the on-disk JSON keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    pub user_goal: String,
    pub mining_algorithm: String,
    pub system_snapshot_at_recommendation: TelemetrySnapshot,
    pub llm_recommendation_text: String,
    pub applied_status: RecommendationStatus,
    #[serde(default)]
    pub actual_performance_after_apply: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Auxiliary document kept for future retrieval use. Write and list only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub content: String,
    #[serde(default)]
    pub source: JsonMap,
    pub timestamp: DateTime<Utc>,
}
