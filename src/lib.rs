pub mod advisor;
pub mod config;
pub mod console;
pub mod kernel;
pub mod services;
pub mod store;
pub mod telemetry;

// Re-export specific items for convenient access
pub use advisor::RecommendationOrchestrator;
pub use config::AppConfig;
pub use store::RecordStore;
pub use telemetry::SystemMonitor;
