use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use ocadvisor::advisor::{
    outcome_metrics, reported_hash_rate, AdvisorError, RecommendationOrchestrator,
};
use ocadvisor::config::AppConfig;
use ocadvisor::console::{Command, GUIDE, HELP};
use ocadvisor::kernel::{capture_foreground, dispatch_request, MetricsPoller};
use ocadvisor::services::llm::OllamaClient;
use ocadvisor::store::{JsonMap, RecommendationRecord, RecordStore};
use ocadvisor::telemetry::{render_summary, SystemMonitor, TelemetrySnapshot};

const SAFETY_WARNING: &str = "\
WARNING: Overclocking can cause instability, data loss and hardware damage.
Recommendations come from a language model and may be wrong. Apply changes
incrementally, monitor temperatures, and revert anything that is unstable.";

// Results from request tasks (never touch the store directly)
enum DriverEvent {
    Completed {
        request_id: Uuid,
        algorithm: String,
        result: Result<RecommendationRecord, AdvisorError>,
    },
    Crashed {
        request_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config_path = AppConfig::path_from_env();
    let config = match AppConfig::load_or_create(&config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("[ERROR] {}. Falling back to default settings.", e);
            AppConfig::default()
        }
    };

    let store = Arc::new(
        RecordStore::open(&config.app_data_dir).context("opening the data directory")?,
    );
    let monitor = Arc::new(SystemMonitor::for_brand(&config.gpu_brand));
    let client = OllamaClient::new(
        &config.ollama_base_url,
        &config.llm_model_name,
        config.sampling.clone(),
    );
    let orchestrator = Arc::new(RecommendationOrchestrator::new(
        client,
        store.clone(),
        monitor.profile().clone(),
        &config,
    ));

    let poller = MetricsPoller::spawn(monitor.clone(), store.clone(), config.polling_interval())
        .context("starting the metrics poller")?;

    println!("{}\n", SAFETY_WARNING);
    println!("{}", HELP);

    let (driver_tx, mut driver_rx) = mpsc::channel::<DriverEvent>(16);
    let mut in_flight: HashMap<Uuid, String> = HashMap::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read input: {}", e);
                        break;
                    }
                };
                let cmd = match Command::parse(&line) {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("[ERROR] {}", e);
                        continue;
                    }
                };

                match cmd {
                    Command::Quit => break,
                    Command::Help => println!("{}", HELP),
                    Command::Guide => println!("{}", GUIDE),
                    Command::Snapshot => {
                        let Some(snapshot) = capture(&monitor).await else { continue };
                        println!(
                            "{}",
                            render_summary(
                                monitor.profile(),
                                &snapshot,
                                Some(config.target_temperature_celsius)
                            )
                        );
                    }
                    Command::Recommend { algorithm, goal } => {
                        let Some(snapshot) = capture(&monitor).await else { continue };
                        let pending = dispatch_request(orchestrator.clone(), snapshot, algorithm, goal);
                        println!(
                            "Generating recommendation for {}... this may take a few moments.",
                            pending.algorithm
                        );
                        in_flight.insert(pending.request_id, pending.algorithm.clone());

                        let tx = driver_tx.clone();
                        tokio::spawn(async move {
                            let event = match pending.handle.await {
                                Ok(result) => DriverEvent::Completed {
                                    request_id: pending.request_id,
                                    algorithm: pending.algorithm,
                                    result,
                                },
                                Err(_) => DriverEvent::Crashed { request_id: pending.request_id },
                            };
                            let _ = tx.send(event).await;
                        });
                    }
                    Command::List => match store.list_recommendations() {
                        Ok(records) if records.is_empty() => println!("No recommendations yet."),
                        Ok(records) => {
                            for rec in records {
                                println!(
                                    "{:<20} {:<20} {:<12} {}",
                                    rec.id,
                                    rec.timestamp.format("%Y-%m-%d %H:%M:%S"),
                                    rec.mining_algorithm,
                                    rec.applied_status
                                );
                            }
                        }
                        Err(e) => println!("[ERROR] {}", e),
                    },
                    Command::Show(id) => match store.get_recommendation(&id) {
                        Ok(rec) => print_record(&rec),
                        Err(e) => println!("[ERROR] {}", e),
                    },
                    Command::Update { id, status, hash_rate_mhps, power_draw_watts, notes } => {
                        let actual = if hash_rate_mhps.is_some() || power_draw_watts.is_some() {
                            let Some(live) = capture(&monitor).await else { continue };
                            outcome_metrics(&live.gpu, hash_rate_mhps, power_draw_watts)
                        } else {
                            JsonMap::new()
                        };
                        match store.update_recommendation(&id, status, Some(actual), Some(&notes)) {
                            Ok(rec) => println!("Recommendation {} status changed to {}.", rec.id, rec.applied_status),
                            Err(e) => println!("[ERROR] {}", e),
                        }
                    }
                    Command::History(n) => match store.read_metrics_log() {
                        Ok(entries) => {
                            let skip = entries.len().saturating_sub(n);
                            for entry in entries.iter().skip(skip) {
                                let gpu = &entry.metrics.gpu;
                                println!(
                                    "{}  GPU {}°C {}W  CPU {}%  RAM {}%",
                                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                                    gpu.temp_celsius,
                                    gpu.power_draw_watts,
                                    entry.metrics.cpu.usage_percent,
                                    entry.metrics.ram.usage_percent
                                );
                            }
                        }
                        Err(e) => println!("[ERROR] {}", e),
                    },
                    Command::KbAdd(text) => {
                        let mut source = JsonMap::new();
                        source.insert("source".to_string(), "console".into());
                        match store.add_knowledge_chunk(&text, source) {
                            Ok(_) => println!("Knowledge note saved."),
                            Err(e) => println!("[ERROR] {}", e),
                        }
                    }
                    Command::KbList => match store.list_knowledge_chunks() {
                        Ok(chunks) => {
                            for chunk in chunks {
                                let source = chunk
                                    .source
                                    .get("source")
                                    .and_then(|v| v.as_str())
                                    .unwrap_or("N/A");
                                println!("- {} (Source: {})", chunk.content, source);
                            }
                        }
                        Err(e) => println!("[ERROR] {}", e),
                    },
                }
            }
            Some(event) = driver_rx.recv() => match event {
                DriverEvent::Completed { request_id, algorithm, result } => {
                    in_flight.remove(&request_id);
                    match result {
                        Ok(rec) => {
                            println!("\n--- Recommendation {} ({}) ---", rec.id, algorithm);
                            println!("{}", rec.llm_recommendation_text);
                            println!("Recommendation generated and saved. ID: {}", rec.id);
                        }
                        Err(e) => println!("[ERROR] {}", e),
                    }
                }
                DriverEvent::Crashed { request_id } => {
                    in_flight.remove(&request_id);
                    println!("[ERROR] recommendation request {} crashed", request_id);
                }
            },
        }
    }

    if !in_flight.is_empty() {
        tracing::info!("Abandoning {} in-flight recommendation request(s)", in_flight.len());
    }
    tokio::task::spawn_blocking(move || poller.shutdown())
        .await
        .context("stopping the metrics poller")?;
    Ok(())
}

async fn capture(monitor: &Arc<SystemMonitor>) -> Option<TelemetrySnapshot> {
    let snapshot = capture_foreground(monitor.clone()).await;
    if snapshot.is_none() {
        println!("[ERROR] telemetry capture failed; command dropped.");
    }
    snapshot
}

fn print_record(rec: &RecommendationRecord) {
    println!("ID: {}", rec.id);
    println!("Created: {}", rec.timestamp.to_rfc3339());
    println!("Algorithm: {}", rec.mining_algorithm);
    println!("Goal: {}", rec.user_goal);
    println!("Status: {}", rec.applied_status);
    if let Some(updated) = rec.last_updated {
        println!("Last updated: {}", updated.to_rfc3339());
    }
    if let Some(notes) = &rec.user_notes {
        println!("Notes: {}", notes);
    }
    if let Some(mhps) = reported_hash_rate(&rec.actual_performance_after_apply) {
        println!("Reported hash rate: {} MH/s", mhps);
    }
    if !rec.actual_performance_after_apply.is_empty() {
        println!(
            "Actual performance: {}",
            serde_json::to_string_pretty(&rec.actual_performance_after_apply).unwrap_or_default()
        );
    }
    println!("\n{}", rec.llm_recommendation_text);
}
