use std::process::Command;

use serde_json::Value;
use tracing::warn;

use super::snapshot::{GpuMetrics, GpuStaticInfo, Reading};
use super::source::GpuProbe;

const AMDGPU_TOP: &str = "amdgpu_top";

/// AMD backend for Linux. Runs `amdgpu_top --json` once per call and reads
/// the first card.
#[derive(Debug, Default)]
pub struct AmdGpuTopProbe;

impl AmdGpuTopProbe {
    fn first_card(&self) -> Option<Value> {
        let output = match Command::new(AMDGPU_TOP).arg("--json").output() {
            Ok(output) => output,
            Err(e) => {
                warn!("{} not available ({}). Install it for AMD GPU monitoring.", AMDGPU_TOP, e);
                return None;
            }
        };
        if !output.status.success() {
            warn!(
                "{} exited with {}: {}",
                AMDGPU_TOP,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }
        match serde_json::from_slice::<Value>(&output.stdout) {
            Ok(doc) => first_card(&doc).cloned(),
            Err(e) => {
                warn!("Could not parse {} output: {}", AMDGPU_TOP, e);
                None
            }
        }
    }
}

impl GpuProbe for AmdGpuTopProbe {
    fn static_info(&self) -> GpuStaticInfo {
        self.first_card()
            .map(|card| parse_static_info(&card))
            .unwrap_or_default()
    }

    fn sample(&self) -> GpuMetrics {
        self.first_card()
            .map(|card| parse_card_metrics(&card))
            .unwrap_or_else(GpuMetrics::unavailable)
    }
}

pub fn first_card(doc: &Value) -> Option<&Value> {
    doc.get("cards")?.as_array()?.first()
}

pub fn parse_static_info(card: &Value) -> GpuStaticInfo {
    let mut info = GpuStaticInfo::default();
    info.model = card
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("AMD GPU (via amdgpu_top)")
        .to_string();
    if let Some(size) = card.get("vbios").and_then(|v| v.get("vram_size")) {
        info.vram_total_mb = match size {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }
    info.driver_version = "amdgpu (kernel driver)".to_string();
    info
}

pub fn parse_card_metrics(card: &Value) -> GpuMetrics {
    let temp = card.get("temp");
    GpuMetrics {
        temp_celsius: number(temp.and_then(|t| t.get("edge"))),
        hotspot_temp_celsius: number(temp.and_then(|t| t.get("junction"))),
        power_draw_watts: scaled(card.get("power_average"), 1_000.0),
        core_clock_mhz: scaled(card.get("gfx_clk_freq"), 1_000_000.0),
        memory_clock_mhz: scaled(card.get("mem_clk_freq"), 1_000_000.0),
        fan_speed_percent: number(card.get("fan_speed_percent")),
        vram_used_mb: number(card.get("vram_used")),
        ..GpuMetrics::unavailable()
    }
}

fn number(v: Option<&Value>) -> Reading<f64> {
    v.and_then(Value::as_f64).into()
}

fn scaled(v: Option<&Value>, divisor: f64) -> Reading<f64> {
    v.and_then(Value::as_f64).map(|n| n / divisor).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_first_card() {
        let doc = json!({
            "cards": [{
                "name": "Radeon RX 6800",
                "vbios": { "vram_size": 16384 },
                "temp": { "edge": 61.0, "junction": 74.0 },
                "power_average": 182000,
                "gfx_clk_freq": 2_100_000_000u64,
                "mem_clk_freq": 1_000_000_000u64,
                "fan_speed_percent": 48,
                "vram_used": 1200
            }]
        });
        let card = first_card(&doc).unwrap();

        let info = parse_static_info(card);
        assert_eq!(info.model, "Radeon RX 6800");
        assert_eq!(info.vram_total_mb, "16384");

        let m = parse_card_metrics(card);
        assert_eq!(m.temp_celsius, Reading::Available(61.0));
        assert_eq!(m.hotspot_temp_celsius, Reading::Available(74.0));
        assert_eq!(m.power_draw_watts, Reading::Available(182.0));
        assert_eq!(m.core_clock_mhz, Reading::Available(2100.0));
        assert_eq!(m.memory_clock_mhz, Reading::Available(1000.0));
        assert_eq!(m.hash_rate_mhps, Reading::Unavailable);
    }

    #[test]
    fn missing_junction_sensor_leaves_siblings() {
        let card = json!({ "temp": { "edge": 55 }, "power_average": "n/a" });
        let m = parse_card_metrics(&card);
        assert_eq!(m.temp_celsius, Reading::Available(55.0));
        assert_eq!(m.hotspot_temp_celsius, Reading::Unavailable);
        assert_eq!(m.power_draw_watts, Reading::Unavailable);
    }

    #[test]
    fn no_cards_means_no_card() {
        assert!(first_card(&json!({ "cards": [] })).is_none());
        assert!(first_card(&json!({})).is_none());
    }
}
