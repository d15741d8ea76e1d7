use serde_json::Value;

use crate::store::JsonMap;
use crate::telemetry::{derive_efficiency, GpuMetrics, Reading};

/// Build the `actual_performance_after_apply` mapping from what the user
/// reported and the GPU readings taken right after.
///
/// User-entered hash rate and power take precedence over live readings.
/// Returns an empty map when the user reported neither.
pub fn outcome_metrics(
    live_gpu: &GpuMetrics,
    hash_rate_mhps: Option<f64>,
    power_draw_watts: Option<f64>,
) -> JsonMap {
    if hash_rate_mhps.is_none() && power_draw_watts.is_none() {
        return JsonMap::new();
    }

    let mut gpu = live_gpu.clone();
    if let Some(watts) = power_draw_watts {
        gpu.power_draw_watts = Reading::Available(watts);
    }
    if let Some(mhps) = hash_rate_mhps {
        gpu.hash_rate_mhps = Reading::Available(mhps);
    }
    gpu.efficiency_jpmh = derive_efficiency(gpu.power_draw_watts, gpu.hash_rate_mhps);

    let mut out = JsonMap::new();
    // GpuMetrics always serializes to an object.
    if let Ok(value) = serde_json::to_value(&gpu) {
        out.insert("gpu".to_string(), value);
    }
    out
}

/// Hash rate recorded in an outcome mapping, if any.
pub fn reported_hash_rate(outcome: &JsonMap) -> Option<f64> {
    outcome
        .get("gpu")
        .and_then(|gpu| gpu.get("hash_rate_mhps"))
        .and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_values_override_live_readings() {
        let live = GpuMetrics {
            temp_celsius: Reading::Available(68.0),
            power_draw_watts: Reading::Available(130.0),
            ..GpuMetrics::unavailable()
        };
        let out = outcome_metrics(&live, Some(60.0), Some(120.0));
        let gpu = &out["gpu"];
        assert_eq!(gpu["hash_rate_mhps"], 60.0);
        assert_eq!(gpu["power_draw_watts"], 120.0);
        assert_eq!(gpu["temp_celsius"], 68.0);
        assert_eq!(gpu["efficiency_jpmh"], 2.0);
        assert_eq!(reported_hash_rate(&out), Some(60.0));
    }

    #[test]
    fn nothing_reported_is_empty() {
        assert!(outcome_metrics(&GpuMetrics::unavailable(), None, None).is_empty());
    }
}
