use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire marker written in place of a value the host could not supply.
pub const UNAVAILABLE_MARKER: &str = "N/A";

/// Placeholder for static descriptors the vendor layer did not report.
pub const UNKNOWN: &str = "Unknown";

/// One hardware reading. A missing sensor is `Unavailable`, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Reading<T> {
    Available(T),
    #[default]
    Unavailable,
}

impl<T> Reading<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Available(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Available(v) => Some(v),
            Reading::Unavailable => None,
        }
    }
}

impl<T: Copy> Reading<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

impl<T> From<Option<T>> for Reading<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Reading::Available(v),
            None => Reading::Unavailable,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Reading<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Available(v) => write!(f, "{}", v),
            Reading::Unavailable => f.write_str(UNAVAILABLE_MARKER),
        }
    }
}

impl<T: Serialize> Serialize for Reading<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Available(v) => v.serialize(serializer),
            Reading::Unavailable => serializer.serialize_str(UNAVAILABLE_MARKER),
        }
    }
}

// Older files carry annotated markers ("N/A (Not Supported)"), so any string
// reads back as unavailable.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReadingRepr<T> {
    Value(T),
    Marker(String),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Reading<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<ReadingRepr<T>>::deserialize(deserializer)? {
            Some(ReadingRepr::Value(v)) => Ok(Reading::Available(v)),
            Some(ReadingRepr::Marker(_)) | None => Ok(Reading::Unavailable),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GpuMetrics {
    #[serde(default)]
    pub temp_celsius: Reading<f64>,
    #[serde(default)]
    pub hotspot_temp_celsius: Reading<f64>,
    #[serde(default)]
    pub power_draw_watts: Reading<f64>,
    #[serde(default)]
    pub core_clock_mhz: Reading<f64>,
    #[serde(default)]
    pub memory_clock_mhz: Reading<f64>,
    #[serde(default)]
    pub fan_speed_percent: Reading<f64>,
    #[serde(default)]
    pub vram_used_mb: Reading<f64>,
    /// Never produced by sensors; filled from miner output or user input.
    #[serde(default)]
    pub hash_rate_mhps: Reading<f64>,
    /// Joules per megahash, derived from power draw and hash rate.
    #[serde(default)]
    pub efficiency_jpmh: Reading<f64>,
}

impl GpuMetrics {
    /// All readings unavailable. Used when no GPU backend applies.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Attach a hash rate and recompute efficiency.
    pub fn with_hash_rate(mut self, mhps: f64) -> Self {
        self.hash_rate_mhps = Reading::Available(mhps);
        self.efficiency_jpmh = derive_efficiency(self.power_draw_watts, self.hash_rate_mhps);
        self
    }
}

pub fn derive_efficiency(power: Reading<f64>, hash_rate: Reading<f64>) -> Reading<f64> {
    match (power, hash_rate) {
        (Reading::Available(w), Reading::Available(h)) if h > 0.0 => {
            Reading::Available(round2(w / h))
        }
        _ => Reading::Unavailable,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuMetrics {
    #[serde(default)]
    pub temperature_celsius: Reading<f64>,
    #[serde(default)]
    pub usage_percent: Reading<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RamMetrics {
    #[serde(default)]
    pub total_gb: Reading<f64>,
    #[serde(default)]
    pub used_gb: Reading<f64>,
    #[serde(default)]
    pub usage_percent: Reading<f64>,
}

/// Point-in-time hardware readings. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub timestamp: DateTime<Utc>,
    pub gpu: GpuMetrics,
    pub cpu: CpuMetrics,
    pub ram: RamMetrics,
}

/// Descriptors fetched once per monitor; `"Unknown"` when unreported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuStaticInfo {
    pub model: String,
    pub vram_total_mb: String,
    pub driver_version: String,
}

impl Default for GpuStaticInfo {
    fn default() -> Self {
        Self {
            model: UNKNOWN.to_string(),
            vram_total_mb: UNKNOWN.to_string(),
            driver_version: UNKNOWN.to_string(),
        }
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
