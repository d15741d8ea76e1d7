use std::fmt;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::amd::AmdGpuTopProbe;
use super::host::SysinfoHost;
use super::snapshot::{CpuMetrics, GpuMetrics, GpuStaticInfo, RamMetrics, TelemetrySnapshot};

/// Abstraction over vendor GPU management layers.
///
/// Implementations acquire whatever vendor handle they need inside each call
/// and release it before returning. A failed sub-reading must come back as
/// `Reading::Unavailable` rather than an error.
pub trait GpuProbe {
    fn static_info(&self) -> GpuStaticInfo;
    fn sample(&self) -> GpuMetrics;
}

/// CPU and RAM counters from the host OS.
pub trait HostProbe {
    fn sample(&mut self) -> (CpuMetrics, RamMetrics);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Unsupported,
}

impl GpuVendor {
    pub fn parse(brand: &str) -> Self {
        match brand.trim().to_ascii_uppercase().as_str() {
            "NVIDIA" => GpuVendor::Nvidia,
            "AMD" => GpuVendor::Amd,
            _ => GpuVendor::Unsupported,
        }
    }
}

impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GpuVendor::Nvidia => "NVIDIA",
            GpuVendor::Amd => "AMD",
            GpuVendor::Unsupported => "Unsupported",
        };
        f.write_str(s)
    }
}

/// Fallback when no vendor backend applies: everything unavailable, no errors.
#[derive(Debug, Default)]
pub struct NullGpuProbe;

impl GpuProbe for NullGpuProbe {
    fn static_info(&self) -> GpuStaticInfo {
        GpuStaticInfo::default()
    }

    fn sample(&self) -> GpuMetrics {
        GpuMetrics::unavailable()
    }
}

/// Static description of the monitored machine, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProfile {
    pub vendor: GpuVendor,
    pub os: String,
    pub gpu: GpuStaticInfo,
}

pub struct SystemMonitor {
    profile: SystemProfile,
    gpu: Box<dyn GpuProbe + Send + Sync>,
    host: Mutex<Box<dyn HostProbe + Send>>,
}

impl SystemMonitor {
    /// Build a monitor for the configured GPU brand with the real backends.
    pub fn for_brand(brand: &str) -> Self {
        let vendor = GpuVendor::parse(brand);
        let host: Box<dyn HostProbe + Send> = Box::new(SysinfoHost::new());
        Self::with_probes(vendor, gpu_probe_for(vendor), host)
    }

    pub fn with_probes(
        vendor: GpuVendor,
        gpu: Box<dyn GpuProbe + Send + Sync>,
        host: Box<dyn HostProbe + Send>,
    ) -> Self {
        let profile = SystemProfile {
            vendor,
            os: host_os_name(),
            gpu: gpu.static_info(),
        };
        info!(
            "System monitor ready: vendor={} model={} driver={}",
            profile.vendor, profile.gpu.model, profile.gpu.driver_version
        );
        Self {
            profile,
            gpu,
            host: Mutex::new(host),
        }
    }

    pub fn profile(&self) -> &SystemProfile {
        &self.profile
    }

    /// Take one snapshot. Never fails; missing readings are marked unavailable.
    pub fn capture(&self) -> TelemetrySnapshot {
        let timestamp = Utc::now();
        let gpu = self.gpu.sample();
        let (cpu, ram) = {
            // A panic in another capture must not stop telemetry for good.
            let mut host = self.host.lock().unwrap_or_else(|e| e.into_inner());
            host.sample()
        };
        debug!("Captured snapshot at {}", timestamp);
        TelemetrySnapshot {
            timestamp,
            gpu,
            cpu,
            ram,
        }
    }
}

fn gpu_probe_for(vendor: GpuVendor) -> Box<dyn GpuProbe + Send + Sync> {
    match vendor {
        GpuVendor::Nvidia => nvidia_probe(),
        GpuVendor::Amd if cfg!(target_os = "linux") => Box::new(AmdGpuTopProbe::default()),
        GpuVendor::Amd => {
            info!("AMD telemetry is only available on Linux via amdgpu_top");
            Box::new(NullGpuProbe)
        }
        GpuVendor::Unsupported => {
            info!("No GPU backend for configured brand; GPU readings will be N/A");
            Box::new(NullGpuProbe)
        }
    }
}

#[cfg(feature = "nvml")]
fn nvidia_probe() -> Box<dyn GpuProbe + Send + Sync> {
    Box::new(super::nvidia::NvmlProbe::default())
}

#[cfg(not(feature = "nvml"))]
fn nvidia_probe() -> Box<dyn GpuProbe + Send + Sync> {
    info!("nvml feature disabled; NVIDIA readings will be N/A");
    Box::new(NullGpuProbe)
}

fn host_os_name() -> String {
    sysinfo::System::name().unwrap_or_else(|| std::env::consts::OS.to_string())
}
