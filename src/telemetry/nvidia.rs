use nvml_wrapper::enum_wrappers::device::{Clock, TemperatureSensor};
use nvml_wrapper::Nvml;
use tracing::warn;

use super::snapshot::{GpuMetrics, GpuStaticInfo, Reading};
use super::source::GpuProbe;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// NVIDIA backend. NVML is initialised per call and shut down when the
/// `Nvml` value drops at the end of it; no handle outlives a call.
#[derive(Debug, Default)]
pub struct NvmlProbe {
    /// Device index; the first GPU unless configured otherwise.
    pub index: u32,
}

impl GpuProbe for NvmlProbe {
    fn static_info(&self) -> GpuStaticInfo {
        let mut info = GpuStaticInfo::default();
        let nvml = match Nvml::init() {
            Ok(nvml) => nvml,
            Err(e) => {
                warn!("NVML static info unavailable: {}. Check NVIDIA driver installation.", e);
                return info;
            }
        };
        if let Ok(version) = nvml.sys_driver_version() {
            info.driver_version = version;
        }
        match nvml.device_by_index(self.index) {
            Ok(device) => {
                if let Ok(name) = device.name() {
                    info.model = name;
                }
                if let Ok(mem) = device.memory_info() {
                    info.vram_total_mb = (mem.total / BYTES_PER_MB).to_string();
                }
            }
            Err(e) => warn!("NVML device {} unavailable: {}", self.index, e),
        }
        info
    }

    fn sample(&self) -> GpuMetrics {
        let mut metrics = GpuMetrics::unavailable();
        let nvml = match Nvml::init() {
            Ok(nvml) => nvml,
            Err(e) => {
                warn!("NVML runtime error: {}. Check if NVIDIA driver is loaded.", e);
                return metrics;
            }
        };
        let device = match nvml.device_by_index(self.index) {
            Ok(device) => device,
            Err(e) => {
                warn!("NVML device {} unavailable: {}", self.index, e);
                return metrics;
            }
        };

        metrics.temp_celsius = device
            .temperature(TemperatureSensor::Gpu)
            .map(f64::from)
            .ok()
            .into();
        // NVML exposes no hotspot sensor.
        metrics.hotspot_temp_celsius = Reading::Unavailable;
        metrics.power_draw_watts = device
            .power_usage()
            .map(|mw| f64::from(mw) / 1000.0)
            .ok()
            .into();
        metrics.core_clock_mhz = device.clock_info(Clock::Graphics).map(f64::from).ok().into();
        metrics.memory_clock_mhz = device.clock_info(Clock::Memory).map(f64::from).ok().into();
        metrics.fan_speed_percent = device.fan_speed(0).map(f64::from).ok().into();
        metrics.vram_used_mb = device
            .memory_info()
            .map(|mem| (mem.used / BYTES_PER_MB) as f64)
            .ok()
            .into();

        metrics
    }
}
