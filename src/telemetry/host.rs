use sysinfo::{Components, System};

use super::snapshot::{round2, CpuMetrics, RamMetrics, Reading};
use super::source::HostProbe;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Sensor drivers that report the CPU package temperature, in preference order.
const CPU_SENSOR_DRIVERS: [&str; 3] = ["coretemp", "k10temp", "cpu_thermal"];

/// CPU and RAM via sysinfo. CPU usage is the delta since the previous call.
pub struct SysinfoHost {
    system: System,
}

impl SysinfoHost {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the counters so the first sample has a baseline.
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoHost {
    fn sample(&mut self) -> (CpuMetrics, RamMetrics) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu = CpuMetrics {
            temperature_celsius: cpu_temperature(),
            usage_percent: Reading::Available(round2(f64::from(self.system.global_cpu_usage()))),
        };

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let ram = if total == 0 {
            RamMetrics::default()
        } else {
            RamMetrics {
                total_gb: Reading::Available(round2(total as f64 / BYTES_PER_GB)),
                used_gb: Reading::Available(round2(used as f64 / BYTES_PER_GB)),
                usage_percent: Reading::Available(round2(used as f64 / total as f64 * 100.0)),
            }
        };

        (cpu, ram)
    }
}

fn cpu_temperature() -> Reading<f64> {
    let components = Components::new_with_refreshed_list();
    let labelled: Vec<(String, Option<f32>)> = components
        .list()
        .iter()
        .map(|c| (c.label().to_ascii_lowercase(), c.temperature()))
        .collect();
    pick_cpu_temperature(&labelled)
}

/// First reading from a known CPU sensor driver, honouring driver preference.
pub fn pick_cpu_temperature(components: &[(String, Option<f32>)]) -> Reading<f64> {
    CPU_SENSOR_DRIVERS
        .iter()
        .find_map(|driver| {
            components
                .iter()
                .filter(|(label, _)| label.contains(driver))
                .find_map(|(_, temp)| *temp)
        })
        .map(f64::from)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_coretemp_over_k10temp() {
        let comps = vec![
            ("k10temp tctl".to_string(), Some(50.0)),
            ("coretemp package id 0".to_string(), Some(42.0)),
        ];
        assert_eq!(pick_cpu_temperature(&comps), Reading::Available(42.0));
    }

    #[test]
    fn no_known_sensor_is_unavailable() {
        let comps = vec![("nvme composite".to_string(), Some(38.0))];
        assert_eq!(pick_cpu_temperature(&comps), Reading::Unavailable);
    }
}
