use super::snapshot::TelemetrySnapshot;
use super::source::SystemProfile;

/// Human-readable system summary, shared by the prompt and the console.
pub fn render_summary(
    profile: &SystemProfile,
    snapshot: &TelemetrySnapshot,
    target_temperature_celsius: Option<f64>,
) -> String {
    let gpu = &snapshot.gpu;
    let cpu = &snapshot.cpu;
    let ram = &snapshot.ram;
    let info = &profile.gpu;

    let mining = if gpu.hash_rate_mhps.is_available() {
        format!(
            "  Hash Rate: {} MH/s\n  Efficiency: {} J/MH\n",
            gpu.hash_rate_mhps, gpu.efficiency_jpmh
        )
    } else {
        String::new()
    };
    let target = target_temperature_celsius
        .map(|t| format!("  Target Temperature: {}°C\n", t))
        .unwrap_or_default();

    format!(
        "System Summary ({timestamp}):
---
GPU (Brand: {vendor}):
  Model: {model}
  Driver Version: {driver}
  Total VRAM: {vram_total} MB
  Current Temp: {temp}°C
  Current Hot Spot Temp: {hotspot}°C
  Current Power Draw: {power}W
  Current Core Clock: {core}MHz
  Current Memory Clock: {mem}MHz
  Current Fan Speed: {fan}%
  Current VRAM Used: {vram_used} MB
{mining}{target}
CPU:
  Temperature: {cpu_temp}°C
  Usage: {cpu_usage}%

RAM:
  Total: {ram_total} GB
  Used: {ram_used} GB ({ram_pct}%)

Operating System: {os}
",
        timestamp = snapshot.timestamp.to_rfc3339(),
        vendor = profile.vendor,
        model = info.model,
        driver = info.driver_version,
        vram_total = info.vram_total_mb,
        temp = gpu.temp_celsius,
        hotspot = gpu.hotspot_temp_celsius,
        power = gpu.power_draw_watts,
        core = gpu.core_clock_mhz,
        mem = gpu.memory_clock_mhz,
        fan = gpu.fan_speed_percent,
        vram_used = gpu.vram_used_mb,
        cpu_temp = cpu.temperature_celsius,
        cpu_usage = cpu.usage_percent,
        ram_total = ram.total_gb,
        ram_used = ram.used_gb,
        ram_pct = ram.usage_percent,
        os = profile.os,
    )
}
