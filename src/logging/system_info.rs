//! Host facts for the `system` channel
//!
//! The manager only formats and emits; gathering is delegated to a
//! [`SystemProbe`]. [`HostProbe`] reads `/proc` and `statvfs` on Linux and
//! reports "unknown" for anything it cannot determine elsewhere.

use std::time::Duration;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Memory usage in bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
}

impl MemoryUsage {
    pub fn percent(&self) -> f64 {
        percent(self.used, self.total)
    }
}

/// Usage of one mounted filesystem
#[derive(Debug, Clone, PartialEq)]
pub struct DiskUsage {
    pub mount_point: String,
    pub used: u64,
    /// Bytes available to unprivileged users
    pub available: u64,
    pub total: u64,
}

impl DiskUsage {
    /// Used share of the space visible to unprivileged users
    pub fn percent(&self) -> f64 {
        percent(self.used, self.used + self.available)
    }
}

/// One reading of the host
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemSnapshot {
    pub os_name: String,
    pub os_release: String,
    pub runtime: String,
    pub processor: String,
    pub memory: Option<MemoryUsage>,
    pub disks: Vec<DiskUsage>,
    pub cpu_percent: Option<f64>,
}

impl SystemSnapshot {
    /// Lines emitted on the `system` channel, one fact per line
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("System: {} {}", self.os_name, self.os_release),
            format!("Runtime: {}", self.runtime),
            format!("Processor: {}", self.processor),
        ];

        match self.memory {
            Some(memory) => lines.push(format!(
                "Memory: {:.1}% used ({:.1} GB / {:.1} GB)",
                memory.percent(),
                memory.used as f64 / BYTES_PER_GB,
                memory.total as f64 / BYTES_PER_GB
            )),
            None => lines.push("Memory: unknown".to_string()),
        }

        for disk in &self.disks {
            lines.push(format!(
                "Disk {}: {:.1}% used ({:.1} GB / {:.1} GB)",
                disk.mount_point,
                disk.percent(),
                disk.used as f64 / BYTES_PER_GB,
                disk.total as f64 / BYTES_PER_GB
            ));
        }

        match self.cpu_percent {
            Some(cpu) => lines.push(format!("CPU: {:.1}% used", cpu)),
            None => lines.push("CPU: unknown".to_string()),
        }

        lines
    }
}

/// Source of host metrics
pub trait SystemProbe: Send + Sync {
    fn snapshot(&self) -> SystemSnapshot;
}

/// Probe reading the local host
#[derive(Debug, Clone)]
pub struct HostProbe {
    /// Window over which CPU utilization is sampled
    pub cpu_sample: Duration,
}

impl Default for HostProbe {
    fn default() -> Self {
        Self {
            cpu_sample: Duration::from_millis(100),
        }
    }
}

impl SystemProbe for HostProbe {
    fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            os_name: os_name().to_string(),
            os_release: os_release(),
            runtime: runtime_version(),
            processor: processor(),
            memory: memory_usage(),
            disks: disk_usage(),
            cpu_percent: cpu_percent(self.cpu_sample),
        }
    }
}

/// Crate version plus the compiler it was built with, e.g.
/// `drivelog 0.1.0 (rustc 1.79.0 (129f3b996 2024-06-10))`
fn runtime_version() -> String {
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("DRIVELOG_RUSTC_VERSION")
    )
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}

fn os_release() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(release) = std::fs::read_to_string("/proc/sys/kernel/osrelease") {
            return release.trim().to_string();
        }
    }
    "unknown".to_string()
}

fn processor() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
            if let Some(model) = parse_cpu_model(&cpuinfo) {
                return model;
            }
        }
    }
    std::env::consts::ARCH.to_string()
}

/// First `model name` (x86) or `Model` (ARM boards) entry of /proc/cpuinfo
fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| matches!(key.trim(), "model name" | "Model" | "Hardware"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn memory_usage() -> Option<MemoryUsage> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") {
            return parse_meminfo(&meminfo);
        }
    }
    None
}

/// Used = total - available, both from /proc/meminfo (values in kB)
fn parse_meminfo(meminfo: &str) -> Option<MemoryUsage> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|line| line.starts_with(name))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<u64>().ok())
            .map(|kb| kb * 1024)
    };

    let total = field("MemTotal:")?;
    let available = field("MemAvailable:").or_else(|| field("MemFree:"))?;
    Some(MemoryUsage {
        used: total.saturating_sub(available),
        total,
    })
}

/// Aggregate CPU counters from the first line of /proc/stat: (busy, total)
fn parse_cpu_times(stat: &str) -> Option<(u64, u64)> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|v| v.parse().ok())
        .collect();
    if values.len() < 4 {
        return None;
    }
    let total: u64 = values.iter().sum();
    // idle + iowait
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some((total - idle, total))
}

#[cfg(target_os = "linux")]
fn cpu_percent(sample: Duration) -> Option<f64> {
    let read = || {
        std::fs::read_to_string("/proc/stat")
            .ok()
            .and_then(|s| parse_cpu_times(&s))
    };
    let (busy_before, total_before) = read()?;
    std::thread::sleep(sample);
    let (busy_after, total_after) = read()?;
    let total = total_after.saturating_sub(total_before);
    Some(percent(busy_after.saturating_sub(busy_before), total))
}

#[cfg(not(target_os = "linux"))]
fn cpu_percent(_sample: Duration) -> Option<f64> {
    None
}

/// Mount points backed by block devices, from /proc/mounts
fn parse_mounts(mounts: &str) -> Vec<String> {
    let mut points: Vec<String> = Vec::new();
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let (Some(device), Some(raw_mount)) = (fields.next(), fields.next()) else {
            continue;
        };
        // /proc/mounts escapes spaces as \040
        let mount_point = raw_mount.replace("\\040", " ");
        if device.starts_with("/dev/") && !points.contains(&mount_point) {
            points.push(mount_point);
        }
    }
    points
}

fn disk_usage() -> Vec<DiskUsage> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(mounts) = std::fs::read_to_string("/proc/mounts") {
            return parse_mounts(&mounts)
                .into_iter()
                .filter_map(|mount| statvfs_usage(&mount))
                .collect();
        }
    }
    Vec::new()
}

#[cfg(unix)]
fn statvfs_usage(mount_point: &str) -> Option<DiskUsage> {
    let path = std::ffi::CString::new(mount_point).ok()?;
    // SAFETY: statvfs only writes into the zeroed struct we own
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stat) };
    if rc != 0 {
        return None;
    }

    let block = stat.f_frsize as u64;
    let total = stat.f_blocks as u64 * block;
    let free = stat.f_bfree as u64 * block;
    let available = stat.f_bavail as u64 * block;
    Some(DiskUsage {
        mount_point: mount_point.to_string(),
        used: total.saturating_sub(free),
        available,
        total,
    })
}

#[cfg(not(unix))]
fn statvfs_usage(_mount_point: &str) -> Option<DiskUsage> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       16384000 kB\nMemFree:         1000000 kB\nMemAvailable:    4096000 kB\n";
        let memory = parse_meminfo(meminfo).unwrap();
        assert_eq!(memory.total, 16_384_000 * 1024);
        assert_eq!(memory.used, (16_384_000 - 4_096_000) * 1024);
        assert!((memory.percent() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 10 kB\n").is_none());
    }

    #[test]
    fn test_parse_cpu_times() {
        let stat = "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0 0 0\n";
        let (busy, total) = parse_cpu_times(stat).unwrap();
        assert_eq!(total, 1000);
        assert_eq!(busy, 200);
    }

    #[test]
    fn test_parse_mounts_keeps_block_devices() {
        let mounts = "proc /proc proc rw 0 0\n/dev/nvme0n1p2 / ext4 rw 0 0\n/dev/sda1 /mnt/usb\\040drive vfat rw 0 0\ntmpfs /run tmpfs rw 0 0\n";
        assert_eq!(parse_mounts(mounts), vec!["/", "/mnt/usb drive"]);
    }

    #[test]
    fn test_parse_cpu_model() {
        let cpuinfo = "processor\t: 0\nmodel name\t: ARMv8 Processor rev 1 (v8l)\n";
        assert_eq!(
            parse_cpu_model(cpuinfo).as_deref(),
            Some("ARMv8 Processor rev 1 (v8l)")
        );
        assert!(parse_cpu_model("processor\t: 0\n").is_none());
    }

    #[test]
    fn test_snapshot_lines() {
        let snapshot = SystemSnapshot {
            os_name: "Linux".to_string(),
            os_release: "5.10.120-tegra".to_string(),
            runtime: "drivelog 0.1.0 (rustc 1.79.0)".to_string(),
            processor: "ARMv8 Processor rev 1 (v8l)".to_string(),
            memory: Some(MemoryUsage {
                used: 2 * 1024 * 1024 * 1024,
                total: 8 * 1024 * 1024 * 1024,
            }),
            disks: vec![DiskUsage {
                mount_point: "/".to_string(),
                used: 30 * 1024 * 1024 * 1024,
                available: 70 * 1024 * 1024 * 1024,
                total: 100 * 1024 * 1024 * 1024,
            }],
            cpu_percent: Some(12.5),
        };

        assert_eq!(
            snapshot.lines(),
            vec![
                "System: Linux 5.10.120-tegra",
                "Runtime: drivelog 0.1.0 (rustc 1.79.0)",
                "Processor: ARMv8 Processor rev 1 (v8l)",
                "Memory: 25.0% used (2.0 GB / 8.0 GB)",
                "Disk /: 30.0% used (30.0 GB / 100.0 GB)",
                "CPU: 12.5% used",
            ]
        );
    }

    #[test]
    fn test_host_snapshot_does_not_panic() {
        let host = HostProbe {
            cpu_sample: Duration::from_millis(10),
        };
        let snapshot = host.snapshot();
        assert!(!snapshot.os_name.is_empty());
        assert!(!snapshot.runtime.contains("unknown"));
        assert!(snapshot.runtime.contains("(rustc "));
        assert!(snapshot.runtime.starts_with(&format!("drivelog {}", env!("CARGO_PKG_VERSION"))));
        assert!(!snapshot.lines().is_empty());
    }
}
