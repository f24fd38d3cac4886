//! Host and process readings via sysinfo
//!
//! Gauges produced on every sample:
//!
//! - `TotalMemory`, `FreeMemory`, `UsedMemory`, `TotalSwap`, `UsedSwap`
//!   (bytes)
//! - `CPUutilization1` .. `CPUutilizationN` (percent, one per logical CPU)
//! - `ProcessMemory`, `ProcessVirtualMemory` (bytes) and `ProcessCpuUsage`
//!   (percent) of the agent itself
//! - `RandomValue`, uniform in `[0, 1)`, fresh on every sample
//!
//! CPU usage is computed between two refreshes, so the first sample reports
//! zero.

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, Pid, ProcessesToUpdate, RefreshKind, System};
use tracing::{instrument, trace, warn};

use super::Sampler;
use crate::metric::Metric;

pub struct RuntimeSampler {
    system: System,
    pid: Option<Pid>,
}

impl RuntimeSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("process metrics unavailable: {e}");
                None
            }
        };

        Self {
            system: System::new_with_specifics(
                RefreshKind::nothing()
                    .with_cpu(CpuRefreshKind::everything())
                    .with_memory(MemoryRefreshKind::everything()),
            ),
            pid,
        }
    }
}

impl Default for RuntimeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RuntimeSampler {
    #[instrument(skip_all)]
    fn sample(&mut self) -> Vec<Metric> {
        let sys = &mut self.system;
        sys.refresh_memory();
        sys.refresh_cpu_usage();

        let mut metrics = vec![
            Metric::gauge("TotalMemory", sys.total_memory() as f64),
            Metric::gauge("FreeMemory", sys.free_memory() as f64),
            Metric::gauge("UsedMemory", sys.used_memory() as f64),
            Metric::gauge("TotalSwap", sys.total_swap() as f64),
            Metric::gauge("UsedSwap", sys.used_swap() as f64),
        ];

        metrics.extend(
            sys.cpus()
                .iter()
                .enumerate()
                .map(|(i, cpu)| {
                    Metric::gauge(format!("CPUutilization{}", i + 1), cpu.cpu_usage().into())
                }),
        );

        metrics.push(Metric::gauge("RandomValue", rand::random::<f64>()));

        if let Some(pid) = self.pid {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

            if let Some(process) = sys.process(pid) {
                metrics.push(Metric::gauge("ProcessMemory", process.memory() as f64));
                metrics.push(Metric::gauge(
                    "ProcessVirtualMemory",
                    process.virtual_memory() as f64,
                ));
                metrics.push(Metric::gauge("ProcessCpuUsage", process.cpu_usage().into()));
            }
        }

        trace!("sampled {} gauges", metrics.len());
        metrics
    }
}
