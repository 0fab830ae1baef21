use std::time::Instant;
use sysinfo::{Pid, System};

/// 採集過程的資源監控，--monitor 啟用
pub struct RunMonitor {
    system: System,
    pid: Pid,
    started: Instant,
    peak_memory_mb: u64,
    enabled: bool,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        let pid = sysinfo::get_current_pid().expect("Failed to get current PID");

        Self {
            system,
            pid,
            started: Instant::now(),
            peak_memory_mb: 0,
            enabled,
        }
    }

    fn sample(&mut self) -> Option<(f32, u64)> {
        if !self.enabled {
            return None;
        }

        self.system.refresh_all();
        let process = self.system.process(self.pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        if memory_mb > self.peak_memory_mb {
            self.peak_memory_mb = memory_mb;
        }

        Some((process.cpu_usage(), memory_mb))
    }

    pub fn log_phase(&mut self, phase: &str) {
        if let Some((cpu, memory_mb)) = self.sample() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Elapsed: {:?}",
                phase,
                cpu,
                memory_mb,
                self.peak_memory_mb,
                self.started.elapsed()
            );
        }
    }

    pub fn log_final(&mut self) {
        if self.sample().is_some() {
            tracing::info!(
                "📊 Run finished - Total time: {:?}, Peak memory: {}MB",
                self.started.elapsed(),
                self.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
