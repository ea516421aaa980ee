//! Shared sysinfo handle
//!
//! One `System` for every sysinfo-backed sensor. Sensors are shared across
//! threads, so the handle lives behind a mutex and each reading refreshes
//! only the subsystem it needs.

use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

static SHARED_SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| {
    log::info!("Creating shared sysinfo::System instance");
    Mutex::new(System::new())
});

fn lock() -> MutexGuard<'static, System> {
    // A poisoned lock only means a reading panicked; the handle is still usable
    SHARED_SYSTEM.lock().unwrap_or_else(|poisoned| {
        log::warn!("Shared sysinfo mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Used and total amount of a memory pool, in bytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Usage {
    pub used: u64,
    pub total: u64,
}

impl Usage {
    /// Percent used, rounded to one decimal; 0 for an empty pool
    pub fn percent(&self) -> f64 {
        percent(self.used, self.total)
    }
}

pub fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 1000.0).round() / 10.0
}

pub fn memory() -> Usage {
    let mut system = lock();
    system.refresh_memory();
    Usage {
        used: system.used_memory(),
        total: system.total_memory(),
    }
}

pub fn swap() -> Usage {
    let mut system = lock();
    system.refresh_memory();
    Usage {
        used: system.used_swap(),
        total: system.total_swap(),
    }
}

/// Global CPU usage in percent.
///
/// sysinfo computes usage from the delta between two refreshes, so this
/// blocks for the minimum update interval.
pub fn cpu_usage() -> f32 {
    let mut system = lock();
    system.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_cpu_usage();
    system.global_cpu_usage()
}

/// Kill `root` and every process below it, deepest first.
///
/// `sh -c` forks its commands, so killing only the shell would leave them
/// running with the output pipes still open. Returns how many processes
/// were signalled.
pub fn kill_process_tree(root: u32) -> usize {
    // A private handle; the process table is large and only needed here
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::new());

    let mut tree = vec![Pid::from_u32(root)];
    let mut next = 0;
    while next < tree.len() {
        let parent = tree[next];
        let children: Vec<Pid> = system
            .processes()
            .iter()
            .filter(|(pid, process)| process.parent() == Some(parent) && !tree.contains(pid))
            .map(|(pid, _)| *pid)
            .collect();
        tree.extend(children);
        next += 1;
    }

    tree.iter()
        .rev()
        .filter_map(|pid| system.process(*pid))
        .filter(|process| process.kill())
        .count()
}

/// Force initialization of the shared handle
pub fn initialize() {
    let _ = &*SHARED_SYSTEM;
}
