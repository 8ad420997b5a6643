// network/process.rs - Best-effort pid -> process name lookup

use std::collections::HashMap;

use log::debug;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Trait for resolving process names from process ids
pub trait ProcessLookup {
    /// Name of the process with this pid, if it still exists and is visible
    fn process_name(&self, pid: u32) -> Option<String>;

    /// Refresh internal caches if any (best-effort)
    fn refresh(&mut self) {}
}

/// Process lookup backed by the sysinfo process table
pub struct SystemProcessLookup {
    system: System,
}

impl SystemProcessLookup {
    pub fn new() -> Self {
        let mut lookup = Self {
            system: System::new(),
        };
        lookup.refresh();
        lookup
    }
}

impl Default for SystemProcessLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLookup for SystemProcessLookup {
    fn process_name(&self, pid: u32) -> Option<String> {
        let name = self
            .system
            .process(Pid::from_u32(pid))?
            .name()
            .to_string_lossy()
            .into_owned();
        if name.is_empty() { None } else { Some(name) }
    }

    fn refresh(&mut self) {
        // Only names are needed; skip cpu, memory and disk sampling
        let count = self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );
        debug!("Process table refreshed: {} processes", count);
    }
}

/// Static lookup table, used for fixed process maps
impl ProcessLookup for HashMap<u32, String> {
    fn process_name(&self, pid: u32) -> Option<String> {
        self.get(&pid).cloned()
    }
}
