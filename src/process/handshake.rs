//! Parent/Child Handshake
//!
//! Two points in a process's life are observed by its parent:
//!
//! 1. Load completion. `exec` must not return until the child has either
//!    loaded its program or failed to. This is a one-shot channel: the
//!    child holds a [`LoadReporter`], the parent a [`LoadWaiter`], and the
//!    status moves from `Pending` to `Loaded` or `Failed` exactly once.
//! 2. Exit. The child records its status in the parent's [`Handshake`],
//!    under the parent's own lock, where `wait` later collects it once.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use spin::{Mutex, Once};

use super::Pid;

/// Load status of a child started by `exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// The child has not reported yet
    Pending,
    /// The child's program is loaded and running
    Loaded,
    /// The child could not load its program
    Failed,
}

/// Create a connected reporter/waiter pair in the `Pending` state.
pub fn load_channel() -> (LoadReporter, LoadWaiter) {
    let cell = Arc::new(Once::new());
    (LoadReporter { cell: cell.clone() }, LoadWaiter { cell })
}

/// Child side of the load handshake.
///
/// Dropping a reporter that never reported counts as a failed load, so the
/// parent is released even if the child dies while loading.
#[derive(Debug)]
pub struct LoadReporter {
    cell: Arc<Once<LoadStatus>>,
}

impl LoadReporter {
    /// Report the outcome of loading the child's program.
    pub fn report(self, loaded: bool) {
        let status = if loaded { LoadStatus::Loaded } else { LoadStatus::Failed };
        self.cell.call_once(|| status);
    }
}

impl Drop for LoadReporter {
    fn drop(&mut self) {
        self.cell.call_once(|| LoadStatus::Failed);
    }
}

/// Parent side of the load handshake.
#[derive(Debug)]
pub struct LoadWaiter {
    cell: Arc<Once<LoadStatus>>,
}

impl LoadWaiter {
    /// Current status without blocking.
    pub fn status(&self) -> LoadStatus {
        self.cell.poll().copied().unwrap_or(LoadStatus::Pending)
    }

    /// Block until the child reports, calling `idle` between checks.
    ///
    /// Never returns `Pending`.
    pub fn wait(self, mut idle: impl FnMut()) -> LoadStatus {
        loop {
            if let Some(status) = self.cell.poll() {
                return *status;
            }
            idle();
        }
    }
}

/// Exit record a parent keeps for one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildStatus {
    /// Child this record tracks
    pub child: Pid,
    /// Whether the child has called `exit`
    pub exited: bool,
    /// Status passed to `exit`, meaningful once `exited` is set
    pub status: i32,
}

/// Outcome of checking on a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildPoll {
    /// Not a child of this process, or already collected
    NotChild,
    /// Still running
    Running,
    /// Exited with this status; the record has now been consumed
    Exited(i32),
}

/// Handshake state embedded in every process record.
#[derive(Debug, Default)]
pub struct Handshake {
    exit_status: Once<i32>,
    children: Mutex<BTreeMap<Pid, ChildStatus>>,
}

impl Handshake {
    /// Fresh state for a newly created process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this process's own exit status. Only the first call counts.
    pub fn record_exit(&self, status: i32) {
        self.exit_status.call_once(|| status);
    }

    /// This process's exit status, once it has exited.
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status.poll().copied()
    }

    /// Start tracking a new child.
    pub fn track_child(&self, child: Pid) {
        self.children.lock().insert(
            child,
            ChildStatus {
                child,
                exited: false,
                status: 0,
            },
        );
    }

    /// Record that `child` exited with `status`.
    ///
    /// Returns `false` if `child` is not tracked here.
    pub fn record_child_exit(&self, child: Pid, status: i32) -> bool {
        match self.children.lock().get_mut(&child) {
            Some(record) => {
                record.exited = true;
                record.status = status;
                true
            }
            None => false,
        }
    }

    /// Look at a child's record without consuming it.
    pub fn child_status(&self, child: Pid) -> Option<ChildStatus> {
        self.children.lock().get(&child).copied()
    }

    /// Check on a child, consuming its record if it has exited.
    pub fn poll_child(&self, child: Pid) -> ChildPoll {
        let mut children = self.children.lock();
        match children.get(&child) {
            None => ChildPoll::NotChild,
            Some(record) if !record.exited => ChildPoll::Running,
            Some(record) => {
                let status = record.status;
                children.remove(&child);
                ChildPoll::Exited(status)
            }
        }
    }

    /// Block until `child` exits and collect its status, calling `idle`
    /// between checks.
    ///
    /// Returns `None` for a process that is not a child or was already
    /// collected.
    pub fn wait_child(&self, child: Pid, mut idle: impl FnMut()) -> Option<i32> {
        loop {
            match self.poll_child(child) {
                ChildPoll::NotChild => return None,
                ChildPoll::Exited(status) => return Some(status),
                ChildPoll::Running => idle(),
            }
        }
    }
}
