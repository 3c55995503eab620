//! Process Lifecycle Interface
//!
//! Process creation, scheduling and teardown belong to the thread
//! subsystem. This module names the pieces of it the syscall layer
//! calls into, and owns the parent/child handshake state kept in every
//! process record.

pub mod handshake;

use alloc::sync::Arc;
use core::fmt;

pub use handshake::{load_channel, ChildPoll, ChildStatus, Handshake, LoadReporter, LoadStatus, LoadWaiter};

/// A process identifier.
///
/// Each user process runs in exactly one kernel thread, so the thread id
/// doubles as the process id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    /// Wrap a raw process id.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw process id.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// The process lifecycle collaborator.
///
/// # Contract
/// - `create_process` must register the child with the parent's
///   [`Handshake::track_child`] before the child can run, and hand the
///   `LoadReporter` to the child, which reports once its program is loaded
///   (or drops it on failure).
/// - `wait_for_child` allows only the direct parent to wait, at most once
///   per child, and returns -1 otherwise.
pub trait ProcessHost {
    /// Start a process running `command_line` as a child of `parent`.
    ///
    /// Returns `None` if no process could be created at all.
    fn create_process(&self, parent: Pid, command_line: &str, load: LoadReporter) -> Option<Pid>;

    /// Wait for `child` of `parent` to exit and return its status.
    fn wait_for_child(&self, parent: Pid, child: Pid) -> i32;

    /// Handshake state of a live process, or `None` if it has exited.
    fn lookup(&self, pid: Pid) -> Option<Arc<Handshake>>;

    /// Tear down the calling process. In the kernel this does not return;
    /// the trap glue must not resume a process after calling it.
    fn exit_current(&self, pid: Pid);

    /// Power the machine off.
    fn power_off(&self);

    /// Give up the CPU while blocked on another process.
    ///
    /// `exec` calls this in a loop until the child reports its load
    /// status, so it must block or yield to the scheduler rather than spin.
    fn yield_now(&self);
}
