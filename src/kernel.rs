//! Syscall Layer State
//!
//! [`Kernel`] ties the collaborators together: the filesystem (owned by
//! the file descriptor table) and the host services for console, keyboard
//! and process lifecycle. One instance exists per machine and is shared by
//! every kernel thread.

use alloc::format;

use crate::config::EXIT_FAULT;
use crate::drivers::{Console, Keyboard};
use crate::fs::{FileSystem, FileTable};
use crate::mm::{AddressSpace, UserFault};
use crate::process::{Handshake, Pid, ProcessHost};
use crate::trap::TrapResult;

/// Host services the syscall layer calls into.
pub trait Host: Console + Keyboard + ProcessHost {}

impl<T: Console + Keyboard + ProcessHost> Host for T {}

/// The process on whose behalf a system call runs.
///
/// Built by the trap glue from the current thread's process record.
#[derive(Clone, Copy)]
pub struct Caller<'a> {
    /// Id of the calling process
    pub pid: Pid,
    /// Id of its parent, if it was started by `exec`
    pub parent: Option<Pid>,
    /// Program name, printed when the process exits
    pub name: &'a str,
    /// Page-table query for the caller's address space
    pub space: &'a dyn AddressSpace,
    /// The caller's own handshake state
    pub handshake: &'a Handshake,
}

/// The user-process system call boundary.
pub struct Kernel<F: FileSystem, H: Host> {
    pub(crate) files: FileTable<F>,
    pub(crate) host: H,
}

impl<F: FileSystem, H: Host> Kernel<F, H> {
    /// Set up the syscall layer. Called once at boot.
    pub fn new(fs: F, host: H) -> Self {
        log::info!("[SYSCALL] system call layer ready");
        Self {
            files: FileTable::new(fs),
            host,
        }
    }

    /// The global file descriptor table.
    pub fn files(&self) -> &FileTable<F> {
        &self.files
    }

    /// The host services.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Terminate the calling process with `status`.
    ///
    /// Prints the termination line, publishes the status to the process
    /// itself and to its parent (if still alive), closes every file the
    /// process still owns, then asks the host to tear the process down.
    pub fn exit(&self, caller: &Caller<'_>, status: i32) -> TrapResult {
        let line = format!("{}: exit({})\n", caller.name, status);
        self.host.write_buffer(line.as_bytes());
        log::info!("[PROCESS] {} ({}) exited with status {}", caller.name, caller.pid, status);

        caller.handshake.record_exit(status);
        if let Some(parent) = caller.parent.and_then(|pid| self.host.lookup(pid)) {
            if !parent.record_child_exit(caller.pid, status) {
                log::debug!("[PROCESS] parent of {} does not track it", caller.pid);
            }
        }

        self.files.release_owner(caller.pid);
        self.host.exit_current(caller.pid);
        TrapResult::Exited(status)
    }

    /// Kill the caller for handing the kernel a bad address.
    pub(crate) fn kill(&self, caller: &Caller<'_>, fault: UserFault) -> TrapResult {
        log::warn!("[SYSCALL] {} ({}): {}, terminating", caller.name, caller.pid, fault);
        self.exit(caller, EXIT_FAULT)
    }
}
