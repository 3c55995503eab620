//! Process System Calls
//!
//! `halt`, `exec` and `wait`. `exit` is handled by
//! [`Kernel::exit`](crate::Kernel::exit) since the fault path shares it.

use super::handler::Completion;
use super::validate::{self, UserFault};
use crate::fs::FileSystem;
use crate::kernel::{Caller, Host, Kernel};
use crate::mm::VirtAddr;
use crate::process::{load_channel, LoadStatus, Pid};

impl<F: FileSystem, H: Host> Kernel<F, H> {
    /// Power the machine off.
    pub(crate) fn sys_halt(&self, caller: &Caller<'_>) -> Completion {
        log::info!("[PROCESS] halt requested by {} ({})", caller.name, caller.pid);
        self.host.power_off();
        Completion::Halt
    }

    /// Start `command_line` as a child of the caller.
    ///
    /// Blocks until the child reports whether its program loaded. Returns
    /// the child's pid, or -1 if it could not be created or loaded.
    pub(crate) fn sys_exec(&self, caller: &Caller<'_>, command_line: VirtAddr) -> Result<i32, UserFault> {
        let Some(command_line) = validate::read_user_str(caller.space, command_line)? else {
            return Ok(-1);
        };

        let (reporter, waiter) = load_channel();
        let Some(child) = self.host.create_process(caller.pid, &command_line, reporter) else {
            log::debug!("[PROCESS] {}: could not create {:?}", caller.pid, command_line);
            return Ok(-1);
        };

        match waiter.wait(|| self.host.yield_now()) {
            LoadStatus::Loaded => {
                log::debug!("[PROCESS] {} started {:?} as {}", caller.pid, command_line, child);
                Ok(child.as_raw())
            }
            status => {
                log::debug!("[PROCESS] {}: {:?} did not load ({:?})", caller.pid, command_line, status);
                Ok(-1)
            }
        }
    }

    /// Wait for a child to exit and return its status.
    pub(crate) fn sys_wait(&self, caller: &Caller<'_>, child: Pid) -> i32 {
        self.host.wait_for_child(caller.pid, child)
    }
}
