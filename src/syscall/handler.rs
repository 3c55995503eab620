//! System Call Handler
//!
//! Decodes a trapped system call and dispatches it.
//!
//! # Security Considerations
//! - The four stack words are validated before any is decoded
//! - Each handler validates the memory its own arguments point to
//! - Any bad address kills the caller with status -1
//! - Unknown syscall numbers are ignored

use core::fmt;

use super::validate::{self, SyscallArgs, UserFault};
use crate::fs::{Fd, FileSystem};
use crate::kernel::{Caller, Host, Kernel};
use crate::process::Pid;
use crate::trap::{TrapFrame, TrapResult};

/// System call numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallNumber {
    /// Power off the machine.
    Halt = 0,
    /// Terminate the calling process.
    Exit = 1,
    /// Start a child process.
    Exec = 2,
    /// Wait for a child process to exit.
    Wait = 3,
    /// Create a file.
    Create = 4,
    /// Delete a file.
    Remove = 5,
    /// Open a file.
    Open = 6,
    /// Size of an open file.
    Filesize = 7,
    /// Read from a handle.
    Read = 8,
    /// Write to a handle.
    Write = 9,
    /// Move a file position.
    Seek = 10,
    /// Report a file position.
    Tell = 11,
    /// Close a handle.
    Close = 12,
}

impl TryFrom<u32> for SyscallNumber {
    type Error = u32;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => Self::Halt,
            1 => Self::Exit,
            2 => Self::Exec,
            3 => Self::Wait,
            4 => Self::Create,
            5 => Self::Remove,
            6 => Self::Open,
            7 => Self::Filesize,
            8 => Self::Read,
            9 => Self::Write,
            10 => Self::Seek,
            11 => Self::Tell,
            12 => Self::Close,
            _ => return Err(raw),
        })
    }
}

impl fmt::Display for SyscallNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Halt => "halt",
            Self::Exit => "exit",
            Self::Exec => "exec",
            Self::Wait => "wait",
            Self::Create => "create",
            Self::Remove => "remove",
            Self::Open => "open",
            Self::Filesize => "filesize",
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::Tell => "tell",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// How a handled system call completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    /// Store this value in the result register
    Value(i32),
    /// Leave the result register untouched
    Void,
    /// The caller asked to exit with this status
    Exit(i32),
    /// The machine was powered off
    Halt,
}

impl<F: FileSystem, H: Host> Kernel<F, H> {
    /// Handle one system call trap raised by `caller`.
    pub fn handle_trap(&self, caller: &Caller<'_>, frame: &mut TrapFrame) -> TrapResult {
        let args = match validate::read_syscall_args(caller.space, frame.user_stack()) {
            Ok(args) => args,
            Err(fault) => return self.kill(caller, fault),
        };

        match self.dispatch(caller, &args) {
            Ok(Completion::Value(value)) => {
                frame.set_return(value);
                TrapResult::Resume
            }
            Ok(Completion::Void) => TrapResult::Resume,
            Ok(Completion::Exit(status)) => self.exit(caller, status),
            Ok(Completion::Halt) => TrapResult::Halted,
            Err(fault) => self.kill(caller, fault),
        }
    }

    fn dispatch(&self, caller: &Caller<'_>, args: &SyscallArgs) -> Result<Completion, UserFault> {
        let number = match SyscallNumber::try_from(args.number()) {
            Ok(number) => number,
            Err(raw) => {
                log::debug!("[SYSCALL] {}: ignoring unknown syscall {}", caller.pid, raw);
                return Ok(Completion::Void);
            }
        };

        let completion = match number {
            SyscallNumber::Halt => self.sys_halt(caller),
            SyscallNumber::Exit => Completion::Exit(args.int(0)),
            SyscallNumber::Exec => Completion::Value(self.sys_exec(caller, args.addr(0))?),
            SyscallNumber::Wait => Completion::Value(self.sys_wait(caller, Pid::new(args.int(0)))),
            SyscallNumber::Create => {
                Completion::Value(self.sys_create(caller, args.addr(0), args.word(1))? as i32)
            }
            SyscallNumber::Remove => Completion::Value(self.sys_remove(caller, args.addr(0))? as i32),
            SyscallNumber::Open => Completion::Value(self.sys_open(caller, args.addr(0))?),
            SyscallNumber::Filesize => Completion::Value(self.sys_filesize(Fd::new(args.int(0)))),
            SyscallNumber::Read => Completion::Value(self.sys_read(
                caller,
                Fd::new(args.int(0)),
                args.addr(1),
                args.word(2) as usize,
            )?),
            SyscallNumber::Write => Completion::Value(self.sys_write(
                caller,
                Fd::new(args.int(0)),
                args.addr(1),
                args.word(2) as usize,
            )?),
            SyscallNumber::Seek => {
                self.sys_seek(Fd::new(args.int(0)), args.word(1));
                Completion::Void
            }
            SyscallNumber::Tell => Completion::Value(self.sys_tell(Fd::new(args.int(0))) as i32),
            SyscallNumber::Close => {
                self.sys_close(caller, Fd::new(args.int(0)));
                Completion::Void
            }
        };

        #[cfg(feature = "trace-syscalls")]
        log::trace!("[SYSCALL] {} {}({:?}) -> {:?}", caller.pid, number, args, completion);

        Ok(completion)
    }
}
