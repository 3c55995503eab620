//! System Call Interface
//!
//! The boundary between user programs and the kernel.
//!
//! # Security Model
//! - Every word read off the user stack is validated first
//! - Every pointer argument is validated by the call that uses it
//! - A bad address terminates the caller with status -1
//! - Unknown syscall numbers are ignored
//!
//! # Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmd_line) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(path, initial_size) -> bool
//! - 5: remove(path) -> bool
//! - 6: open(path) -> fd
//! - 7: filesize(fd) -> size
//! - 8: read(fd, buf, size) -> count
//! - 9: write(fd, buf, size) -> count
//! - 10: seek(fd, position)
//! - 11: tell(fd) -> position
//! - 12: close(fd)

mod file;
mod handler;
mod process;
pub mod validate;

pub use handler::SyscallNumber;
pub use validate::{is_valid, SyscallArgs, UserBuffer, UserBufferMut, UserFault};
