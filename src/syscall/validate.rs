//! System Call Input Validation
//!
//! Decides whether user-supplied addresses are safe for the kernel to
//! touch and provides the only typed ways to read them.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: any failed check is a [`UserFault`], and a fault kills
//!   the calling process with status -1
//! - A pointer is valid iff it is non-null, below `PHYS_BASE`, and mapped
//!   in the caller's page table
//! - Buffers are checked at both their first and last byte before any
//!   transfer; a buffer may straddle a page boundary
//! - Data is copied through kernel memory, never aliased (TOCTOU)

use alloc::string::String;

use crate::config::{MAX_USER_STR, SYSCALL_WORDS, WORD_SIZE};
use crate::mm::user::{self, translate_user};
use crate::mm::{AddressSpace, VirtAddr};

pub use crate::mm::UserFault;

/// Check whether `addr` may be dereferenced on behalf of the caller.
pub fn is_valid(space: &dyn AddressSpace, addr: VirtAddr) -> bool {
    translate_user(space, addr).is_ok()
}

/// Like [`is_valid`], reporting why the address was rejected.
pub fn check_ptr(space: &dyn AddressSpace, addr: VirtAddr) -> Result<(), UserFault> {
    translate_user(space, addr).map(|_| ())
}

/// Check the first and last byte of a `len`-byte buffer at `addr`.
///
/// A zero-length buffer only has its start checked.
fn check_ends(space: &dyn AddressSpace, addr: VirtAddr, len: usize) -> Result<(), UserFault> {
    check_ptr(space, addr)?;
    if len > 1 {
        let last = addr.checked_add(len - 1).ok_or(UserFault::Overflow)?;
        check_ptr(space, last)?;
    }
    Ok(())
}

/// A user buffer the kernel will read from.
///
/// Only constructed once both ends passed validation.
#[derive(Debug, Clone, Copy)]
pub struct UserBuffer {
    addr: VirtAddr,
    len: usize,
}

impl UserBuffer {
    /// Length of the buffer in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `dst.len()` bytes starting `offset` bytes into the buffer.
    ///
    /// Pages between the two validated ends are translated as they are
    /// reached and fault if unmapped.
    pub fn copy_to_kernel(&self, space: &dyn AddressSpace, offset: usize, dst: &mut [u8]) -> Result<(), UserFault> {
        debug_assert!(offset + dst.len() <= self.len);
        user::copy_from_user(space, self.addr.checked_add(offset).ok_or(UserFault::Overflow)?, dst)
    }
}

/// A user buffer the kernel will write into.
#[derive(Debug, Clone, Copy)]
pub struct UserBufferMut {
    addr: VirtAddr,
    len: usize,
}

impl UserBufferMut {
    /// Length of the buffer in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `src` to `offset` bytes into the buffer.
    pub fn copy_from_kernel(&self, space: &dyn AddressSpace, offset: usize, src: &[u8]) -> Result<(), UserFault> {
        debug_assert!(offset + src.len() <= self.len);
        user::copy_to_user(space, self.addr.checked_add(offset).ok_or(UserFault::Overflow)?, src)
    }
}

/// Validate a user buffer the kernel will read (the source of `write`).
pub fn validate_user_read(space: &dyn AddressSpace, addr: VirtAddr, len: usize) -> Result<UserBuffer, UserFault> {
    check_ends(space, addr, len)?;
    Ok(UserBuffer { addr, len })
}

/// Validate a user buffer the kernel will fill (the target of `read`).
pub fn validate_user_write(space: &dyn AddressSpace, addr: VirtAddr, len: usize) -> Result<UserBufferMut, UserFault> {
    check_ends(space, addr, len)?;
    Ok(UserBufferMut { addr, len })
}

/// The words a system call trap reads off the user stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallArgs {
    number: u32,
    args: [u32; SYSCALL_WORDS - 1],
}

impl SyscallArgs {
    /// Raw system call number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Argument `index` as an unsigned word.
    pub fn word(&self, index: usize) -> u32 {
        self.args[index]
    }

    /// Argument `index` as a signed integer.
    pub fn int(&self, index: usize) -> i32 {
        self.args[index] as i32
    }

    /// Argument `index` as a user pointer.
    pub fn addr(&self, index: usize) -> VirtAddr {
        VirtAddr::from_word(self.args[index])
    }
}

/// Read the syscall number and its three argument slots from the user
/// stack at `esp`.
///
/// All four words are validated before any of them is decoded. Only the
/// slots are checked here; memory the arguments point to is validated by
/// the individual system calls.
pub fn read_syscall_args(space: &dyn AddressSpace, esp: VirtAddr) -> Result<SyscallArgs, UserFault> {
    let mut raw = [0u8; SYSCALL_WORDS * WORD_SIZE];
    for slot in 0..SYSCALL_WORDS {
        let word = esp.checked_add(slot * WORD_SIZE).ok_or(UserFault::Overflow)?;
        check_ends(space, word, WORD_SIZE)?;
    }
    user::copy_from_user(space, esp, &mut raw)?;

    let mut words = [0u32; SYSCALL_WORDS];
    for (word, bytes) in words.iter_mut().zip(raw.chunks_exact(WORD_SIZE)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    Ok(SyscallArgs {
        number: words[0],
        args: [words[1], words[2], words[3]],
    })
}

/// Copy a NUL-terminated user string (a path or command line).
///
/// The pointer itself is checked before anything is read. Returns
/// `Ok(None)` for a string that is not terminated within
/// [`MAX_USER_STR`] bytes or is not valid UTF-8; the caller treats that
/// as an ordinary failure of the operation.
pub fn read_user_str(space: &dyn AddressSpace, addr: VirtAddr) -> Result<Option<String>, UserFault> {
    check_ptr(space, addr)?;
    let Some(bytes) = user::copy_str_from_user(space, addr, MAX_USER_STR)? else {
        log::debug!("[VALIDATE] unterminated string at {}", addr);
        return Ok(None);
    };
    match String::from_utf8(bytes) {
        Ok(s) => Ok(Some(s)),
        Err(_) => {
            log::debug!("[VALIDATE] non UTF-8 string at {}", addr);
            Ok(None)
        }
    }
}
