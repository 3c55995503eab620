//! Kernel Configuration Constants
//!
//! Layout of the user address space and the fixed numbers of the
//! system call ABI. Everything here is decided at compile time.

/// Size of a virtual memory page (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Page offset mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Bits to shift for the page number
pub const PAGE_SHIFT: usize = 12;

/// Base of the kernel's half of every address space.
///
/// User virtual memory spans `[0, PHYS_BASE)`; anything at or above
/// belongs to the kernel and is never a valid user pointer.
pub const PHYS_BASE: usize = 0xC000_0000;

/// Size in bytes of one word on the user stack.
pub const WORD_SIZE: usize = core::mem::size_of::<u32>();

/// Words read from the user stack on every trap: the syscall number
/// followed by up to three arguments.
pub const SYSCALL_WORDS: usize = 4;

/// Interrupt vector user programs raise to enter the kernel.
///
/// Registered by the trap-entry code with DPL 3 so user mode may invoke it.
pub const SYSCALL_VECTOR: u8 = 0x30;

/// Reserved handle for the keyboard stream
pub const STDIN_FILENO: i32 = 0;

/// Reserved handle for the console stream
pub const STDOUT_FILENO: i32 = 1;

/// First handle handed out by `open`
pub const FIRST_FD: i32 = 2;

/// Longest user string (path or command line) copied into the kernel,
/// including its terminator.
pub const MAX_USER_STR: usize = PAGE_SIZE;

/// Exit status of a process killed for passing a bad pointer
pub const EXIT_FAULT: i32 = -1;
