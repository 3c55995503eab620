//! System Call Trap Frame
//!
//! The interrupt entry code (outside this crate) saves the user's
//! registers into a [`TrapFrame`] when a program raises
//! [`SYSCALL_VECTOR`](crate::config::SYSCALL_VECTOR) and hands it to
//! [`Kernel::handle_trap`](crate::Kernel::handle_trap).
//!
//! # Calling Convention
//! - `esp` points at the syscall number on the user stack
//! - Up to three word-sized arguments follow it, one word apart
//! - The return value, if the syscall has one, is placed in `eax`

use crate::config::SYSCALL_VECTOR;
use crate::mm::VirtAddr;

/// Register state saved on entry from user mode.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TrapFrame {
    /// General purpose registers pushed by the entry stub
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    /// Result register
    pub eax: u32,
    /// Interrupt vector number
    pub vec_no: u32,
    /// Saved user instruction pointer
    pub eip: u32,
    /// Saved user stack pointer
    pub esp: u32,
}

impl TrapFrame {
    /// Frame for a system call trap raised with the given user stack pointer.
    pub fn with_stack(esp: VirtAddr) -> Self {
        Self {
            vec_no: u32::from(SYSCALL_VECTOR),
            esp: esp.as_usize() as u32,
            ..Self::default()
        }
    }

    /// The user stack pointer at the time of the trap.
    pub fn user_stack(&self) -> VirtAddr {
        VirtAddr::from_word(self.esp)
    }

    /// Store a syscall's return value.
    pub fn set_return(&mut self, value: i32) {
        self.eax = value as u32;
    }

    /// The value in the result register, as the user program sees it.
    pub fn return_value(&self) -> i32 {
        self.eax as i32
    }
}

/// What the trap glue must do once a system call has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapResult {
    /// Return to the user program
    Resume,
    /// The process exited with this status and must not be resumed
    Exited(i32),
    /// The machine was powered off
    Halted,
}
