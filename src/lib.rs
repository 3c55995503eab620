//! PantherOS - User Program System Call Layer
//!
//! The kernel's only trust boundary with user programs: receives a system
//! call trap, validates every address the program supplies, dispatches to
//! the requested operation and stores its result.
//!
//! # Components
//! - User memory validation against the caller's page table
//! - A global file descriptor table behind one filesystem lock
//! - The exec load handshake between parent and child
//! - Exit status propagation from child to parent
//!
//! # Collaborators
//! The page tables, filesystem, console, keyboard and process lifecycle
//! live elsewhere in the kernel. This crate reaches them only through the
//! traits in [`mm::paging`], [`fs`], [`drivers`] and [`process`].
//!
//! # Security Features
//! - User pointers are never dereferenced without page-table translation
//! - Buffers are checked at both ends before any transfer
//! - Unsafe code is confined to one audited function
//! - Open files are owned by the table and closed exactly once

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod fs;
pub mod kernel;
pub mod mm;
pub mod process;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

pub use kernel::{Caller, Host, Kernel};
pub use trap::{TrapFrame, TrapResult};
