//! Memory management interface for the syscall layer
//!
//! Provides:
//! - User virtual address type
//! - The page-table query the validator relies on
//! - Audited copy-in / copy-out of user memory
//!
//! # Security Principles
//! - User addresses are never dereferenced without translation
//! - Every page of a range is translated before it is touched
//! - Unsafe code is confined to one function in `user`

pub mod address;
pub mod paging;
pub mod user;

pub use address::VirtAddr;
pub use paging::{AddressSpace, PageTableFlags, Translation};
pub use user::UserFault;
