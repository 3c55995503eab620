//! Page Table Query Interface
//!
//! The syscall layer never walks page tables itself. It asks the owning
//! process's address space, through [`AddressSpace`], which kernel address
//! backs a given user byte. Building and switching page tables belongs to
//! the virtual memory subsystem.

use core::ptr::NonNull;

use bitflags::bitflags;

use super::address::VirtAddr;

bitflags! {
    /// Page table entry flags reported by a translation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageTableFlags: u32 {
        /// Page is present in memory.
        const PRESENT = 1 << 0;
        /// Page is writable.
        const WRITABLE = 1 << 1;
        /// Page is accessible from user mode.
        const USER = 1 << 2;
        /// Page has been accessed.
        const ACCESSED = 1 << 5;
        /// Page has been written to.
        const DIRTY = 1 << 6;
    }
}

/// Result of translating one user virtual address.
#[derive(Debug, Clone, Copy)]
pub struct Translation {
    /// Kernel-accessible address of the translated byte (not of its page).
    pub kaddr: NonNull<u8>,
    /// Flags of the mapping that produced it.
    pub flags: PageTableFlags,
}

impl Translation {
    /// Check whether the translated page is actually backed.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.flags.contains(PageTableFlags::PRESENT)
    }
}

/// The page-table query collaborator.
///
/// One implementation exists per process; the trap glue passes the calling
/// process's instance in with every system call.
///
/// # Contract
/// A returned `kaddr` must stay valid for reads and writes of every byte
/// up to the end of its page until the process makes another system call
/// or exits.
pub trait AddressSpace {
    /// Translate `addr` through the active page table.
    ///
    /// Returns `None` when no page is mapped at `addr`.
    fn translate(&self, addr: VirtAddr) -> Option<Translation>;
}
