//! User Memory Access
//!
//! Every dereference of user memory made by the syscall layer funnels
//! through [`with_user_chunks`]. Ranges are walked one page at a time and
//! each page is translated through the caller's page table before it is
//! touched, so a range that crosses into an unmapped page faults instead
//! of reading or writing memory that does not belong to the process.

use alloc::vec::Vec;
use core::fmt;
use core::ops::ControlFlow;
use core::ptr::NonNull;

use super::address::VirtAddr;
use super::paging::AddressSpace;

/// Reasons a user address cannot be dereferenced.
///
/// Any of these is fatal to the process that supplied the address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFault {
    /// The null pointer
    Null,
    /// An address at or above the kernel split
    KernelAddress(VirtAddr),
    /// An address with no page mapped behind it
    Unmapped(VirtAddr),
    /// A range whose end wraps around the address space
    Overflow,
}

impl fmt::Display for UserFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null pointer"),
            Self::KernelAddress(addr) => write!(f, "kernel address {}", addr),
            Self::Unmapped(addr) => write!(f, "unmapped address {}", addr),
            Self::Overflow => write!(f, "address range wraps"),
        }
    }
}

/// Translate one user address to the kernel address backing it.
pub fn translate_user(space: &dyn AddressSpace, addr: VirtAddr) -> Result<NonNull<u8>, UserFault> {
    if addr.is_null() {
        return Err(UserFault::Null);
    }
    if !addr.is_user() {
        return Err(UserFault::KernelAddress(addr));
    }
    match space.translate(addr) {
        Some(translation) if translation.is_mapped() => Ok(translation.kaddr),
        _ => Err(UserFault::Unmapped(addr)),
    }
}

/// Walk `len` bytes of user memory starting at `addr`, one page at a time.
///
/// `visit` receives each translated chunk and its offset from `addr`, and
/// may stop the walk early by returning `ControlFlow::Break`.
fn with_user_chunks<F>(
    space: &dyn AddressSpace,
    addr: VirtAddr,
    len: usize,
    mut visit: F,
) -> Result<(), UserFault>
where
    F: FnMut(&mut [u8], usize) -> ControlFlow<()>,
{
    let mut done = 0;
    while done < len {
        let cursor = addr.checked_add(done).ok_or(UserFault::Overflow)?;
        let kaddr = translate_user(space, cursor)?;
        let chunk_len = cursor.bytes_to_page_end().min(len - done);

        // SAFETY:
        // - `cursor` is a mapped user address, translated just above
        // - The chunk never crosses the end of that page, and the
        //   `AddressSpace` contract keeps the whole page valid for the
        //   duration of the system call
        // - User memory is not otherwise borrowed by the kernel while a
        //   chunk is live
        // Audited: 2025-01-04
        let chunk = unsafe { core::slice::from_raw_parts_mut(kaddr.as_ptr(), chunk_len) };

        if visit(chunk, done).is_break() {
            return Ok(());
        }
        done += chunk_len;
    }
    Ok(())
}

/// Copy user memory at `addr` into `dst`.
pub fn copy_from_user(space: &dyn AddressSpace, addr: VirtAddr, dst: &mut [u8]) -> Result<(), UserFault> {
    let len = dst.len();
    with_user_chunks(space, addr, len, |chunk, offset| {
        dst[offset..offset + chunk.len()].copy_from_slice(chunk);
        ControlFlow::Continue(())
    })
}

/// Copy `src` into user memory at `addr`.
pub fn copy_to_user(space: &dyn AddressSpace, addr: VirtAddr, src: &[u8]) -> Result<(), UserFault> {
    with_user_chunks(space, addr, src.len(), |chunk, offset| {
        chunk.copy_from_slice(&src[offset..offset + chunk.len()]);
        ControlFlow::Continue(())
    })
}

/// Copy a NUL-terminated user string of at most `limit` bytes.
///
/// Returns the bytes before the terminator, or `None` when no terminator
/// appears within `limit` bytes.
pub fn copy_str_from_user(
    space: &dyn AddressSpace,
    addr: VirtAddr,
    limit: usize,
) -> Result<Option<Vec<u8>>, UserFault> {
    let mut bytes = Vec::new();
    let mut terminated = false;
    with_user_chunks(space, addr, limit, |chunk, _| match chunk.iter().position(|&b| b == 0) {
        Some(nul) => {
            bytes.extend_from_slice(&chunk[..nul]);
            terminated = true;
            ControlFlow::Break(())
        }
        None => {
            bytes.extend_from_slice(chunk);
            ControlFlow::Continue(())
        }
    })?;
    Ok(terminated.then_some(bytes))
}
