//! Filesystem Interface
//!
//! The on-disk filesystem is a collaborator: the syscall layer opens,
//! reads and writes files through [`FileSystem`] and [`File`] without
//! knowing how they are stored.
//!
//! # Concurrency
//! Implementations are not assumed to be reentrant. Every call made by this
//! crate happens while the [`FileTable`] lock is held, so at most one caller
//! is inside the filesystem at any time.

pub mod table;

pub use table::{Fd, FileTable, Files, OpenFile};

/// An open file owned by the file descriptor table.
pub trait File {
    /// Read into `buf` from the current position, advancing it.
    /// Returns the number of bytes read, short at end of file.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write `buf` at the current position, advancing it.
    /// Returns the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> usize;

    /// Move the position to `pos` bytes from the start of the file.
    fn seek(&mut self, pos: u32);

    /// Current position in bytes from the start of the file.
    fn tell(&self) -> u32;

    /// Size of the file in bytes.
    fn length(&self) -> u32;

    /// Release the file. Consumes the handle, so a file can only be
    /// closed once.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// The filesystem collaborator.
pub trait FileSystem {
    /// Open file type.
    type File: File;

    /// Create a file of `initial_size` bytes.
    fn create(&mut self, path: &str, initial_size: u32) -> bool;

    /// Remove a file. Handles already open on it stay usable.
    fn remove(&mut self, path: &str) -> bool;

    /// Open a file, or `None` if `path` does not resolve.
    fn open(&mut self, path: &str) -> Option<Self::File>;
}
