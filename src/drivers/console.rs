//! Console and Keyboard Interfaces
//!
//! The console backs writes to the standard output handle and the
//! termination line printed for every exiting process. The keyboard
//! backs reads from the standard input handle.
//!
//! # Concurrency
//! Implementations are shared by every process and must serialize
//! internally; a single `write_buffer` call is never interleaved with
//! another. The syscall layer issues each termination line and each
//! standard output write as a single call.

/// Console output collaborator.
pub trait Console {
    /// Write the whole buffer. Console writes never partially fail.
    fn write_buffer(&self, buf: &[u8]);
}

/// Keyboard input collaborator.
pub trait Keyboard {
    /// Block until a key is available and return it.
    fn read_char(&self) -> u8;
}
