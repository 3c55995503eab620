//! Device driver interfaces
//!
//! The console and keyboard drivers live outside this crate; the syscall
//! layer reaches them only through the traits defined here.

pub mod console;

pub use console::{Console, Keyboard};
