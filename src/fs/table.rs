//! File Descriptor Table
//!
//! Maps integer handles to open files and the process that opened them.
//! A single system-wide table exists; handles are not per-process.
//!
//! # Locking
//! One spinlock guards the table, its handle counter and the filesystem
//! collaborator itself. Every filesystem-touching system call runs its
//! whole body inside [`FileTable::with`], which gives a total order over
//! those calls across all processes.
//!
//! # Ownership
//! The table exclusively owns every open file. Processes hold only their
//! [`Pid`], used to gate `close` and to find their files at teardown.
//! Removing an entry hands the file to [`File::close`], which consumes it,
//! so each file is released exactly once.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use super::{File, FileSystem};
use crate::config::{FIRST_FD, STDIN_FILENO, STDOUT_FILENO};
use crate::process::Pid;

/// A file handle as seen by user programs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Keyboard input stream
    pub const STDIN: Self = Self(STDIN_FILENO);
    /// Console output stream
    pub const STDOUT: Self = Self(STDOUT_FILENO);

    /// Wrap a raw handle value.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fd({})", self.0)
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entry of the table.
#[derive(Debug)]
pub struct OpenFile<T> {
    fd: Fd,
    owner: Pid,
    file: T,
}

impl<T> OpenFile<T> {
    /// Handle of this entry
    pub fn fd(&self) -> Fd {
        self.fd
    }

    /// Process that opened the file
    pub fn owner(&self) -> Pid {
        self.owner
    }
}

/// Table contents, reachable only with the lock held.
pub struct Files<F: FileSystem> {
    fs: F,
    entries: BTreeMap<Fd, OpenFile<F::File>>,
    /// Next handle to hand out; `None` once the handle space is used up.
    next_fd: Option<i32>,
}

impl<F: FileSystem> Files<F> {
    /// The filesystem collaborator.
    pub fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Open `path` on behalf of `owner` and register the file.
    ///
    /// Returns `None` if the path does not resolve or no handle is left.
    pub fn open(&mut self, owner: Pid, path: &str) -> Option<Fd> {
        let file = self.fs.open(path)?;
        self.insert(owner, file)
    }

    /// Register an already open file, assigning it a fresh handle.
    ///
    /// Handles grow monotonically and are never reused. When the counter is
    /// exhausted the file is closed again and `None` is returned.
    pub fn insert(&mut self, owner: Pid, file: F::File) -> Option<Fd> {
        let Some(raw) = self.next_fd else {
            log::warn!("[FD] handle space exhausted, rejecting open for {}", owner);
            file.close();
            return None;
        };
        self.next_fd = raw.checked_add(1);

        let fd = Fd(raw);
        self.entries.insert(fd, OpenFile { fd, owner, file });
        log::debug!("[FD] {} opened by {}", fd, owner);
        Some(fd)
    }

    /// Look up the file behind `fd`, regardless of who owns it.
    pub fn file_mut(&mut self, fd: Fd) -> Option<&mut F::File> {
        self.entries.get_mut(&fd).map(|entry| &mut entry.file)
    }

    /// Owner of `fd`, if the handle is open.
    pub fn owner_of(&self, fd: Fd) -> Option<Pid> {
        self.entries.get(&fd).map(OpenFile::owner)
    }

    /// Close `fd` if and only if `caller` owns it.
    ///
    /// Returns whether an entry was removed.
    pub fn close(&mut self, caller: Pid, fd: Fd) -> bool {
        match self.entries.get(&fd) {
            Some(entry) if entry.owner == caller => {}
            Some(entry) => {
                log::debug!("[FD] {} may not close {} owned by {}", caller, fd, entry.owner);
                return false;
            }
            None => return false,
        }
        if let Some(entry) = self.entries.remove(&fd) {
            entry.file.close();
        }
        log::debug!("[FD] {} closed by {}", fd, caller);
        true
    }

    /// Close every file owned by `owner`. Returns how many were closed.
    pub fn release_owner(&mut self, owner: Pid) -> usize {
        let doomed = self.handles_owned_by(owner);
        for fd in &doomed {
            if let Some(entry) = self.entries.remove(fd) {
                entry.file.close();
            }
        }
        doomed.len()
    }

    /// Handles currently owned by `owner`, in ascending order.
    pub fn handles_owned_by(&self, owner: Pid) -> Vec<Fd> {
        self.entries
            .values()
            .filter(|entry| entry.owner == owner)
            .map(OpenFile::fd)
            .collect()
    }

    /// Number of open entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file is open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The global file descriptor table.
pub struct FileTable<F: FileSystem> {
    inner: Mutex<Files<F>>,
}

impl<F: FileSystem> FileTable<F> {
    /// Create the table around the filesystem collaborator.
    ///
    /// Called once at startup; the handle counter is never reset.
    pub fn new(fs: F) -> Self {
        Self::starting_at(fs, FIRST_FD)
    }

    fn starting_at(fs: F, first_fd: i32) -> Self {
        Self {
            inner: Mutex::new(Files {
                fs,
                entries: BTreeMap::new(),
                next_fd: Some(first_fd),
            }),
        }
    }

    /// Run `f` with the table lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut Files<F>) -> R) -> R {
        let mut files = self.inner.lock();
        f(&mut files)
    }

    /// Close every file owned by `owner`.
    ///
    /// The thread subsystem must call this (directly or through process
    /// exit) for every process it tears down.
    pub fn release_owner(&self, owner: Pid) -> usize {
        let released = self.with(|files| files.release_owner(owner));
        if released > 0 {
            log::debug!("[FD] released {} file(s) of {}", released, owner);
        }
        released
    }

    /// Number of open entries.
    pub fn len(&self) -> usize {
        self.with(|files| files.len())
    }

    /// Whether no file is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
