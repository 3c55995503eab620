//! File System Calls
//!
//! `create`, `remove`, `open`, `filesize`, `read`, `write`, `seek`, `tell`
//! and `close`. Each call validates its user pointers first, then runs its
//! whole body under the file descriptor table lock.
//!
//! Handles 0 and 1 are the keyboard and console; every other handle is
//! looked up in the table. Any process may read, write, seek or tell on
//! any open handle, but only the owner may close it.

use alloc::vec;
use alloc::vec::Vec;

use super::validate::{self, UserBuffer, UserBufferMut, UserFault};
use crate::config::PAGE_SIZE;
use crate::fs::{Fd, File, FileSystem};
use crate::kernel::{Caller, Host, Kernel};
use crate::mm::{AddressSpace, VirtAddr};

/// Clamp a transfer count to the syscall return type.
fn count(bytes: usize) -> i32 {
    i32::try_from(bytes).unwrap_or(i32::MAX)
}

impl<F: FileSystem, H: Host> Kernel<F, H> {
    /// Create a file of `initial_size` bytes.
    pub(crate) fn sys_create(&self, caller: &Caller<'_>, path: VirtAddr, initial_size: u32) -> Result<bool, UserFault> {
        let Some(path) = validate::read_user_str(caller.space, path)? else {
            return Ok(false);
        };
        let created = self.files.with(|files| files.fs_mut().create(&path, initial_size));
        log::debug!("[FD] create {:?} ({} bytes): {}", path, initial_size, created);
        Ok(created)
    }

    /// Delete a file. Handles already open on it keep working.
    pub(crate) fn sys_remove(&self, caller: &Caller<'_>, path: VirtAddr) -> Result<bool, UserFault> {
        let Some(path) = validate::read_user_str(caller.space, path)? else {
            return Ok(false);
        };
        let removed = self.files.with(|files| files.fs_mut().remove(&path));
        log::debug!("[FD] remove {:?}: {}", path, removed);
        Ok(removed)
    }

    /// Open a file, returning its new handle or -1.
    pub(crate) fn sys_open(&self, caller: &Caller<'_>, path: VirtAddr) -> Result<i32, UserFault> {
        let Some(path) = validate::read_user_str(caller.space, path)? else {
            return Ok(-1);
        };
        match self.files.with(|files| files.open(caller.pid, &path)) {
            Some(fd) => Ok(fd.as_raw()),
            None => {
                log::debug!("[FD] {}: open {:?} failed", caller.pid, path);
                Ok(-1)
            }
        }
    }

    /// Size in bytes of an open file, or -1 for an unknown handle.
    pub(crate) fn sys_filesize(&self, fd: Fd) -> i32 {
        self.files
            .with(|files| files.file_mut(fd).map(|file| file.length()))
            .map_or(-1, |len| len as i32)
    }

    /// Read up to `size` bytes into the user buffer at `buf`.
    ///
    /// Returns the number of bytes read, -1 for the console handle, or 0
    /// for an unknown handle.
    pub(crate) fn sys_read(&self, caller: &Caller<'_>, fd: Fd, buf: VirtAddr, size: usize) -> Result<i32, UserFault> {
        let buffer = validate::validate_user_write(caller.space, buf, size)?;

        self.files.with(|files| {
            if fd == Fd::STDOUT {
                return Ok(-1);
            }
            if fd == Fd::STDIN {
                return self.read_keyboard(caller.space, &buffer);
            }
            match files.file_mut(fd) {
                Some(file) => read_file(caller.space, file, &buffer),
                None => {
                    log::debug!("[FD] {}: read on unknown handle {}", caller.pid, fd);
                    Ok(0)
                }
            }
        })
    }

    /// Write `size` bytes from the user buffer at `buf`.
    ///
    /// Returns the number of bytes written, -1 for the keyboard handle, or
    /// 0 for an unknown handle. Console writes always report `size`.
    pub(crate) fn sys_write(&self, caller: &Caller<'_>, fd: Fd, buf: VirtAddr, size: usize) -> Result<i32, UserFault> {
        let buffer = validate::validate_user_read(caller.space, buf, size)?;

        self.files.with(|files| {
            if fd == Fd::STDIN {
                return Ok(-1);
            }
            if fd == Fd::STDOUT {
                self.write_console(caller.space, &buffer)?;
                return Ok(size as i32);
            }
            match files.file_mut(fd) {
                Some(file) => write_file(caller.space, file, &buffer),
                None => {
                    log::debug!("[FD] {}: write on unknown handle {}", caller.pid, fd);
                    Ok(0)
                }
            }
        })
    }

    /// Move the position of an open file. Unknown handles are ignored.
    pub(crate) fn sys_seek(&self, fd: Fd, position: u32) {
        self.files.with(|files| {
            if let Some(file) = files.file_mut(fd) {
                file.seek(position);
            }
        });
    }

    /// Position of an open file, or 0 for an unknown handle.
    pub(crate) fn sys_tell(&self, fd: Fd) -> u32 {
        self.files
            .with(|files| files.file_mut(fd).map(|file| file.tell()))
            .unwrap_or(0)
    }

    /// Close a handle owned by the caller. Anything else is ignored.
    pub(crate) fn sys_close(&self, caller: &Caller<'_>, fd: Fd) {
        self.files.with(|files| files.close(caller.pid, fd));
    }

    /// Read keys until the buffer has one byte left or a NUL arrives, then
    /// terminate the buffer with NUL.
    fn read_keyboard(&self, space: &dyn AddressSpace, buffer: &UserBufferMut) -> Result<i32, UserFault> {
        if buffer.is_empty() {
            return Ok(0);
        }
        let mut line = Vec::new();
        while line.len() + 1 < buffer.len() {
            match self.host.read_char() {
                0 => break,
                key => line.push(key),
            }
        }
        let read = line.len();
        line.push(0);
        buffer.copy_from_kernel(space, 0, &line)?;
        Ok(count(read))
    }

    /// Write the whole buffer to the console in one call so it cannot
    /// interleave with another process's output.
    fn write_console(&self, space: &dyn AddressSpace, buffer: &UserBuffer) -> Result<(), UserFault> {
        if buffer.is_empty() {
            return Ok(());
        }
        let mut line = vec![0u8; buffer.len()];
        buffer.copy_to_kernel(space, 0, &mut line)?;
        self.host.write_buffer(&line);
        Ok(())
    }
}

/// Move file data into user memory a page at a time, stopping at the first
/// short read.
fn read_file<T: File>(space: &dyn AddressSpace, file: &mut T, buffer: &UserBufferMut) -> Result<i32, UserFault> {
    let mut bounce = vec![0u8; buffer.len().min(PAGE_SIZE)];
    let mut done = 0;
    while done < buffer.len() {
        let want = (buffer.len() - done).min(PAGE_SIZE);
        let got = file.read(&mut bounce[..want]);
        buffer.copy_from_kernel(space, done, &bounce[..got])?;
        done += got;
        if got < want {
            break;
        }
    }
    Ok(count(done))
}

/// Move user data into a file a page at a time, stopping at the first
/// short write.
fn write_file<T: File>(space: &dyn AddressSpace, file: &mut T, buffer: &UserBuffer) -> Result<i32, UserFault> {
    let mut bounce = vec![0u8; buffer.len().min(PAGE_SIZE)];
    let mut done = 0;
    while done < buffer.len() {
        let chunk = &mut bounce[..(buffer.len() - done).min(PAGE_SIZE)];
        buffer.copy_to_kernel(space, done, chunk)?;
        let wrote = file.write(chunk);
        done += wrote;
        if wrote < chunk.len() {
            break;
        }
    }
    Ok(count(done))
}
