//! I/O privilege acquisition.
//!
//! User-mode execution of the port instructions requires the process's
//! I/O privilege level raised to ring 3 access for the full 16-bit port
//! space, which on Linux is `iopl(3)`. (`ioperm(2)` only covers ports
//! below 0x400, so it cannot serve here.) Must run before any worker is
//! spawned; the raised level is inherited by the worker threads.

use std::io;

/// Raises the calling process's I/O privilege level to 3.
///
/// # Errors
///
/// Returns the OS error on denial (typically `EPERM` without
/// `CAP_SYS_RAWIO`), or `ErrorKind::Unsupported` on targets without a
/// user-mode port-I/O privilege mechanism.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub fn raise_io_privilege() -> io::Result<()> {
    // SAFETY: iopl only changes the task's I/O privilege level; no
    // memory is touched.
    if unsafe { libc::iopl(3) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
pub fn raise_io_privilege() -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "port I/O privilege requires x86-64 Linux",
    ))
}
