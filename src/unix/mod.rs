//! Unix implementation, using `libc`.

use std::io;
use std::os::fd::RawFd;

pub(crate) mod msg;
pub(crate) mod net;

pub(crate) type RawSocket = RawFd;

pub(crate) const INVALID_SOCKET: RawSocket = -1;

pub(crate) const TOO_LARGE: i32 = libc::E2BIG;

pub(crate) fn socket(family: i32, r#type: i32, protocol: i32) -> io::Result<RawSocket> {
    #[cfg(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux",
        target_os = "netbsd",
        target_os = "openbsd",
    ))]
    let socket = syscall!(socket(family, r#type | libc::SOCK_CLOEXEC, protocol))?;

    #[cfg(not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux",
        target_os = "netbsd",
        target_os = "openbsd",
    )))]
    let socket = {
        let socket = syscall!(socket(family, r#type, protocol))?;
        if let Err(err) = set_cloexec(socket, true) {
            let _ = close(socket);
            return Err(err);
        }
        socket
    };

    Ok(socket)
}

pub(crate) fn close(socket: RawSocket) -> io::Result<()> {
    syscall!(close(socket)).map(|_| ())
}

pub(crate) fn recv(socket: RawSocket, buf: *mut u8, len: usize, flags: i32) -> io::Result<usize> {
    syscall!(recv(socket, buf.cast(), len, flags)).map(|n| n as usize)
}

pub(crate) fn send(socket: RawSocket, buf: *const u8, len: usize, flags: i32) -> io::Result<usize> {
    syscall!(send(socket, buf.cast(), len, flags)).map(|n| n as usize)
}

pub(crate) fn dup(socket: RawSocket) -> io::Result<RawSocket> {
    syscall!(fcntl(socket, libc::F_DUPFD_CLOEXEC, 0))
}

/// Duplicate `socket` into `target`, closing `target` first.
pub(crate) fn dup_into(socket: RawSocket, target: RawSocket) -> io::Result<RawSocket> {
    if socket == target {
        // `dup3` fails with `EINVAL` and `dup2` would be a no-op.
        return Ok(target);
    }

    #[cfg(any(target_os = "android", target_os = "linux"))]
    let fd = syscall!(dup3(socket, target, libc::O_CLOEXEC))?;

    #[cfg(not(any(target_os = "android", target_os = "linux")))]
    let fd = {
        let fd = syscall!(dup2(socket, target))?;
        set_cloexec(fd, true)?;
        fd
    };

    Ok(fd)
}

pub(crate) fn set_nonblocking(socket: RawSocket, nonblocking: bool) -> io::Result<()> {
    let flags = syscall!(fcntl(socket, libc::F_GETFL))?;
    let new_flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if new_flags != flags {
        syscall!(fcntl(socket, libc::F_SETFL, new_flags))?;
    }
    Ok(())
}

pub(crate) fn set_cloexec(socket: RawSocket, cloexec: bool) -> io::Result<()> {
    let flags = syscall!(fcntl(socket, libc::F_GETFD))?;
    let new_flags = if cloexec {
        flags | libc::FD_CLOEXEC
    } else {
        flags & !libc::FD_CLOEXEC
    };
    if new_flags != flags {
        syscall!(fcntl(socket, libc::F_SETFD, new_flags))?;
    }
    Ok(())
}
