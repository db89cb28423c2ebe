use std::io;
use std::mem::{align_of, size_of, zeroed};

use crate::io::RawBuf;
use crate::msg::{Direction, MessageFlags, RawMessage};
use crate::sys::RawSocket;
use crate::too_large_error;

// `RawBuf` is passed to the OS as `iovec`.
const _: () = assert!(size_of::<RawBuf>() == size_of::<libc::iovec>());
const _: () = assert!(align_of::<RawBuf>() == align_of::<libc::iovec>());

pub(crate) const MSG_PEEK: i32 = libc::MSG_PEEK;
pub(crate) const MSG_OOB: i32 = libc::MSG_OOB;
pub(crate) const MSG_WAITALL: i32 = libc::MSG_WAITALL;
pub(crate) const MSG_DONTROUTE: i32 = libc::MSG_DONTROUTE;
#[cfg(any(target_os = "android", target_os = "linux"))]
pub(crate) const MSG_DONTWAIT: i32 = libc::MSG_DONTWAIT;
#[cfg(any(target_os = "android", target_os = "linux"))]
pub(crate) const MSG_NOSIGNAL: i32 = libc::MSG_NOSIGNAL;

/// Send or receive `msg` using a single `sendmsg(2)` or `recvmsg(2)` call.
///
/// When receiving the lengths and flags in `msg` are updated.
pub(crate) fn transfer(
    socket: RawSocket,
    msg: &mut RawMessage,
    direction: Direction,
    flags: MessageFlags,
) -> io::Result<usize> {
    // SAFETY: all zero is a valid `msghdr`.
    let mut hdr: libc::msghdr = unsafe { zeroed() };
    // NOTE: leave the pointers null for empty address and control buffers,
    // not all OSes accept a dangling pointer with a zero length.
    if msg.name_len != 0 {
        hdr.msg_name = msg.name.cast();
        hdr.msg_namelen = msg.name_len.try_into().map_err(|_| too_large_error())?;
    }
    hdr.msg_iov = msg.iov.cast();
    hdr.msg_iovlen = msg.iov_len.try_into().map_err(|_| too_large_error())?;
    if msg.control_len != 0 {
        hdr.msg_control = msg.control.cast();
        hdr.msg_controllen = msg.control_len.try_into().map_err(|_| too_large_error())?;
    }
    hdr.msg_flags = msg.flags;

    let n = match direction {
        Direction::Send => syscall!(sendmsg(socket, &hdr, flags.0))?,
        Direction::Recv => {
            let n = syscall!(recvmsg(socket, &mut hdr, flags.0))?;
            msg.name_len = hdr.msg_namelen as usize;
            msg.control_len = hdr.msg_controllen as usize;
            msg.flags = hdr.msg_flags;
            n
        }
    };
    Ok(n as usize)
}
