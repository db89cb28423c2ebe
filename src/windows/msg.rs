use std::ffi::c_void;
use std::io;
use std::mem::size_of;
use std::ptr;
use std::sync::OnceLock;

use windows_sys::Win32::Networking::WinSock;

use crate::msg::{check_limits, Direction, MessageFlags, RawMessage, MAX_SEGMENTS};
use crate::sys::{last_error, RawSocket};

pub(crate) const MSG_PEEK: i32 = WinSock::MSG_PEEK as i32;
pub(crate) const MSG_OOB: i32 = WinSock::MSG_OOB as i32;
pub(crate) const MSG_WAITALL: i32 = WinSock::MSG_WAITALL as i32;
pub(crate) const MSG_DONTROUTE: i32 = WinSock::MSG_DONTROUTE as i32;

/// Send or receive `msg` using a single `WSASendMsg` or `WSARecvMsg` call.
///
/// When receiving the lengths and flags in `msg` are updated.
pub(crate) fn transfer(
    socket: RawSocket,
    msg: &mut RawMessage,
    direction: Direction,
    flags: MessageFlags,
) -> io::Result<usize> {
    // SAFETY: the caller ensures the buffers are valid.
    let bufs = unsafe { msg.bufs() };
    check_limits(msg.name_len, bufs, msg.control_len)?;

    // Winsock uses its own buffer layout (length first), so we need to copy.
    let mut wsa_bufs = [WinSock::WSABUF {
        len: 0,
        buf: ptr::null_mut(),
    }; MAX_SEGMENTS];
    for (wsa_buf, buf) in wsa_bufs.iter_mut().zip(bufs) {
        // NOTE: lengths are checked in `check_limits`.
        wsa_buf.len = buf.len as u32;
        wsa_buf.buf = buf.base;
    }

    let mut wsa_msg = WinSock::WSAMSG {
        name: if msg.name_len == 0 {
            ptr::null_mut()
        } else {
            msg.name.cast()
        },
        namelen: msg.name_len as i32,
        lpBuffers: wsa_bufs.as_mut_ptr(),
        dwBufferCount: bufs.len() as u32,
        Control: WinSock::WSABUF {
            len: msg.control_len as u32,
            buf: if msg.control_len == 0 {
                ptr::null_mut()
            } else {
                msg.control
            },
        },
        dwFlags: msg.flags as u32,
    };

    let mut n: u32 = 0;
    match direction {
        Direction::Send => {
            syscall!(WSASendMsg(
                socket,
                &wsa_msg,
                flags.0 as u32,
                &mut n,
                ptr::null_mut(),
                None
            ))?;
        }
        Direction::Recv => {
            let Some(recv_msg) = wsa_recv_msg(socket)? else {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "WSARecvMsg not available",
                ));
            };
            // `WSARecvMsg` has no flags argument, the flags are passed in the
            // message.
            wsa_msg.dwFlags |= flags.0 as u32;
            let res = unsafe { recv_msg(socket, &mut wsa_msg, &mut n, ptr::null_mut(), None) };
            if res == WinSock::SOCKET_ERROR {
                return Err(last_error());
            }
            msg.name_len = wsa_msg.namelen as usize;
            msg.control_len = wsa_msg.Control.len as usize;
            msg.flags = wsa_msg.dwFlags as i32;
        }
    }
    Ok(n as usize)
}

/// Returns the `WSARecvMsg` function, which must be loaded at runtime.
fn wsa_recv_msg(socket: RawSocket) -> io::Result<WinSock::LPFN_WSARECVMSG> {
    static WSA_RECV_MSG: OnceLock<WinSock::LPFN_WSARECVMSG> = OnceLock::new();
    if let Some(recv_msg) = WSA_RECV_MSG.get() {
        return Ok(*recv_msg);
    }

    let guid = WinSock::WSAID_WSARECVMSG;
    let mut recv_msg: WinSock::LPFN_WSARECVMSG = None;
    let mut n: u32 = 0;
    syscall!(WSAIoctl(
        socket,
        WinSock::SIO_GET_EXTENSION_FUNCTION_POINTER,
        ptr::addr_of!(guid).cast::<c_void>(),
        size_of::<windows_sys::core::GUID>() as u32,
        ptr::addr_of_mut!(recv_msg).cast::<c_void>(),
        size_of::<WinSock::LPFN_WSARECVMSG>() as u32,
        &mut n,
        ptr::null_mut(),
        None
    ))?;
    if recv_msg.is_some() {
        let _ = WSA_RECV_MSG.set(recv_msg);
    }
    Ok(recv_msg)
}
