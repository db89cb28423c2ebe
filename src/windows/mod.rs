//! Windows implementation, using Winsock through `windows-sys`.

use std::io;
use std::mem::zeroed;
use std::ptr;
use std::sync::Once;

use windows_sys::Win32::Networking::WinSock;

pub(crate) mod msg;
pub(crate) mod net;

pub(crate) type RawSocket = WinSock::SOCKET;

pub(crate) const INVALID_SOCKET: RawSocket = WinSock::INVALID_SOCKET;

pub(crate) const TOO_LARGE: i32 = WinSock::WSAEMSGSIZE;

/// Returns the last Winsock error.
pub(crate) fn last_error() -> io::Error {
    io::Error::from_raw_os_error(unsafe { WinSock::WSAGetLastError() })
}

/// Initialise Winsock, once.
fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // SAFETY: all zero is valid `WSADATA`.
        let mut data: WinSock::WSADATA = unsafe { zeroed() };
        // Version 2.2.
        let res = unsafe { WinSock::WSAStartup(0x202, &mut data) };
        if res != 0 {
            // Creating a socket will fail with `WSANOTINITIALISED`.
            log::error!(error = res; "failed to initialise Winsock");
        }
    });
}

pub(crate) fn socket(family: i32, r#type: i32, protocol: i32) -> io::Result<RawSocket> {
    init();
    let flags = WinSock::WSA_FLAG_OVERLAPPED | WinSock::WSA_FLAG_NO_HANDLE_INHERIT;
    let socket =
        unsafe { WinSock::WSASocketW(family, r#type, protocol, ptr::null(), 0, flags) };
    if socket == INVALID_SOCKET {
        Err(last_error())
    } else {
        Ok(socket)
    }
}

pub(crate) fn close(socket: RawSocket) -> io::Result<()> {
    syscall!(closesocket(socket)).map(|_| ())
}

/// Winsock uses `i32` for lengths, larger buffers are only partially used.
fn clamp_len(len: usize) -> i32 {
    len.min(i32::MAX as usize) as i32
}

pub(crate) fn recv(socket: RawSocket, buf: *mut u8, len: usize, flags: i32) -> io::Result<usize> {
    syscall!(recv(socket, buf, clamp_len(len), flags)).map(|n| n as usize)
}

pub(crate) fn send(socket: RawSocket, buf: *const u8, len: usize, flags: i32) -> io::Result<usize> {
    syscall!(send(socket, buf, clamp_len(len), flags)).map(|n| n as usize)
}

pub(crate) fn set_nonblocking(socket: RawSocket, nonblocking: bool) -> io::Result<()> {
    let mut nonblocking = u32::from(nonblocking);
    syscall!(ioctlsocket(socket, WinSock::FIONBIO, &mut nonblocking)).map(|_| ())
}
