//! Owned socket handles with scatter/gather message I/O.
//!
//! Sockets come in three strengths of ownership:
//!
//!  * [`Observer`]: a non-owning, `Copy`able view of a socket. This is what
//!    the I/O functions operate on.
//!  * [`SocketHandle`]: owns the socket, ownership can be transferred, but it
//!    does **not** close the socket when dropped. Call [`SocketHandle::close`]
//!    or turn it into a [`SocketFile`].
//!  * [`SocketFile`]: owns the socket and closes it when dropped. This is the
//!    type that should be held on to.
//!
//! All types are generic over an [`Address`] parameter, which determines if a
//! socket address is stored alongside the socket. Sockets created with
//! [`SocketFile::tcp`] or returned by [`accept`] carry their address
//! ([`WithAddress`]), others don't ([`NoAddress`]), in which case no space is
//! used for it.
//!
//! All operations are blocking system calls, nothing is retried. For example
//! [`Observer::read`] makes a single `recv(2)` call and returns however many
//! elements were received.
//!
//! # Examples
//!
//! Sending a message over a TCP connection.
//!
//! ```no_run
//! use std::net::SocketAddr;
//!
//! use sockfile::{accept, connect, listen, SocketFile};
//!
//! # fn main() -> std::io::Result<()> {
//! let address: SocketAddr = "127.0.0.1:8000".parse().unwrap();
//! let listener = SocketFile::tcp(address)?;
//! listen(&listener)?;
//!
//! let client = SocketFile::tcp(address)?;
//! connect(&client)?;
//! let server = accept(&listener)?;
//!
//! let n = client.write(b"ping")?;
//! assert_eq!(n, 4);
//! let mut buf = [0u8; 4];
//! let n = server.read(&mut buf)?;
//! assert_eq!(&buf[..n], b"ping");
//! # Ok(())
//! # }
//! ```

#![warn(
    anonymous_parameters,
    bare_trait_objects,
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unused_extern_crates,
    unused_import_braces,
    variant_size_differences
)]

// # NOTES
//
// All platform specific code lives in the `sys` module, which is either
// `unix/` or `windows/`. Both implement the same set of (crate private)
// functions, the rest of the crate is platform independent.

/// Helper macro to execute a system call that returns an `io::Result`.
#[cfg(unix)]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)? ) ) => {{
        let res = unsafe { libc::$fn($( $arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

/// Helper macro to execute a Winsock call that returns an `io::Result`.
#[cfg(windows)]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)? ) ) => {{
        let res = unsafe { windows_sys::Win32::Networking::WinSock::$fn($( $arg, )*) };
        if res == windows_sys::Win32::Networking::WinSock::SOCKET_ERROR {
            Err(crate::sys::last_error())
        } else {
            Ok(res)
        }
    }};
}

mod config;
pub mod fd;
pub mod io;
pub mod msg;
pub mod net;

#[cfg(unix)]
#[path = "unix/mod.rs"]
mod sys;

#[cfg(windows)]
#[path = "windows/mod.rs"]
mod sys;

#[doc(no_inline)]
pub use config::Config;
#[doc(no_inline)]
pub use fd::{Observer, RawSocket, SocketFile, SocketHandle, INVALID_SOCKET};
#[doc(no_inline)]
pub use msg::{recv_message, send_message, MessageFlags, RecvMessage, SendMessage};
#[cfg(unix)]
#[doc(no_inline)]
pub use msg::{scatter_read, scatter_write};
#[doc(no_inline)]
pub use net::{accept, connect, listen, Address, NoAddress, SocketAddress, WithAddress};

/// Error returned when an argument doesn't fit in the type the OS expects, for
/// example too many buffers in a [`SendMessage`].
///
/// This is `E2BIG` on Unix and `WSAEMSGSIZE` on Windows.
pub fn too_large_error() -> std::io::Error {
    std::io::Error::from_raw_os_error(sys::TOO_LARGE)
}

/// Returns `true` if `err` is the error returned by [`too_large_error`].
pub fn is_too_large_error(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(sys::TOO_LARGE)
}
