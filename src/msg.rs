//! Scatter/gather message I/O.
//!
//! [`send_message`] and [`recv_message`] transfer a message, described by
//! [`SendMessage`] and [`RecvMessage`] respectively, in a single system call.
//! A message consists of any number (up to [`MAX_SEGMENTS`]) of buffers, an
//! optional address and optional control (ancillary) data.
//!
//! On Unix [`scatter_read`] and [`scatter_write`] are shorthands for messages
//! without address and control data, i.e. `readv(2)`/`writev(2)` for sockets.

use std::ops::{BitOr, BitOrAssign};
use std::{fmt, io, ptr};

use crate::fd::Observer;
use crate::io::{raw_bufs, raw_bufs_mut, IoBuf, IoBufMut, RawBuf};
use crate::net::{Address, SocketAddress};
use crate::{sys, too_large_error};

/// Maximum number of buffers in a single message.
///
/// Windows copies the buffers into a fixed size array, which holds this many
/// buffers.
pub const MAX_SEGMENTS: usize = 4096;

/// Flags passed to [`send_message`] and [`recv_message`].
///
/// Flags can be combined using `|`.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct MessageFlags(pub(crate) i32);

impl MessageFlags {
    /// No flags.
    pub const NONE: MessageFlags = MessageFlags(0);
    /// Return data without removing it from the receive queue.
    #[doc(alias = "MSG_PEEK")]
    pub const PEEK: MessageFlags = MessageFlags(sys::msg::MSG_PEEK);
    /// Send or receive out-of-band data.
    #[doc(alias = "MSG_OOB")]
    pub const OOB: MessageFlags = MessageFlags(sys::msg::MSG_OOB);
    /// Block until the full request is satisfied.
    #[doc(alias = "MSG_WAITALL")]
    pub const WAIT_ALL: MessageFlags = MessageFlags(sys::msg::MSG_WAITALL);
    /// Don't use a gateway to send the message.
    #[doc(alias = "MSG_DONTROUTE")]
    pub const DONT_ROUTE: MessageFlags = MessageFlags(sys::msg::MSG_DONTROUTE);
    /// Non-blocking operation, for this call only.
    #[cfg(any(target_os = "android", target_os = "linux"))]
    #[doc(alias = "MSG_DONTWAIT")]
    pub const DONT_WAIT: MessageFlags = MessageFlags(sys::msg::MSG_DONTWAIT);
    /// Don't generate a `SIGPIPE` signal if the peer closed the connection.
    #[cfg(any(target_os = "android", target_os = "linux"))]
    #[doc(alias = "MSG_NOSIGNAL")]
    pub const NO_SIGNAL: MessageFlags = MessageFlags(sys::msg::MSG_NOSIGNAL);

    /// Create flags from the native value.
    pub const fn from_raw(flags: i32) -> MessageFlags {
        MessageFlags(flags)
    }

    /// Returns the native value.
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Returns `true` if all flags in `other` are set in `self`.
    pub const fn contains(self, other: MessageFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MessageFlags {
    type Output = MessageFlags;

    fn bitor(self, rhs: MessageFlags) -> MessageFlags {
        MessageFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for MessageFlags {
    fn bitor_assign(&mut self, rhs: MessageFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for MessageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageFlags({:#x})", self.0)
    }
}

/// Message to send using [`send_message`].
///
/// # Examples
///
/// ```no_run
/// use sockfile::io::IoBuf;
/// use sockfile::{send_message, MessageFlags, SendMessage, SocketAddress};
/// # fn f(socket: sockfile::Observer, address: SocketAddress) -> std::io::Result<()> {
///
/// let bufs = [IoBuf::new(b"Hello"), IoBuf::new(b", world!")];
/// let msg = SendMessage::new(&bufs).with_address(&address);
/// let n = send_message(&socket, &msg, MessageFlags::NONE)?;
/// # Ok(())
/// # }
/// ```
#[derive(Copy, Clone, Debug)]
pub struct SendMessage<'a> {
    name: &'a [u8],
    iov: &'a [IoBuf<'a>],
    control: &'a [u8],
    flags: i32,
}

impl<'a> SendMessage<'a> {
    /// Create a message of `iov`, without address and control data.
    pub const fn new(iov: &'a [IoBuf<'a>]) -> SendMessage<'a> {
        SendMessage {
            name: &[],
            iov,
            control: &[],
            flags: 0,
        }
    }

    /// Set the destination address as raw bytes.
    pub const fn with_name(mut self, name: &'a [u8]) -> SendMessage<'a> {
        self.name = name;
        self
    }

    /// Set the destination address.
    pub fn with_address(self, address: &'a SocketAddress) -> SendMessage<'a> {
        self.with_name(address.as_bytes())
    }

    /// Set the control (ancillary) data.
    pub const fn with_control(mut self, control: &'a [u8]) -> SendMessage<'a> {
        self.control = control;
        self
    }

    /// Set the message header flags (`msg_flags`).
    ///
    /// Most OSes ignore these flags when sending, see [`MessageFlags`] for the
    /// flags passed to the call.
    pub const fn with_flags(mut self, flags: i32) -> SendMessage<'a> {
        self.flags = flags;
        self
    }

    /// Total number of bytes in all buffers.
    pub fn len(&self) -> usize {
        self.iov.iter().map(IoBuf::len).sum()
    }

    /// Returns `true` if all buffers are empty.
    pub fn is_empty(&self) -> bool {
        self.iov.iter().all(IoBuf::is_empty)
    }
}

/// Message to receive into using [`recv_message`].
///
/// After a successful call the number of bytes written into the address and
/// control buffers, and the flags of the received message, are available.
#[derive(Debug)]
pub struct RecvMessage<'a, 'b> {
    iov: &'a mut [IoBufMut<'b>],
    name: Name<'a>,
    control: &'a mut [u8],
    name_len: usize,
    control_len: usize,
    flags: i32,
}

#[derive(Debug)]
enum Name<'a> {
    None,
    Bytes(&'a mut [u8]),
    Address(&'a mut SocketAddress),
}

impl<'a, 'b> RecvMessage<'a, 'b> {
    /// Create a message to receive into `iov`, ignoring the source address
    /// and control data.
    pub fn new(iov: &'a mut [IoBufMut<'b>]) -> RecvMessage<'a, 'b> {
        RecvMessage {
            iov,
            name: Name::None,
            control: &mut [],
            name_len: 0,
            control_len: 0,
            flags: 0,
        }
    }

    /// Receive the source address into `name`.
    pub fn with_name(mut self, name: &'a mut [u8]) -> RecvMessage<'a, 'b> {
        self.name = Name::Bytes(name);
        self
    }

    /// Receive the source address into `address`.
    ///
    /// The length of `address` is updated after the call.
    pub fn with_address(mut self, address: &'a mut SocketAddress) -> RecvMessage<'a, 'b> {
        self.name = Name::Address(address);
        self
    }

    /// Receive control (ancillary) data into `control`.
    pub fn with_control(mut self, control: &'a mut [u8]) -> RecvMessage<'a, 'b> {
        self.control = control;
        self
    }

    /// Set the message header flags (`msg_flags`) passed to the OS.
    pub fn with_flags(mut self, flags: i32) -> RecvMessage<'a, 'b> {
        self.flags = flags;
        self
    }

    /// Number of bytes of the address received.
    pub fn name_len(&self) -> usize {
        self.name_len
    }

    /// Number of bytes of control data received.
    pub fn control_len(&self) -> usize {
        self.control_len
    }

    /// Returns the control data received.
    pub fn control(&self) -> &[u8] {
        &self.control[..self.control_len.min(self.control.len())]
    }

    /// Flags of the received message, e.g. `MSG_TRUNC`.
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// Returns the buffers.
    pub fn bufs(&self) -> &[IoBufMut<'b>] {
        &*self.iov
    }
}

/// Message as passed to the platform specific code.
///
/// The pointers are only valid for the duration of a single call.
pub(crate) struct RawMessage {
    pub(crate) name: *mut u8,
    pub(crate) name_len: usize,
    pub(crate) iov: *mut RawBuf,
    pub(crate) iov_len: usize,
    pub(crate) control: *mut u8,
    pub(crate) control_len: usize,
    pub(crate) flags: i32,
}

impl RawMessage {
    /// Returns the buffers.
    ///
    /// # Safety
    ///
    /// `iov` and `iov_len` must be valid.
    #[cfg_attr(not(windows), allow(dead_code))]
    pub(crate) unsafe fn bufs(&self) -> &[RawBuf] {
        if self.iov_len == 0 {
            &[]
        } else {
            std::slice::from_raw_parts(self.iov, self.iov_len)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Send,
    Recv,
}

/// Checks that the message fits in the types Windows uses.
///
/// Returns [`too_large_error`] if the address length doesn't fit in an `i32`,
/// the control length doesn't fit in an `u32`, there are more than
/// [`MAX_SEGMENTS`] buffers or any single buffer is longer than `u32::MAX`.
#[cfg_attr(not(any(windows, test)), allow(dead_code))]
pub(crate) fn check_limits(name_len: usize, bufs: &[RawBuf], control_len: usize) -> io::Result<()> {
    if name_len > i32::MAX as usize
        || control_len > u32::MAX as usize
        || bufs.len() > MAX_SEGMENTS
        || bufs.iter().any(|buf| buf.len > u32::MAX as usize)
    {
        Err(too_large_error())
    } else {
        Ok(())
    }
}

/// Send the message `msg` on `socket`.
///
/// Returns the number of bytes send.
#[doc(alias = "sendmsg")]
#[doc(alias = "WSASendMsg")]
pub fn send_message<A: Address>(
    socket: &Observer<A>,
    msg: &SendMessage<'_>,
    flags: MessageFlags,
) -> io::Result<usize> {
    let iov = raw_bufs(msg.iov);
    let mut raw = RawMessage {
        name: msg.name.as_ptr().cast_mut(),
        name_len: msg.name.len(),
        iov: iov.as_ptr().cast_mut(),
        iov_len: iov.len(),
        control: msg.control.as_ptr().cast_mut(),
        control_len: msg.control.len(),
        flags: msg.flags,
    };
    sys::msg::transfer(socket.native_handle(), &mut raw, Direction::Send, flags)
}

/// Receive a message into `msg` from `socket`.
///
/// Returns the number of bytes received.
#[doc(alias = "recvmsg")]
#[doc(alias = "WSARecvMsg")]
pub fn recv_message<A: Address>(
    socket: &Observer<A>,
    msg: &mut RecvMessage<'_, '_>,
    flags: MessageFlags,
) -> io::Result<usize> {
    let (name, name_len) = match &mut msg.name {
        Name::None => (ptr::null_mut(), 0),
        Name::Bytes(name) => (name.as_mut_ptr(), name.len()),
        Name::Address(address) => address.storage_mut(),
    };
    let iov = raw_bufs_mut(&mut *msg.iov);
    let mut raw = RawMessage {
        name,
        name_len,
        iov: iov.as_mut_ptr(),
        iov_len: iov.len(),
        control: msg.control.as_mut_ptr(),
        control_len: msg.control.len(),
        flags: msg.flags,
    };
    let n = sys::msg::transfer(socket.native_handle(), &mut raw, Direction::Recv, flags)?;
    msg.name_len = raw.name_len;
    msg.control_len = raw.control_len;
    msg.flags = raw.flags;
    if let Name::Address(address) = &mut msg.name {
        address.set_length(raw.name_len);
    }
    Ok(n)
}

/// Receive into multiple buffers, see `readv(2)`.
#[cfg(unix)]
#[doc(alias = "readv")]
pub fn scatter_read<A: Address>(socket: &Observer<A>, bufs: &mut [IoBufMut<'_>]) -> io::Result<usize> {
    recv_message(socket, &mut RecvMessage::new(bufs), MessageFlags::NONE)
}

/// Send from multiple buffers, see `writev(2)`.
#[cfg(unix)]
#[doc(alias = "writev")]
pub fn scatter_write<A: Address>(socket: &Observer<A>, bufs: &[IoBuf<'_>]) -> io::Result<usize> {
    send_message(socket, &SendMessage::new(bufs), MessageFlags::NONE)
}
