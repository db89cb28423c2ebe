//! Networking primitives.
//!
//! Contains the [`Address`] type parameter used by the socket types, the
//! [`SocketAddress`] stored by address carrying sockets and the connection
//! operations: [`connect`], [`listen`] and [`accept`].

use std::hash::{Hash, Hasher};
use std::mem::size_of;
use std::net::SocketAddr;
use std::{fmt, io};

use crate::fd::{Observer, SocketFile};
use crate::sys;

/// Number of pending connections a socket marked with [`listen`] queues.
pub const BACKLOG: i32 = 10;

/// Determines if a socket type stores a [`SocketAddress`].
///
/// This is either [`WithAddress`] or [`NoAddress`]. The choice is made at
/// compile time, sockets without an address don't use any space for it.
pub trait Address: private::Address + Copy + fmt::Debug + 'static {
    /// Address stored alongside the socket.
    type Storage: Copy + Default + fmt::Debug + Send + Sync;

    /// Whether or not an address is stored.
    const PRESENT: bool;
}

mod private {
    pub trait Address {}
}

/// Socket stores its [`SocketAddress`].
///
/// Required for [`connect`] and [`listen`].
#[derive(Copy, Clone, Debug)]
pub enum WithAddress {}

impl Address for WithAddress {
    type Storage = SocketAddress;
    const PRESENT: bool = true;
}

impl private::Address for WithAddress {}

/// Socket doesn't store an address.
#[derive(Copy, Clone, Debug)]
pub enum NoAddress {}

impl Address for NoAddress {
    type Storage = ();
    const PRESENT: bool = false;
}

impl private::Address for NoAddress {}

/// Socket address as understood by the OS.
///
/// This is the native address storage (`sockaddr_storage` on Unix,
/// `SOCKADDR_STORAGE` on Windows) and the number of bytes of it in use. The
/// default value is empty, i.e. zero bytes in use.
#[derive(Copy, Clone)]
pub struct SocketAddress {
    pub(crate) storage: sys::net::Storage,
    pub(crate) length: sys::net::Length,
}

impl SocketAddress {
    /// Maximum size of an address in bytes.
    pub const CAPACITY: usize = size_of::<sys::net::Storage>();

    /// Create an address with all bytes available, but zeroed, to be filled
    /// in by the OS.
    pub(crate) fn uninit() -> SocketAddress {
        SocketAddress {
            storage: sys::net::zeroed_storage(),
            length: SocketAddress::CAPACITY as sys::net::Length,
        }
    }

    /// Number of bytes in use.
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns `true` if no bytes are in use.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Address family of the address.
    pub fn family(&self) -> Family {
        Family(sys::net::storage_family(&self.storage))
    }

    /// Returns the bytes in use.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `length` never exceeds the size of `storage`, see
        // `set_length`, and all bytes of `storage` are initialised.
        unsafe {
            std::slice::from_raw_parts(
                std::ptr::addr_of!(self.storage).cast(),
                self.len().min(SocketAddress::CAPACITY),
            )
        }
    }

    /// Returns the entire storage to be written to by the OS.
    pub(crate) fn storage_mut(&mut self) -> (*mut u8, usize) {
        (
            std::ptr::addr_of_mut!(self.storage).cast(),
            SocketAddress::CAPACITY,
        )
    }

    /// Set the number of bytes in use, limited to [`SocketAddress::CAPACITY`].
    pub(crate) fn set_length(&mut self, length: usize) {
        self.length = length.min(SocketAddress::CAPACITY) as sys::net::Length;
    }

    /// Converts the address into an IPv4 or IPv6 socket address.
    ///
    /// Returns `None` if the address is of another family, or is truncated.
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        sys::net::to_socket_addr(&self.storage, self.length)
    }
}

impl From<SocketAddr> for SocketAddress {
    fn from(address: SocketAddr) -> SocketAddress {
        let (storage, length) = sys::net::from_socket_addr(address);
        SocketAddress { storage, length }
    }
}

impl Default for SocketAddress {
    fn default() -> SocketAddress {
        SocketAddress {
            storage: sys::net::zeroed_storage(),
            length: 0,
        }
    }
}

impl PartialEq for SocketAddress {
    fn eq(&self, other: &SocketAddress) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for SocketAddress {}

impl Hash for SocketAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_socket_addr() {
            Some(address) => address.fmt(f),
            None => f
                .debug_struct("SocketAddress")
                .field("family", &self.family())
                .field("length", &self.len())
                .finish(),
        }
    }
}

/// Address family, or domain, of a socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Family(pub(crate) i32);

impl Family {
    /// Unspecified.
    #[doc(alias = "AF_UNSPEC")]
    pub const UNSPECIFIED: Family = Family(sys::net::AF_UNSPEC);
    /// IPv4.
    #[doc(alias = "AF_INET")]
    pub const IPV4: Family = Family(sys::net::AF_INET);
    /// IPv6.
    #[doc(alias = "AF_INET6")]
    pub const IPV6: Family = Family(sys::net::AF_INET6);
    /// Unix domain sockets.
    #[doc(alias = "AF_UNIX")]
    #[doc(alias = "AF_LOCAL")]
    pub const UNIX: Family = Family(sys::net::AF_UNIX);

    /// Returns the family used by `address`.
    pub const fn for_address(address: &SocketAddr) -> Family {
        match address {
            SocketAddr::V4(_) => Family::IPV4,
            SocketAddr::V6(_) => Family::IPV6,
        }
    }

    /// Create a family from the native value.
    pub const fn from_raw(family: i32) -> Family {
        Family(family)
    }

    /// Returns the native value.
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

/// Socket type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type(pub(crate) i32);

impl Type {
    /// Sequenced, reliable, two-way, connection-based byte streams.
    #[doc(alias = "SOCK_STREAM")]
    pub const STREAM: Type = Type(sys::net::SOCK_STREAM);
    /// Connectionless, unreliable messages of a fixed maximum length.
    #[doc(alias = "SOCK_DGRAM")]
    pub const DGRAM: Type = Type(sys::net::SOCK_DGRAM);
    /// Sequenced, reliable, two-way connection-based data transmission path
    /// for datagrams of fixed maximum length.
    #[doc(alias = "SOCK_SEQPACKET")]
    pub const SEQPACKET: Type = Type(sys::net::SOCK_SEQPACKET);
    /// Raw network protocol access.
    #[doc(alias = "SOCK_RAW")]
    pub const RAW: Type = Type(sys::net::SOCK_RAW);

    /// Create a type from the native value.
    pub const fn from_raw(r#type: i32) -> Type {
        Type(r#type)
    }

    /// Returns the native value.
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

/// Socket protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Protocol(pub(crate) i32);

impl Protocol {
    /// Let the OS pick the protocol based on the family and type.
    pub const NONE: Protocol = Protocol(0);
    /// Transmission Control Protocol.
    #[doc(alias = "IPPROTO_TCP")]
    pub const TCP: Protocol = Protocol(sys::net::IPPROTO_TCP);
    /// User Datagram Protocol.
    #[doc(alias = "IPPROTO_UDP")]
    pub const UDP: Protocol = Protocol(sys::net::IPPROTO_UDP);
    /// Internet Control Message Protocol.
    #[doc(alias = "IPPROTO_ICMP")]
    pub const ICMPV4: Protocol = Protocol(sys::net::IPPROTO_ICMP);
    /// Internet Control Message Protocol for IPv6.
    #[doc(alias = "IPPROTO_ICMPV6")]
    pub const ICMPV6: Protocol = Protocol(sys::net::IPPROTO_ICMPV6);

    /// Create a protocol from the native value.
    pub const fn from_raw(protocol: i32) -> Protocol {
        Protocol(protocol)
    }

    /// Returns the native value.
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

/// Connect `socket` to its stored address.
///
/// Blocks until the connection is established, unless the socket is in
/// non-blocking mode.
pub fn connect(socket: &Observer<WithAddress>) -> io::Result<()> {
    sys::net::connect(socket.native_handle(), socket.address())
}

/// Bind `socket` to its stored address and mark it as accepting connections,
/// queueing up to [`BACKLOG`] connections.
///
/// If binding fails `listen(2)` is never called.
#[doc(alias = "bind")]
pub fn listen(socket: &Observer<WithAddress>) -> io::Result<()> {
    let fd = socket.native_handle();
    sys::net::bind(fd, socket.address())?;
    sys::net::listen(fd, BACKLOG)
}

/// Accept a new connection on the listening `socket`.
///
/// The returned socket stores the address of the peer. `socket` is unaffected
/// and keeps listening.
pub fn accept<A: Address>(socket: &Observer<A>) -> io::Result<SocketFile<WithAddress>> {
    let mut address = SocketAddress::uninit();
    let fd = sys::net::accept(socket.native_handle(), &mut address)?;
    log::trace!(listener = socket.native_handle(), fd = fd; "accepted connection");
    // SAFETY: the OS just gave us `fd`, we're the only owner.
    Ok(unsafe { SocketFile::from_raw_parts(fd, address) })
}

/// Address related methods.
impl<A: Address> Observer<A> {
    /// Returns the address the socket is bound to.
    #[doc(alias = "getsockname")]
    pub fn local_address(&self) -> io::Result<SocketAddress> {
        let mut address = SocketAddress::uninit();
        sys::net::local_address(self.native_handle(), &mut address)?;
        Ok(address)
    }

    /// Returns the address of the connected peer.
    #[doc(alias = "getpeername")]
    pub fn peer_address(&self) -> io::Result<SocketAddress> {
        let mut address = SocketAddress::uninit();
        sys::net::peer_address(self.native_handle(), &mut address)?;
        Ok(address)
    }
}
