//! Socket descriptors.
//!
//! See [`Observer`], [`SocketHandle`] and [`SocketFile`].

use std::mem::{swap, take};
use std::ops::Deref;
use std::{fmt, io};

use crate::config::Config;
use crate::net::{Address, Family, NoAddress, Protocol, SocketAddress, Type, WithAddress};
use crate::sys;

/// Native socket descriptor.
///
/// `RawFd` on Unix, `SOCKET` on Windows.
pub type RawSocket = sys::RawSocket;

/// The invalid socket descriptor.
///
/// `-1` on Unix, `INVALID_SOCKET` on Windows.
pub const INVALID_SOCKET: RawSocket = sys::INVALID_SOCKET;

/// Non-owning view of a socket.
///
/// An `Observer` never opens or closes the socket, it's simply a copy of the
/// descriptor (and optionally its address, see [`Address`]). It's the type the
/// I/O operations, such as [`Observer::read`], are defined on. Use
/// [`SocketFile::observer`] to get one, or use the `Deref` implementation of
/// [`SocketFile`].
///
/// The caller must ensure the socket outlives the observer, using an observer
/// after its socket is closed operates on whatever descriptor the OS reused the
/// number for (or fails with `EBADF`).
#[derive(Copy, Clone)]
pub struct Observer<A: Address = NoAddress> {
    socket: RawSocket,
    address: A::Storage,
}

impl Observer<NoAddress> {
    /// Create an observer for `socket`.
    pub const fn new(socket: RawSocket) -> Observer<NoAddress> {
        Observer {
            socket,
            address: (),
        }
    }
}

impl Observer<WithAddress> {
    /// Create an observer for `socket` with `address`.
    pub const fn with_address(socket: RawSocket, address: SocketAddress) -> Observer<WithAddress> {
        Observer { socket, address }
    }

    /// Returns the address.
    pub const fn address(&self) -> &SocketAddress {
        &self.address
    }

    /// Returns the address mutably.
    pub fn address_mut(&mut self) -> &mut SocketAddress {
        &mut self.address
    }
}

impl<A: Address> Observer<A> {
    /// Returns `true` if the socket is not [`INVALID_SOCKET`].
    pub fn is_valid(&self) -> bool {
        self.socket != INVALID_SOCKET
    }

    /// Returns the socket, replacing it with [`INVALID_SOCKET`].
    ///
    /// The socket is not closed.
    pub fn release(&mut self) -> RawSocket {
        let socket = self.socket;
        self.socket = INVALID_SOCKET;
        socket
    }

    /// Set the socket to [`INVALID_SOCKET`] without closing it.
    pub fn reset(&mut self) {
        self.socket = INVALID_SOCKET;
    }

    /// Set the socket to `socket` without closing the current one.
    pub fn reset_to(&mut self, socket: RawSocket) {
        self.socket = socket;
    }

    /// Swap the socket and address with `other`.
    pub fn swap(&mut self, other: &mut Observer<A>) {
        swap(self, other);
    }

    /// Returns the native socket.
    pub const fn native_handle(&self) -> RawSocket {
        self.socket
    }

    /// Returns the native socket mutably.
    pub fn native_handle_mut(&mut self) -> &mut RawSocket {
        &mut self.socket
    }

    /// Returns `true` if the observer stores an address, i.e. if `A` is
    /// [`WithAddress`].
    pub const fn with_address_info() -> bool {
        A::PRESENT
    }

    /// Drop the address, if any.
    pub fn without_address(self) -> Observer<NoAddress> {
        Observer::new(self.socket)
    }

    pub(crate) const fn from_parts(socket: RawSocket, address: A::Storage) -> Observer<A> {
        Observer { socket, address }
    }

    pub(crate) fn invalid() -> Observer<A> {
        Observer::from_parts(INVALID_SOCKET, A::Storage::default())
    }
}

// NOTE: only Unix shares the representation of sockets and other file
// descriptors, so only there do we implement `AsRawFd`.
#[cfg(unix)]
impl<A: Address> std::os::fd::AsRawFd for Observer<A> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.socket
    }
}

#[cfg(windows)]
impl<A: Address> std::os::windows::io::AsRawSocket for Observer<A> {
    fn as_raw_socket(&self) -> std::os::windows::io::RawSocket {
        self.socket as std::os::windows::io::RawSocket
    }
}

impl<A: Address> fmt::Debug for Observer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Observer");
        d.field("socket", &self.socket);
        if A::PRESENT {
            d.field("address", &self.address);
        }
        d.finish()
    }
}

/// Owned socket that is **not** closed when dropped.
///
/// Ownership can be moved using Rust's move semantics or using
/// [`std::mem::take`], which leaves an invalid handle behind. Use
/// [`SocketHandle::assign`] to replace the socket held.
///
/// Dropping a valid `SocketHandle` leaks the socket, call
/// [`SocketHandle::close`] or convert it into a [`SocketFile`] using
/// [`SocketHandle::into_file`].
///
/// On Unix the socket can be duplicated using [`SocketHandle::try_clone`],
/// Windows has no such operation.
#[must_use = "dropping a `SocketHandle` does not close the socket"]
pub struct SocketHandle<A: Address = NoAddress> {
    inner: Observer<A>,
}

impl SocketHandle<NoAddress> {
    /// Create a new `SocketHandle` from a `RawSocket`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `socket` is valid (or [`INVALID_SOCKET`])
    /// and that it's no longer used by anything other than the returned
    /// `SocketHandle`.
    pub const unsafe fn from_raw(socket: RawSocket) -> SocketHandle<NoAddress> {
        SocketHandle {
            inner: Observer::new(socket),
        }
    }
}

impl SocketHandle<WithAddress> {
    /// Create a new `SocketHandle` from a `RawSocket` and its address.
    ///
    /// # Safety
    ///
    /// See [`SocketHandle::from_raw`].
    pub const unsafe fn from_raw_parts(
        socket: RawSocket,
        address: SocketAddress,
    ) -> SocketHandle<WithAddress> {
        SocketHandle {
            inner: Observer::with_address(socket, address),
        }
    }

    /// Returns the address mutably.
    pub fn address_mut(&mut self) -> &mut SocketAddress {
        self.inner.address_mut()
    }
}

impl<A: Address> SocketHandle<A> {
    /// Returns an [`Observer`] for the socket.
    pub fn observer(&self) -> Observer<A> {
        self.inner
    }

    /// Close the socket, if valid.
    ///
    /// Errors are not returned, but logged. Afterwards the handle is invalid.
    #[doc(alias = "closesocket")]
    pub fn close(&mut self) {
        if self.inner.is_valid() {
            let socket = self.inner.release();
            if let Err(err) = sys::close(socket) {
                log::warn!(socket = socket; "error closing sockfile::SocketHandle: {err}");
            }
        }
    }

    /// Move `other` into `self`, closing the current socket.
    ///
    /// If `self` and `other` hold the same socket nothing is closed and `self`
    /// keeps owning it.
    pub fn assign(&mut self, other: SocketHandle<A>) {
        if other.inner.native_handle() == self.inner.native_handle() {
            // Same socket, `self` keeps ownership.
            return;
        }
        self.close();
        self.inner = other.inner;
    }

    /// Give up ownership of the socket, without closing it.
    ///
    /// Afterwards the handle is invalid.
    pub fn release(&mut self) -> RawSocket {
        self.inner.release()
    }

    /// Convert the handle into a `RawSocket`, without closing it.
    pub fn into_raw(mut self) -> RawSocket {
        self.inner.release()
    }

    /// Convert the handle into a [`SocketFile`], which closes the socket once
    /// dropped.
    pub fn into_file(self) -> SocketFile<A> {
        SocketFile { handle: self }
    }
}

/// Duplication, only available on platforms with `dup(2)`.
#[cfg(unix)]
impl<A: Address> SocketHandle<A> {
    /// Creates a new independently owned handle for the same underlying
    /// socket.
    ///
    /// The new descriptor has the close-on-exec flag set.
    #[doc(alias = "dup")]
    #[doc(alias = "F_DUPFD_CLOEXEC")]
    pub fn try_clone(&self) -> io::Result<SocketHandle<A>> {
        let socket = sys::dup(self.inner.native_handle())?;
        Ok(SocketHandle {
            inner: Observer::from_parts(socket, self.inner.address),
        })
    }

    /// Duplicate the socket into `target`.
    ///
    /// If `target` holds a valid socket the duplicate reuses its descriptor
    /// number, closing the socket `target` held (see `dup2(2)`). Otherwise a
    /// new descriptor is allocated. The address is copied as well.
    #[doc(alias = "dup2")]
    pub fn try_clone_into(&self, target: &mut SocketHandle<A>) -> io::Result<()> {
        let socket = self.inner.native_handle();
        let new = if target.inner.is_valid() {
            sys::dup_into(socket, target.inner.native_handle())?
        } else {
            sys::dup(socket)?
        };
        target.inner = Observer::from_parts(new, self.inner.address);
        Ok(())
    }
}

impl<A: Address> Deref for SocketHandle<A> {
    type Target = Observer<A>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<A: Address> Default for SocketHandle<A> {
    fn default() -> SocketHandle<A> {
        SocketHandle {
            inner: Observer::invalid(),
        }
    }
}

impl<A: Address> fmt::Debug for SocketHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SocketHandle").field(&self.inner).finish()
    }
}

/// Owned socket, closed when dropped.
///
/// This is the type to hold on to, using [`SocketFile::observer`] (or the
/// `Deref` implementation) for I/O.
///
/// Moving a `SocketFile` moves ownership, [`std::mem::take`] leaves an invalid
/// `SocketFile` behind which doesn't close anything. Closing errors are
/// logged, not returned, use [`SocketFile::into_handle`] and
/// [`SocketHandle::close`] to close the socket explicitly.
///
/// # Examples
///
/// ```
/// use sockfile::net::{Family, Protocol, Type};
/// use sockfile::SocketFile;
///
/// # fn main() -> std::io::Result<()> {
/// let socket = SocketFile::new(Family::IPV4, Type::DGRAM, Protocol::UDP)?;
/// assert!(socket.is_valid());
/// # Ok(())
/// # }
/// ```
pub struct SocketFile<A: Address = NoAddress> {
    handle: SocketHandle<A>,
}

impl SocketFile<NoAddress> {
    /// Create a new socket.
    #[doc(alias = "socket")]
    pub fn new(family: Family, r#type: Type, protocol: Protocol) -> io::Result<SocketFile> {
        let socket = sys::socket(family.0, r#type.0, protocol.0)?;
        log::trace!(socket = socket, family = family.0, kind = r#type.0; "created socket");
        // SAFETY: the OS just gave us `socket`, we're the only owner.
        Ok(unsafe { SocketFile::from_raw(socket) })
    }

    /// Create a new socket [`Config`]uration.
    pub const fn config(family: Family, r#type: Type) -> Config {
        Config::new(family, r#type)
    }

    /// Create a new `SocketFile` from a `RawSocket`.
    ///
    /// # Safety
    ///
    /// See [`SocketHandle::from_raw`].
    pub const unsafe fn from_raw(socket: RawSocket) -> SocketFile {
        SocketFile {
            handle: SocketHandle::from_raw(socket),
        }
    }
}

impl SocketFile<WithAddress> {
    /// Create a new TCP socket, storing `address`.
    ///
    /// The address family is determined by `address`. The socket isn't bound
    /// or connected, use [`listen`] or [`connect`] for that.
    ///
    /// [`listen`]: crate::net::listen
    /// [`connect`]: crate::net::connect
    pub fn tcp(address: std::net::SocketAddr) -> io::Result<SocketFile<WithAddress>> {
        let family = Family::for_address(&address);
        let socket = SocketFile::new(family, Type::STREAM, Protocol::NONE)?;
        // SAFETY: we took ownership from `socket`.
        Ok(unsafe { SocketFile::from_raw_parts(socket.into_raw(), address.into()) })
    }

    /// Create a new `SocketFile` from a `RawSocket` and its address.
    ///
    /// # Safety
    ///
    /// See [`SocketHandle::from_raw`].
    pub const unsafe fn from_raw_parts(
        socket: RawSocket,
        address: SocketAddress,
    ) -> SocketFile<WithAddress> {
        SocketFile {
            handle: SocketHandle::from_raw_parts(socket, address),
        }
    }

    /// Returns the address mutably.
    pub fn address_mut(&mut self) -> &mut SocketAddress {
        self.handle.address_mut()
    }
}

impl<A: Address> SocketFile<A> {
    /// Returns an [`Observer`] for the socket.
    pub fn observer(&self) -> Observer<A> {
        self.handle.observer()
    }

    /// Move `other` into `self`, closing the current socket.
    ///
    /// If `self` and `other` hold the same socket nothing is closed and `self`
    /// keeps owning it.
    pub fn assign(&mut self, mut other: SocketFile<A>) {
        self.handle.assign(take(&mut other.handle));
    }

    /// Convert into a [`SocketHandle`], which doesn't close the socket when
    /// dropped.
    pub fn into_handle(mut self) -> SocketHandle<A> {
        take(&mut self.handle)
    }

    /// Convert into a `RawSocket`, without closing it.
    pub fn into_raw(self) -> RawSocket {
        self.into_handle().into_raw()
    }

    pub(crate) fn from_parts(handle: SocketHandle<NoAddress>, address: A::Storage) -> SocketFile<A> {
        SocketFile {
            handle: SocketHandle {
                inner: Observer::from_parts(handle.into_raw(), address),
            },
        }
    }
}

/// Duplication, only available on platforms with `dup(2)`.
#[cfg(unix)]
impl<A: Address> SocketFile<A> {
    /// Creates a new independently owned `SocketFile` for the same underlying
    /// socket.
    ///
    /// See [`SocketHandle::try_clone`].
    #[doc(alias = "dup")]
    pub fn try_clone(&self) -> io::Result<SocketFile<A>> {
        self.handle.try_clone().map(SocketHandle::into_file)
    }

    /// Duplicate the socket into `target`.
    ///
    /// See [`SocketHandle::try_clone_into`].
    #[doc(alias = "dup2")]
    pub fn try_clone_into(&self, target: &mut SocketFile<A>) -> io::Result<()> {
        self.handle.try_clone_into(&mut target.handle)
    }
}

impl<A: Address> Deref for SocketFile<A> {
    type Target = Observer<A>;

    fn deref(&self) -> &Self::Target {
        &self.handle.inner
    }
}

impl<A: Address> Default for SocketFile<A> {
    fn default() -> SocketFile<A> {
        SocketFile {
            handle: SocketHandle::default(),
        }
    }
}

impl<A: Address> From<SocketHandle<A>> for SocketFile<A> {
    fn from(handle: SocketHandle<A>) -> SocketFile<A> {
        handle.into_file()
    }
}

impl<A: Address> fmt::Debug for SocketFile<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SocketFile").field(&self.handle.inner).finish()
    }
}

impl<A: Address> Drop for SocketFile<A> {
    fn drop(&mut self) {
        if self.handle.inner.is_valid() {
            let socket = self.handle.inner.native_handle();
            if let Err(err) = sys::close(socket) {
                log::warn!(socket = socket; "error closing sockfile::SocketFile: {err}");
            }
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

    use super::SocketFile;
    use crate::net::{Address, NoAddress};

    impl<A: Address> AsRawFd for SocketFile<A> {
        fn as_raw_fd(&self) -> RawFd {
            self.native_handle()
        }
    }

    impl<A: Address> IntoRawFd for SocketFile<A> {
        fn into_raw_fd(self) -> RawFd {
            self.into_raw()
        }
    }

    impl FromRawFd for SocketFile<NoAddress> {
        unsafe fn from_raw_fd(fd: RawFd) -> SocketFile<NoAddress> {
            SocketFile::from_raw(fd)
        }
    }

    impl From<OwnedFd> for SocketFile<NoAddress> {
        fn from(fd: OwnedFd) -> SocketFile<NoAddress> {
            // SAFETY: `OwnedFd` ensures `fd` is valid and owned.
            unsafe { SocketFile::from_raw(fd.into_raw_fd()) }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::os::windows::io::{
        AsRawSocket, FromRawSocket, IntoRawSocket, OwnedSocket, RawSocket,
    };

    use super::SocketFile;
    use crate::net::{Address, NoAddress};

    impl<A: Address> AsRawSocket for SocketFile<A> {
        fn as_raw_socket(&self) -> RawSocket {
            self.native_handle() as RawSocket
        }
    }

    impl<A: Address> IntoRawSocket for SocketFile<A> {
        fn into_raw_socket(self) -> RawSocket {
            self.into_raw() as RawSocket
        }
    }

    impl FromRawSocket for SocketFile<NoAddress> {
        unsafe fn from_raw_socket(socket: RawSocket) -> SocketFile<NoAddress> {
            SocketFile::from_raw(socket as crate::fd::RawSocket)
        }
    }

    impl From<OwnedSocket> for SocketFile<NoAddress> {
        fn from(socket: OwnedSocket) -> SocketFile<NoAddress> {
            // SAFETY: `OwnedSocket` ensures `socket` is valid and owned.
            unsafe { SocketFile::from_raw(socket.into_raw_socket() as crate::fd::RawSocket) }
        }
    }
}
