//! [`Config`]uration module.

use std::io;

use crate::fd::SocketFile;
use crate::net::{Address, Family, NoAddress, Protocol, SocketAddress, Type, WithAddress};
use crate::sys;

/// Configuration of a [`SocketFile`].
///
/// Created by calling [`SocketFile::config`].
///
/// # Examples
///
/// ```
/// use sockfile::net::{Family, Type};
/// use sockfile::SocketFile;
///
/// # fn main() -> std::io::Result<()> {
/// let socket = SocketFile::config(Family::IPV4, Type::DGRAM)
///     .nonblocking(true)
///     .build()?;
/// assert!(socket.is_valid());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
#[must_use = "no socket is created until `sockfile::Config::build` is called"]
pub struct Config<A: Address = NoAddress> {
    family: Family,
    r#type: Type,
    protocol: Protocol,
    nonblocking: bool,
    #[cfg(unix)]
    cloexec: bool,
    address: A::Storage,
}

impl Config<NoAddress> {
    pub(crate) const fn new(family: Family, r#type: Type) -> Config<NoAddress> {
        Config {
            family,
            r#type,
            protocol: Protocol::NONE,
            nonblocking: false,
            #[cfg(unix)]
            cloexec: true,
            address: (),
        }
    }

    /// Store `address` with the socket, see [`WithAddress`].
    ///
    /// The family of `address` should match the family of the socket.
    pub fn address(self, address: SocketAddress) -> Config<WithAddress> {
        Config {
            family: self.family,
            r#type: self.r#type,
            protocol: self.protocol,
            nonblocking: self.nonblocking,
            #[cfg(unix)]
            cloexec: self.cloexec,
            address,
        }
    }
}

impl<A: Address> Config<A> {
    /// Set the protocol, defaults to [`Protocol::NONE`], leaving the choice to
    /// the OS.
    pub const fn protocol(mut self, protocol: Protocol) -> Config<A> {
        self.protocol = protocol;
        self
    }

    /// Put the socket in non-blocking mode, defaults to `false`.
    #[doc(alias = "O_NONBLOCK")]
    #[doc(alias = "FIONBIO")]
    pub const fn nonblocking(mut self, nonblocking: bool) -> Config<A> {
        self.nonblocking = nonblocking;
        self
    }

    /// Set the close-on-exec flag, defaults to `true`.
    #[cfg(unix)]
    #[doc(alias = "FD_CLOEXEC")]
    pub const fn cloexec(mut self, cloexec: bool) -> Config<A> {
        self.cloexec = cloexec;
        self
    }

    /// Build a new [`SocketFile`].
    ///
    /// If setting any of the options fails the socket is closed again.
    #[doc(alias = "socket")]
    pub fn build(self) -> io::Result<SocketFile<A>> {
        let socket = SocketFile::new(self.family, self.r#type, self.protocol)?;
        let fd = socket.native_handle();
        if self.nonblocking {
            sys::set_nonblocking(fd, true)?;
        }
        #[cfg(unix)]
        sys::set_cloexec(fd, self.cloexec)?;
        log::trace!(socket = fd, nonblocking = self.nonblocking; "configured socket");
        Ok(SocketFile::from_parts(socket.into_handle(), self.address))
    }
}
