use std::io;
use std::mem::{size_of, zeroed};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;

use crate::net::SocketAddress;
use crate::sys::RawSocket;

pub(crate) type Storage = libc::sockaddr_storage;
pub(crate) type Length = libc::socklen_t;

pub(crate) const AF_UNSPEC: i32 = libc::AF_UNSPEC;
pub(crate) const AF_INET: i32 = libc::AF_INET;
pub(crate) const AF_INET6: i32 = libc::AF_INET6;
pub(crate) const AF_UNIX: i32 = libc::AF_UNIX;

pub(crate) const SOCK_STREAM: i32 = libc::SOCK_STREAM;
pub(crate) const SOCK_DGRAM: i32 = libc::SOCK_DGRAM;
pub(crate) const SOCK_SEQPACKET: i32 = libc::SOCK_SEQPACKET;
pub(crate) const SOCK_RAW: i32 = libc::SOCK_RAW;

pub(crate) const IPPROTO_TCP: i32 = libc::IPPROTO_TCP;
pub(crate) const IPPROTO_UDP: i32 = libc::IPPROTO_UDP;
pub(crate) const IPPROTO_ICMP: i32 = libc::IPPROTO_ICMP;
pub(crate) const IPPROTO_ICMPV6: i32 = libc::IPPROTO_ICMPV6;

pub(crate) fn zeroed_storage() -> Storage {
    // SAFETY: all zero is a valid `sockaddr_storage`.
    unsafe { zeroed() }
}

pub(crate) fn storage_family(storage: &Storage) -> i32 {
    i32::from(storage.ss_family)
}

pub(crate) fn to_socket_addr(storage: &Storage, length: Length) -> Option<SocketAddr> {
    let length = length as usize;
    match i32::from(storage.ss_family) {
        libc::AF_INET if length >= size_of::<libc::sockaddr_in>() => {
            // SAFETY: if the `ss_family` field is `AF_INET` then storage must
            // be a `sockaddr_in`.
            let addr: &libc::sockaddr_in = unsafe { &*(storage as *const Storage).cast() };
            let ip = Ipv4Addr::from(addr.sin_addr.s_addr.to_ne_bytes());
            let port = u16::from_be(addr.sin_port);
            Some(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }
        libc::AF_INET6 if length >= size_of::<libc::sockaddr_in6>() => {
            // SAFETY: if the `ss_family` field is `AF_INET6` then storage must
            // be a `sockaddr_in6`.
            let addr: &libc::sockaddr_in6 = unsafe { &*(storage as *const Storage).cast() };
            let ip = Ipv6Addr::from(addr.sin6_addr.s6_addr);
            let port = u16::from_be(addr.sin6_port);
            Some(SocketAddr::V6(SocketAddrV6::new(
                ip,
                port,
                addr.sin6_flowinfo,
                addr.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

pub(crate) fn from_socket_addr(address: SocketAddr) -> (Storage, Length) {
    let mut storage = zeroed_storage();
    let length = match address {
        SocketAddr::V4(address) => {
            // SAFETY: `sockaddr_storage` is large enough and suitably aligned
            // for any address type.
            let addr: &mut libc::sockaddr_in = unsafe { &mut *ptr::addr_of_mut!(storage).cast() };
            addr.sin_family = libc::AF_INET as libc::sa_family_t;
            addr.sin_port = address.port().to_be();
            addr.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(address.ip().octets()),
            };
            size_of::<libc::sockaddr_in>()
        }
        SocketAddr::V6(address) => {
            // SAFETY: see above.
            let addr: &mut libc::sockaddr_in6 = unsafe { &mut *ptr::addr_of_mut!(storage).cast() };
            addr.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            addr.sin6_port = address.port().to_be();
            addr.sin6_flowinfo = address.flowinfo();
            addr.sin6_addr = libc::in6_addr {
                s6_addr: address.ip().octets(),
            };
            addr.sin6_scope_id = address.scope_id();
            size_of::<libc::sockaddr_in6>()
        }
    };
    (storage, length as Length)
}

fn sockaddr_ptr(address: &SocketAddress) -> *const libc::sockaddr {
    ptr::addr_of!(address.storage).cast()
}

pub(crate) fn connect(socket: RawSocket, address: &SocketAddress) -> io::Result<()> {
    syscall!(connect(socket, sockaddr_ptr(address), address.length)).map(|_| ())
}

pub(crate) fn bind(socket: RawSocket, address: &SocketAddress) -> io::Result<()> {
    syscall!(bind(socket, sockaddr_ptr(address), address.length)).map(|_| ())
}

pub(crate) fn listen(socket: RawSocket, backlog: i32) -> io::Result<()> {
    syscall!(listen(socket, backlog)).map(|_| ())
}

pub(crate) fn accept(socket: RawSocket, address: &mut SocketAddress) -> io::Result<RawSocket> {
    let (storage, capacity) = address.storage_mut();
    let mut length = capacity as libc::socklen_t;

    #[cfg(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux",
        target_os = "netbsd",
        target_os = "openbsd",
    ))]
    let fd = syscall!(accept4(
        socket,
        storage.cast(),
        &mut length,
        libc::SOCK_CLOEXEC
    ))?;

    #[cfg(not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux",
        target_os = "netbsd",
        target_os = "openbsd",
    )))]
    let fd = {
        let fd = syscall!(accept(socket, storage.cast(), &mut length))?;
        if let Err(err) = super::set_cloexec(fd, true) {
            let _ = super::close(fd);
            return Err(err);
        }
        fd
    };

    address.set_length(length as usize);
    Ok(fd)
}

pub(crate) fn local_address(socket: RawSocket, address: &mut SocketAddress) -> io::Result<()> {
    let (storage, capacity) = address.storage_mut();
    let mut length = capacity as libc::socklen_t;
    syscall!(getsockname(socket, storage.cast(), &mut length))?;
    address.set_length(length as usize);
    Ok(())
}

pub(crate) fn peer_address(socket: RawSocket, address: &mut SocketAddress) -> io::Result<()> {
    let (storage, capacity) = address.storage_mut();
    let mut length = capacity as libc::socklen_t;
    syscall!(getpeername(socket, storage.cast(), &mut length))?;
    address.set_length(length as usize);
    Ok(())
}
