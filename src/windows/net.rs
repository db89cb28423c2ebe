use std::io;
use std::mem::{size_of, zeroed};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::ptr;

use windows_sys::Win32::Networking::WinSock;

use crate::net::SocketAddress;
use crate::sys::{last_error, RawSocket, INVALID_SOCKET};

pub(crate) type Storage = WinSock::SOCKADDR_STORAGE;
pub(crate) type Length = i32;

pub(crate) const AF_UNSPEC: i32 = WinSock::AF_UNSPEC as i32;
pub(crate) const AF_INET: i32 = WinSock::AF_INET as i32;
pub(crate) const AF_INET6: i32 = WinSock::AF_INET6 as i32;
pub(crate) const AF_UNIX: i32 = WinSock::AF_UNIX as i32;

pub(crate) const SOCK_STREAM: i32 = WinSock::SOCK_STREAM as i32;
pub(crate) const SOCK_DGRAM: i32 = WinSock::SOCK_DGRAM as i32;
pub(crate) const SOCK_SEQPACKET: i32 = WinSock::SOCK_SEQPACKET as i32;
pub(crate) const SOCK_RAW: i32 = WinSock::SOCK_RAW as i32;

pub(crate) const IPPROTO_TCP: i32 = WinSock::IPPROTO_TCP as i32;
pub(crate) const IPPROTO_UDP: i32 = WinSock::IPPROTO_UDP as i32;
pub(crate) const IPPROTO_ICMP: i32 = WinSock::IPPROTO_ICMP as i32;
pub(crate) const IPPROTO_ICMPV6: i32 = WinSock::IPPROTO_ICMPV6 as i32;

pub(crate) fn zeroed_storage() -> Storage {
    // SAFETY: all zero is a valid `SOCKADDR_STORAGE`.
    unsafe { zeroed() }
}

pub(crate) fn storage_family(storage: &Storage) -> i32 {
    i32::from(storage.ss_family)
}

pub(crate) fn to_socket_addr(storage: &Storage, length: Length) -> Option<SocketAddr> {
    let length = usize::try_from(length).ok()?;
    match i32::from(storage.ss_family) {
        AF_INET if length >= size_of::<WinSock::SOCKADDR_IN>() => {
            // SAFETY: if the `ss_family` field is `AF_INET` then storage must
            // be a `SOCKADDR_IN`.
            let addr: &WinSock::SOCKADDR_IN = unsafe { &*(storage as *const Storage).cast() };
            // SAFETY: all variants of the union are plain integers.
            let ip = unsafe { addr.sin_addr.S_un.S_addr };
            let ip = Ipv4Addr::from(ip.to_ne_bytes());
            let port = u16::from_be(addr.sin_port);
            Some(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }
        AF_INET6 if length >= size_of::<WinSock::SOCKADDR_IN6>() => {
            // SAFETY: if the `ss_family` field is `AF_INET6` then storage must
            // be a `SOCKADDR_IN6`.
            let addr: &WinSock::SOCKADDR_IN6 = unsafe { &*(storage as *const Storage).cast() };
            // SAFETY: all variants of the unions are plain integers.
            let (ip, scope_id) = unsafe { (addr.sin6_addr.u.Byte, addr.Anonymous.sin6_scope_id) };
            let port = u16::from_be(addr.sin6_port);
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(ip),
                port,
                addr.sin6_flowinfo,
                scope_id,
            )))
        }
        _ => None,
    }
}

pub(crate) fn from_socket_addr(address: SocketAddr) -> (Storage, Length) {
    let mut storage = zeroed_storage();
    let length = match address {
        SocketAddr::V4(address) => {
            // SAFETY: `SOCKADDR_STORAGE` is large enough and suitably aligned
            // for any address type.
            let addr: &mut WinSock::SOCKADDR_IN =
                unsafe { &mut *ptr::addr_of_mut!(storage).cast() };
            addr.sin_family = WinSock::AF_INET;
            addr.sin_port = address.port().to_be();
            addr.sin_addr = WinSock::IN_ADDR {
                S_un: WinSock::IN_ADDR_0 {
                    S_addr: u32::from_ne_bytes(address.ip().octets()),
                },
            };
            size_of::<WinSock::SOCKADDR_IN>()
        }
        SocketAddr::V6(address) => {
            // SAFETY: see above.
            let addr: &mut WinSock::SOCKADDR_IN6 =
                unsafe { &mut *ptr::addr_of_mut!(storage).cast() };
            addr.sin6_family = WinSock::AF_INET6;
            addr.sin6_port = address.port().to_be();
            addr.sin6_flowinfo = address.flowinfo();
            addr.sin6_addr = WinSock::IN6_ADDR {
                u: WinSock::IN6_ADDR_0 {
                    Byte: address.ip().octets(),
                },
            };
            addr.Anonymous = WinSock::SOCKADDR_IN6_0 {
                sin6_scope_id: address.scope_id(),
            };
            size_of::<WinSock::SOCKADDR_IN6>()
        }
    };
    (storage, length as Length)
}

fn sockaddr_ptr(address: &SocketAddress) -> *const WinSock::SOCKADDR {
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
    let mut length = capacity as i32;
    let fd = unsafe { WinSock::accept(socket, storage.cast(), &mut length) };
    if fd == INVALID_SOCKET {
        return Err(last_error());
    }
    address.set_length(length as usize);
    Ok(fd)
}

pub(crate) fn local_address(socket: RawSocket, address: &mut SocketAddress) -> io::Result<()> {
    let (storage, capacity) = address.storage_mut();
    let mut length = capacity as i32;
    syscall!(getsockname(socket, storage.cast(), &mut length))?;
    address.set_length(length as usize);
    Ok(())
}

pub(crate) fn peer_address(socket: RawSocket, address: &mut SocketAddress) -> io::Result<()> {
    let (storage, capacity) = address.storage_mut();
    let mut length = capacity as i32;
    syscall!(getpeername(socket, storage.cast(), &mut length))?;
    address.set_length(length as usize);
    Ok(())
}
