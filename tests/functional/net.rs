use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use sockfile::net::{Family, Protocol, Type, BACKLOG};
use sockfile::{accept, connect, listen, SocketAddress, SocketFile};

use crate::util::{any_local_ipv4, expect_io_error_kind, init, tcp_listener, tcp_pair};

const DATA1: &[u8] = b"Hello, World!";
const DATA2: &[u8] = b"Hello, Mars!";

#[test]
fn family_for_address() {
    assert_eq!(Family::for_address(&any_local_ipv4()), Family::IPV4);
    let address = SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 0, 0, 0));
    assert_eq!(Family::for_address(&address), Family::IPV6);
    assert_eq!(Family::from_raw(Family::IPV4.as_raw()), Family::IPV4);
    assert_ne!(Type::STREAM, Type::DGRAM);
    assert_eq!(Protocol::NONE.as_raw(), 0);
}

#[test]
fn socket_address_ipv4() {
    let address = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 1, 2, 3), 8080));
    let socket_address = SocketAddress::from(address);
    assert!(!socket_address.is_empty());
    assert!(socket_address.len() <= SocketAddress::CAPACITY);
    assert_eq!(socket_address.family(), Family::IPV4);
    assert_eq!(socket_address.to_socket_addr(), Some(address));
    assert_eq!(format!("{socket_address:?}"), "127.1.2.3:8080");
}

#[test]
fn socket_address_ipv6() {
    let address = SocketAddr::V6(SocketAddrV6::new(
        Ipv6Addr::new(0xfe80, 0, 0, 0, 1, 2, 3, 4),
        9000,
        12,
        3,
    ));
    let socket_address = SocketAddress::from(address);
    assert_eq!(socket_address.family(), Family::IPV6);
    assert_eq!(socket_address.to_socket_addr(), Some(address));
    assert_ne!(socket_address, SocketAddress::from(any_local_ipv4()));
}

#[test]
fn socket_address_default_is_empty() {
    let address = SocketAddress::default();
    assert!(address.is_empty());
    assert_eq!(address.len(), 0);
    assert!(address.as_bytes().is_empty());
    assert_eq!(address.family(), Family::UNSPECIFIED);
    assert_eq!(address.to_socket_addr(), None);
}

#[test]
fn backlog() {
    assert_eq!(BACKLOG, 10);
}

#[test]
fn tcp_ping() {
    init();
    let (client, server) = tcp_pair();

    assert_eq!(client.write(b"ping").expect("failed to write"), 4);
    let mut buf = [0u8; 4];
    assert_eq!(server.read(&mut buf).expect("failed to read"), 4);
    assert_eq!(&buf, b"ping");

    assert_eq!(server.write(b"pong").expect("failed to write"), 4);
    assert_eq!(client.read(&mut buf).expect("failed to read"), 4);
    assert_eq!(&buf, b"pong");

    drop(client);
    assert_eq!(server.read(&mut buf).expect("failed to read"), 0);
}

#[test]
fn accept_stores_peer_address() {
    init();
    let (listener, address) = tcp_listener();
    let client = SocketFile::tcp(address).expect("failed to create socket");
    connect(&client).expect("failed to connect");
    let server = accept(&listener).expect("failed to accept connection");

    // Address of the accepted socket is the client's address, not the
    // listener's.
    assert_ne!(server.address(), listener.address());
    let client_address = client.local_address().expect("failed to get local address");
    assert_eq!(*server.address(), client_address);
    assert_eq!(server.address().family(), Family::IPV4);

    let peer_address = client.peer_address().expect("failed to get peer address");
    assert_eq!(peer_address.to_socket_addr(), Some(address));
    assert_eq!(
        server.local_address().expect("failed to get local address").to_socket_addr(),
        Some(address)
    );

    // Listener keeps working.
    let client2 = SocketFile::tcp(address).expect("failed to create socket");
    connect(&client2).expect("failed to connect");
    let server2 = accept(&listener).expect("failed to accept connection");
    assert_eq!(
        *server2.address(),
        client2.local_address().expect("failed to get local address")
    );

    assert_eq!(client2.write(DATA1).expect("failed to write"), DATA1.len());
    assert_eq!(client.write(DATA2).expect("failed to write"), DATA2.len());
    let mut buf = [0u8; 32];
    let n = server2.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], DATA1);
    let n = server.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], DATA2);
}

#[test]
fn listen_bind_failure_does_not_listen() {
    init();
    let (_listener, address) = tcp_listener();
    let socket = SocketFile::tcp(address).expect("failed to create socket");
    expect_io_error_kind(listen(&socket), io::ErrorKind::AddrInUse);

    #[cfg(any(target_os = "android", target_os = "linux"))]
    {
        use std::os::fd::AsRawFd;

        let mut accepting: libc::c_int = -1;
        let mut length = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
        crate::util::syscall!(getsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_ACCEPTCONN,
            std::ptr::addr_of_mut!(accepting).cast(),
            &mut length
        ))
        .expect("failed to get socket option");
        assert_eq!(accepting, 0);
    }
}

#[test]
fn connect_refused() {
    init();
    let (listener, address) = tcp_listener();
    drop(listener);

    let socket = SocketFile::tcp(address).expect("failed to create socket");
    expect_io_error_kind(connect(&socket), io::ErrorKind::ConnectionRefused);
}

#[test]
fn tcp_with_address_from_config() {
    init();
    let listener = SocketFile::config(Family::IPV4, Type::STREAM)
        .protocol(Protocol::TCP)
        .address(any_local_ipv4().into())
        .build()
        .expect("failed to create socket");
    listen(&listener).expect("failed to listen");
    let address = listener.local_address().expect("failed to get local address");

    let client = SocketFile::tcp(address.to_socket_addr().unwrap()).expect("failed to create socket");
    connect(&client).expect("failed to connect");
    let server = accept(&listener).expect("failed to accept connection");
    assert_eq!(client.write(DATA1).expect("failed to write"), DATA1.len());
    let mut buf = [0u8; 32];
    let n = server.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], DATA1);
}
