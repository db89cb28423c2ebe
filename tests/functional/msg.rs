use sockfile::io::{IoBuf, IoBufMut};
use sockfile::msg::MAX_SEGMENTS;
use sockfile::{recv_message, send_message, MessageFlags, RecvMessage, SendMessage, SocketAddress};

use crate::util::{init, is_send, is_sync, tcp_pair};
#[cfg(unix)]
use crate::util::{bind_ipv4, expect_io_errno, socket_pair, udp_ipv4_socket};

#[test]
fn message_types_are_send_and_sync() {
    is_send::<SendMessage<'static>>();
    is_sync::<SendMessage<'static>>();
    is_send::<RecvMessage<'static, 'static>>();
    is_sync::<RecvMessage<'static, 'static>>();
    is_send::<MessageFlags>();
    is_sync::<MessageFlags>();
}

#[test]
fn send_recv_message_tcp() {
    init();
    let (client, server) = tcp_pair();

    let bufs = [IoBuf::new(b"Hello"), IoBuf::new(b", "), IoBuf::new(b"World!")];
    let msg = SendMessage::new(&bufs);
    let n = send_message(&client, &msg, MessageFlags::NONE).expect("failed to send message");
    assert_eq!(n, 13);
    assert_eq!(n, msg.len());

    let mut buf1 = [0u8; 7];
    let mut buf2 = [0u8; 6];
    let mut bufs = [IoBufMut::new(&mut buf1), IoBufMut::new(&mut buf2)];
    let mut msg = RecvMessage::new(&mut bufs);
    // Waits until both buffers are filled.
    let n = recv_message(&server, &mut msg, MessageFlags::WAIT_ALL).expect("failed to receive message");
    assert_eq!(n, 13);
    assert_eq!(msg.name_len(), 0);
    assert_eq!(msg.bufs()[0].as_bytes(), b"Hello, ");
    assert_eq!(msg.bufs()[1].as_bytes(), b"World!");
}

#[test]
#[cfg(unix)]
fn scatter_write() {
    init();
    let (a, b) = socket_pair();
    let bufs = [IoBuf::new(b"Hello"), IoBuf::new(b""), IoBuf::new(b", World!")];
    let n = sockfile::scatter_write(&a, &bufs).expect("failed to write");
    assert_eq!(n, 13);

    let mut buf = [0u8; 32];
    let n = b.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], b"Hello, World!");
}

#[test]
#[cfg(unix)]
fn scatter_read() {
    init();
    let (a, b) = socket_pair();
    assert_eq!(a.write(b"HelloWorld").expect("failed to write"), 10);

    let mut buf1 = [0u8; 5];
    let mut buf2 = [0u8; 5];
    let mut bufs = [IoBufMut::new(&mut buf1), IoBufMut::new(&mut buf2)];
    let n = sockfile::scatter_read(&b, &mut bufs).expect("failed to read");
    assert_eq!(n, 10);
    assert_eq!(buf1, *b"Hello");
    assert_eq!(buf2, *b"World");
}

#[test]
#[cfg(unix)]
fn send_recv_message_udp_address() {
    init();
    let a = udp_ipv4_socket();
    let a_address = bind_ipv4(&a);
    let b = udp_ipv4_socket();
    let b_address = bind_ipv4(&b);

    let target = SocketAddress::from(b_address);
    let bufs = [IoBuf::new(b"Hello, "), IoBuf::new(b"UDP")];
    let msg = SendMessage::new(&bufs).with_address(&target);
    let n = send_message(&a, &msg, MessageFlags::NONE).expect("failed to send message");
    assert_eq!(n, 10);

    let mut buf = [0u8; 64];
    let mut bufs = [IoBufMut::new(&mut buf)];
    let mut source = SocketAddress::default();
    let mut msg = RecvMessage::new(&mut bufs).with_address(&mut source);
    let n = recv_message(&b, &mut msg, MessageFlags::NONE).expect("failed to receive message");
    assert_eq!(n, 10);
    let name_len = msg.name_len();
    assert_eq!(&msg.bufs()[0].as_bytes()[..n], b"Hello, UDP");
    drop(msg);
    assert_eq!(source.len(), name_len);
    assert_eq!(source.to_socket_addr(), Some(a_address));
}

#[test]
#[cfg(any(target_os = "android", target_os = "linux"))]
fn recv_message_name_bytes() {
    init();
    let a = udp_ipv4_socket();
    let a_address = bind_ipv4(&a);
    let b = udp_ipv4_socket();
    let b_address = bind_ipv4(&b);

    let target = SocketAddress::from(b_address);
    let bufs = [IoBuf::new(b"Hi")];
    let msg = SendMessage::new(&bufs).with_name(target.as_bytes());
    assert_eq!(send_message(&a, &msg, MessageFlags::NONE).expect("failed to send message"), 2);

    let mut buf = [0u8; 8];
    let mut bufs = [IoBufMut::new(&mut buf)];
    let mut name = [0u8; SocketAddress::CAPACITY];
    let mut msg = RecvMessage::new(&mut bufs).with_name(&mut name);
    assert_eq!(recv_message(&b, &mut msg, MessageFlags::NONE).expect("failed to receive message"), 2);
    let name_len = msg.name_len();
    drop(msg);
    assert_eq!(name_len, SocketAddress::from(a_address).len());
    assert_eq!(&name[..name_len], SocketAddress::from(a_address).as_bytes());
}

#[test]
#[cfg(unix)]
fn recv_message_peek() {
    init();
    let (a, b) = socket_pair();
    assert_eq!(a.write(b"Hello").expect("failed to write"), 5);

    let mut buf = [0u8; 8];
    let mut bufs = [IoBufMut::new(&mut buf)];
    let mut msg = RecvMessage::new(&mut bufs);
    let n = recv_message(&b, &mut msg, MessageFlags::PEEK).expect("failed to receive message");
    assert_eq!(n, 5);
    drop(msg);
    assert_eq!(&buf[..n], b"Hello");

    // Still in the queue.
    let mut buf = [0u8; 8];
    assert_eq!(b.read(&mut buf).expect("failed to read"), 5);
    assert_eq!(&buf[..5], b"Hello");
}

#[test]
#[cfg(any(target_os = "android", target_os = "linux"))]
fn recv_message_truncated() {
    init();
    let (a, b) = crate::util::socket_pair_of(libc::SOCK_DGRAM);
    assert_eq!(a.write(b"Hello, World!").expect("failed to write"), 13);

    let mut buf = [0u8; 5];
    let mut bufs = [IoBufMut::new(&mut buf)];
    let mut control = [0u8; 64];
    let mut msg = RecvMessage::new(&mut bufs).with_control(&mut control);
    let n = recv_message(&b, &mut msg, MessageFlags::NONE).expect("failed to receive message");
    assert_eq!(n, 5);
    assert!(msg.flags() & libc::MSG_TRUNC != 0);
    assert_eq!(msg.control_len(), 0);
    assert!(msg.control().is_empty());
}

#[test]
#[cfg(any(target_os = "android", target_os = "linux"))]
fn send_message_too_many_buffers() {
    init();
    let (a, _b) = socket_pair();
    let bufs = vec![IoBuf::new(b"a"); MAX_SEGMENTS + 1];
    let msg = SendMessage::new(&bufs);
    expect_io_errno(send_message(&a, &msg, MessageFlags::NONE), libc::EMSGSIZE);
}

#[test]
#[cfg(windows)]
fn send_message_too_many_buffers() {
    init();
    let (client, _server) = tcp_pair();
    let bufs = vec![IoBuf::new(b"a"); MAX_SEGMENTS + 1];
    let msg = SendMessage::new(&bufs);
    let err = send_message(&client, &msg, MessageFlags::NONE).unwrap_err();
    assert!(sockfile::is_too_large_error(&err), "{err}");
}

#[test]
fn send_message_many_buffers() {
    init();
    let (client, server) = tcp_pair();
    let bufs = vec![IoBuf::new(b"a"); 16];
    let msg = SendMessage::new(&bufs);
    assert_eq!(send_message(&client, &msg, MessageFlags::NONE).expect("failed to send"), 16);
    let mut buf = [0u8; 16];
    let mut n = 0;
    while n < 16 {
        n += server.read(&mut buf[n..]).expect("failed to read");
    }
    assert_eq!(buf, [b'a'; 16]);
}
