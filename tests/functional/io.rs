use std::io;

use sockfile::io::{IoBuf, IoBufMut};

#[cfg(unix)]
use crate::util::{expect_io_error_kind, socket_pair, syscall};
use crate::util::{init, tcp_pair};

const DATA: &[u8] = b"Hello, World!";

#[test]
fn read_write_bytes() {
    init();
    let (client, server) = tcp_pair();
    assert_eq!(client.write(DATA).expect("failed to write"), DATA.len());
    let mut buf = [0u8; 64];
    let n = server.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], DATA);
}

#[test]
fn write_empty() {
    init();
    let (client, server) = tcp_pair();
    assert_eq!(client.write::<u8>(&[]).expect("failed to write"), 0);

    // Nothing was sent, so only the next write arrives.
    assert_eq!(client.write(DATA).expect("failed to write"), DATA.len());
    let mut buf = [0u8; 64];
    let n = server.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], DATA);
}

#[test]
#[cfg(any(target_os = "android", target_os = "linux"))]
fn read_empty_waits_for_data() {
    init();
    let (_client, server) = tcp_pair();
    let flags = syscall!(fcntl(server.native_handle(), libc::F_GETFL)).expect("failed to get flags");
    syscall!(fcntl(server.native_handle(), libc::F_SETFL, flags | libc::O_NONBLOCK))
        .expect("failed to set flags");

    // An empty buffer doesn't return early, the call waits for data like any
    // other read.
    expect_io_error_kind(server.read::<u8>(&mut []), io::ErrorKind::WouldBlock);
}

#[derive(Copy, Clone, Debug)]
struct Empty;

// SAFETY: only used to check zero sized types are rejected, the OS never
// touches it.
unsafe impl sockfile::io::Element for Empty {}

#[test]
fn zero_sized_elements() {
    init();
    let (client, server) = tcp_pair();
    let err = client.write(&[Empty; 4]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    let err = server.read(&mut [Empty; 4]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

    // The sockets are still usable.
    assert_eq!(client.write(DATA).expect("failed to write"), DATA.len());
    let mut buf = [0u8; 64];
    let n = server.read(&mut buf).expect("failed to read");
    assert_eq!(&buf[..n], DATA);
}

#[test]
#[cfg(unix)]
fn read_write_elements() {
    init();
    let (a, b) = socket_pair();
    let data: [u32; 4] = [1, 2, 3, u32::MAX];
    assert_eq!(a.write(&data).expect("failed to write"), 4);

    let mut buf = [0u32; 4];
    assert_eq!(b.read(&mut buf).expect("failed to read"), 4);
    assert_eq!(buf, data);

    let data: [i64; 2] = [-1, i64::MIN];
    assert_eq!(a.write(&data).expect("failed to write"), 2);
    let mut buf = [0i64; 2];
    assert_eq!(b.read(&mut buf).expect("failed to read"), 2);
    assert_eq!(buf, data);
}

#[test]
#[cfg(unix)]
fn read_returns_complete_elements() {
    init();
    let (a, b) = socket_pair();
    // Six bytes is one complete `u32` and half of another.
    assert_eq!(a.write(&[1u8, 0, 0, 0, 2, 0]).expect("failed to write"), 6);

    let mut buf = [0u32; 2];
    assert_eq!(b.read(&mut buf).expect("failed to read"), 1);
    assert_eq!(buf[0], u32::from_ne_bytes([1, 0, 0, 0]));
}

#[test]
#[cfg(unix)]
fn short_write() {
    init();
    let (a, _b) = socket_pair();
    let flags = syscall!(fcntl(a.native_handle(), libc::F_GETFL)).expect("failed to get flags");
    syscall!(fcntl(a.native_handle(), libc::F_SETFL, flags | libc::O_NONBLOCK))
        .expect("failed to set flags");

    // Much larger than the socket's send buffer.
    let data = vec![0xAAu32; 4 * 1024 * 1024];
    let n = a.write(&data).expect("failed to write");
    assert!(n > 0);
    assert!(n < data.len(), "expected a short write, wrote {n} elements");

    // Send buffer is full now.
    expect_io_error_kind(a.write(&data[n..]), io::ErrorKind::WouldBlock);
}

#[test]
fn io_bufs() {
    let buf = IoBuf::new(DATA);
    assert_eq!(buf.len(), DATA.len());
    assert!(!buf.is_empty());
    assert_eq!(buf.as_bytes(), DATA);
    assert_eq!(format!("{buf:?}"), format!("{DATA:?}"));
    assert!(IoBuf::from(&b""[..]).is_empty());

    let mut data = *b"Hello";
    let mut buf = IoBufMut::new(&mut data);
    assert_eq!(buf.len(), 5);
    buf.as_bytes_mut()[0] = b'J';
    assert_eq!(buf.as_bytes(), b"Jello");
    assert_eq!(data, *b"Jello");
}

/// `std::io::Read` and `std::io::Write` implementations, in a separate module
/// as the traits' methods shadow the element based methods.
mod std_io {
    use std::io::{Read, Write};

    use super::DATA;
    use crate::util::{init, tcp_pair};

    #[test]
    fn socket_file() {
        init();
        let (mut client, mut server) = tcp_pair();
        client.write_all(DATA).expect("failed to write");
        client.flush().expect("failed to flush");
        let mut buf = vec![0u8; DATA.len()];
        server.read_exact(&mut buf).expect("failed to read");
        assert_eq!(buf, DATA);
    }

    #[test]
    fn socket_file_reference() {
        init();
        let (client, server) = tcp_pair();
        (&client).write_all(DATA).expect("failed to write");
        let mut buf = vec![0u8; DATA.len()];
        (&server).read_exact(&mut buf).expect("failed to read");
        assert_eq!(buf, DATA);
    }

    #[test]
    fn observer() {
        init();
        let (client, server) = tcp_pair();
        let mut writer = client.observer();
        let mut reader = server.observer();
        writer.write_all(DATA).expect("failed to write");
        drop(client);
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).expect("failed to read");
        assert_eq!(buf, DATA);
    }
}
