//! Type definitions for I/O functionality.
//!
//! [`Observer::read`] and [`Observer::write`] work on slices of any
//! [`Element`] type, not just bytes. For vectored I/O see the [`IoBuf`] and
//! [`IoBufMut`] types, which are used in the [`msg`] module.
//!
//! [`msg`]: crate::msg

use std::marker::PhantomData;
use std::mem::size_of;
use std::{fmt, io, slice};

use crate::fd::{Observer, SocketFile};
use crate::net::Address;
use crate::sys;

/// Element type of the buffers used in [`Observer::read`] and
/// [`Observer::write`].
///
/// # Safety
///
/// All bit patterns must be valid values of the type and the type may not
/// contain any padding, as the OS reads and writes the bytes directly. The
/// type must not be zero sized, [`Observer::read`] and [`Observer::write`]
/// return an [`io::ErrorKind::InvalidInput`] error for zero sized types.
pub unsafe trait Element: Copy + 'static {}

macro_rules! element {
    ( $( $ty: ty ),* ) => {
        $(
        // SAFETY: primitive integers have no padding and all bit patterns are
        // valid.
        unsafe impl Element for $ty {}
        )*
    };
}

element!(u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize);

/// Element based I/O.
impl<A: Address> Observer<A> {
    /// Receive elements into `buf`.
    ///
    /// This makes a single `recv(2)` call of `buf.len() * size_of::<T>()`
    /// bytes, returning the number of **complete** elements received, `buf[..n]`
    /// are the elements read. This can be fewer than `buf.len()`, it's up to
    /// the caller to call `read` again if more elements are expected.
    ///
    /// Returns `Ok(0)` if the peer closed the connection (for connection based
    /// sockets). An empty `buf` still makes the call, which on a blocking
    /// stream socket blocks until data is available.
    #[doc(alias = "recv")]
    pub fn read<T: Element>(&self, buf: &mut [T]) -> io::Result<usize> {
        let size = element_size::<T>()?;
        let bytes = buf.len() * size;
        let n = sys::recv(self.native_handle(), buf.as_mut_ptr().cast(), bytes, 0)?;
        Ok(n / size)
    }

    /// Send the elements in `buf`.
    ///
    /// This makes a single `send(2)` call of `buf.len() * size_of::<T>()`
    /// bytes, returning the number of **complete** elements send. This can be
    /// fewer than `buf.len()`, it's up to the caller to send the remainder,
    /// i.e. `buf[n..]`.
    #[doc(alias = "send")]
    pub fn write<T: Element>(&self, buf: &[T]) -> io::Result<usize> {
        let size = element_size::<T>()?;
        let bytes = buf.len() * size;
        let n = sys::send(self.native_handle(), buf.as_ptr().cast(), bytes, 0)?;
        Ok(n / size)
    }
}

fn element_size<T: Element>() -> io::Result<usize> {
    match size_of::<T>() {
        0 => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "zero sized elements can't be sent or received",
        )),
        size => Ok(size),
    }
}

fn recv_bytes(socket: crate::fd::RawSocket, buf: &mut [u8]) -> io::Result<usize> {
    sys::recv(socket, buf.as_mut_ptr(), buf.len(), 0)
}

fn send_bytes(socket: crate::fd::RawSocket, buf: &[u8]) -> io::Result<usize> {
    sys::send(socket, buf.as_ptr(), buf.len(), 0)
}

impl<A: Address> io::Read for Observer<A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        recv_bytes(self.native_handle(), buf)
    }
}

impl<A: Address> io::Write for Observer<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        send_bytes(self.native_handle(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<A: Address> io::Read for SocketFile<A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        recv_bytes(self.native_handle(), buf)
    }
}

impl<A: Address> io::Read for &SocketFile<A> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        recv_bytes(self.native_handle(), buf)
    }
}

impl<A: Address> io::Write for SocketFile<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        send_bytes(self.native_handle(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<A: Address> io::Write for &SocketFile<A> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        send_bytes(self.native_handle(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Pointer and length of a buffer.
///
/// On Unix this has the same layout as `iovec`.
#[repr(C)]
#[derive(Copy, Clone)]
pub(crate) struct RawBuf {
    pub(crate) base: *mut u8,
    pub(crate) len: usize,
}

/// Buffer to send, used in vectored I/O.
#[repr(transparent)] // Needed for I/O.
#[derive(Copy, Clone)]
pub struct IoBuf<'a> {
    raw: RawBuf,
    _lifetime: PhantomData<&'a [u8]>,
}

impl<'a> IoBuf<'a> {
    /// Create a new `IoBuf`.
    pub const fn new(buf: &'a [u8]) -> IoBuf<'a> {
        IoBuf {
            raw: RawBuf {
                base: buf.as_ptr().cast_mut(),
                len: buf.len(),
            },
            _lifetime: PhantomData,
        }
    }

    /// Returns the bytes.
    pub const fn as_bytes(&self) -> &'a [u8] {
        // SAFETY: on creation we've ensured that `base` and `len` are valid
        // for `'a`.
        unsafe { slice::from_raw_parts(self.raw.base, self.raw.len) }
    }

    /// Length of the buffer in bytes.
    pub const fn len(&self) -> usize {
        self.raw.len
    }

    /// Returns `true` if the buffer is empty.
    pub const fn is_empty(&self) -> bool {
        self.raw.len == 0
    }
}

impl<'a> From<&'a [u8]> for IoBuf<'a> {
    fn from(buf: &'a [u8]) -> IoBuf<'a> {
        IoBuf::new(buf)
    }
}

impl<'a> fmt::Debug for IoBuf<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_bytes().fmt(f)
    }
}

/// Buffer to receive into, used in vectored I/O.
#[repr(transparent)] // Needed for I/O.
pub struct IoBufMut<'a> {
    raw: RawBuf,
    _lifetime: PhantomData<&'a mut [u8]>,
}

impl<'a> IoBufMut<'a> {
    /// Create a new `IoBufMut`.
    pub fn new(buf: &'a mut [u8]) -> IoBufMut<'a> {
        IoBufMut {
            raw: RawBuf {
                base: buf.as_mut_ptr(),
                len: buf.len(),
            },
            _lifetime: PhantomData,
        }
    }

    /// Returns the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: on creation we've ensured that `base` and `len` are valid
        // for `'a`.
        unsafe { slice::from_raw_parts(self.raw.base, self.raw.len) }
    }

    /// Returns the bytes mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: see `as_bytes`, we have unique access to the bytes.
        unsafe { slice::from_raw_parts_mut(self.raw.base, self.raw.len) }
    }

    /// Length of the buffer in bytes.
    pub const fn len(&self) -> usize {
        self.raw.len
    }

    /// Returns `true` if the buffer is empty.
    pub const fn is_empty(&self) -> bool {
        self.raw.len == 0
    }
}

impl<'a> From<&'a mut [u8]> for IoBufMut<'a> {
    fn from(buf: &'a mut [u8]) -> IoBufMut<'a> {
        IoBufMut::new(buf)
    }
}

impl<'a> fmt::Debug for IoBufMut<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_bytes().fmt(f)
    }
}

// SAFETY: `RawBuf` is `!Send` and `!Sync` because of the pointer, but it's just
// a pointer to some bytes, access to which is controlled by the lifetime.
unsafe impl<'a> Send for IoBuf<'a> {}
unsafe impl<'a> Sync for IoBuf<'a> {}
unsafe impl<'a> Send for IoBufMut<'a> {}
unsafe impl<'a> Sync for IoBufMut<'a> {}

/// Returns the raw buffers of `bufs`.
pub(crate) fn raw_bufs<'a>(bufs: &'a [IoBuf<'_>]) -> &'a [RawBuf] {
    // SAFETY: `IoBuf` is a transparent wrapper around `RawBuf`.
    unsafe { slice::from_raw_parts(bufs.as_ptr().cast(), bufs.len()) }
}

/// Returns the raw buffers of `bufs`.
pub(crate) fn raw_bufs_mut<'a>(bufs: &'a mut [IoBufMut<'_>]) -> &'a mut [RawBuf] {
    // SAFETY: `IoBufMut` is a transparent wrapper around `RawBuf`.
    unsafe { slice::from_raw_parts_mut(bufs.as_mut_ptr().cast(), bufs.len()) }
}
