//! Low-level I/O primitives shared by all parsers and writers.
//!
//! Each read function returns exactly the bytes it promises or an error -
//! a read past the end of the source surfaces as [`Error::UnexpectedEof`]
//! and there is no partial-read ambiguity. [`fill`] is the one exception and
//! says so.
//!
//! Positioning is left to [`std::io::Seek`]; seeking is unchecked, so a sink
//! may be repositioned past its current end.

use std::io::{self, Read};

use crate::{Error, Result};

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_le_bytes(b))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

/// Read a big-endian `u16`.
#[inline]
pub(crate) fn be_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_be_bytes(b))
}

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_be_bytes(b))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Check whether the next `N` bytes in the stream match `expected`.
///
/// Running out of data counts as a mismatch, not an error.
pub(crate) fn has_magic<R: Read, const N: usize>(r: &mut R, expected: &[u8; N]) -> Result<bool> {
    match bytesa::<N>(r) {
        Ok(got) => Ok(&got == expected),
        Err(Error::UnexpectedEof) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes read; anything less than `buf.len()` means
/// the source has no more data.
pub(crate) fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(filled)
}
