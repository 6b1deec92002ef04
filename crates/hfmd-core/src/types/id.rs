//! Fixed-size identifier utilities.
//!
//! Depth snapshots store instrument, exchange and trading-day identifiers in
//! null-padded byte arrays so the struct stays `Copy` with no heap pointers.
//! These helpers convert between `&str` and the fixed representation for any
//! array length.

/// Write a UTF-8 identifier into a fixed `[u8; N]` buffer.
///
/// The string is copied byte-for-byte and the remaining bytes are zero-filled.
/// If `s` is longer than `N`, it is silently truncated.
#[inline]
pub fn id_to_bytes<const N: usize>(s: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let len = s.len().min(N);
    buf[..len].copy_from_slice(&s.as_bytes()[..len]);
    buf
}

/// Read an identifier from a fixed `[u8; N]` buffer.
///
/// Returns the string up to the first null byte (or the full buffer if no null
/// is found). Returns `""` if the bytes are not valid UTF-8.
#[inline]
pub fn id_from_bytes<const N: usize>(buf: &[u8; N]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(N);
    std::str::from_utf8(&buf[..end]).unwrap_or("")
}
