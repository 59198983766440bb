//! Byte buffer used for serialized messages.
//!
//! [`Buf`] wraps `Vec<u8>` and carries the length-prefix helpers every
//! serializer in this crate needs. Lengths are written as placeholders and
//! patched once the body is known, so nested structures never have to be
//! measured twice.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Growable buffer wrapper used by every serializer.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Buf(Vec<u8>);

impl Buf {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new buffer from a slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Buf(data.to_vec())
    }

    /// Clear the buffer, removing all data.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Extend the buffer with a slice of bytes.
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.0.extend_from_slice(other);
    }

    /// Push a single byte onto the buffer.
    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    pub fn push_u16(&mut self, value: u16) {
        self.0.extend_from_slice(&value.to_be_bytes());
    }

    pub fn push_u24(&mut self, value: u32) {
        self.0.extend_from_slice(&value.to_be_bytes()[1..]);
    }

    /// Write `data` behind a one byte length prefix.
    ///
    /// Anything longer than the prefix can express is truncated in the
    /// length field only. The engine must be able to emit such mismatches.
    pub fn push_vec_u8(&mut self, data: &[u8]) {
        self.0.push(data.len() as u8);
        self.0.extend_from_slice(data);
    }

    /// Write `data` behind a two byte length prefix.
    pub fn push_vec_u16(&mut self, data: &[u8]) {
        self.push_u16(data.len() as u16);
        self.0.extend_from_slice(data);
    }

    /// Run `body` and prefix whatever it wrote with a two byte length.
    pub fn with_u16_len(&mut self, body: impl FnOnce(&mut Buf)) {
        let at = self.0.len();
        self.0.extend_from_slice(&[0, 0]);
        body(self);
        let len = (self.0.len() - at - 2) as u16;
        self.0[at..at + 2].copy_from_slice(&len.to_be_bytes());
    }

    /// Run `body` and prefix whatever it wrote with a three byte length.
    pub fn with_u24_len(&mut self, body: impl FnOnce(&mut Buf)) {
        let at = self.0.len();
        self.0.extend_from_slice(&[0, 0, 0]);
        body(self);
        let len = (self.0.len() - at - 3) as u32;
        self.0[at..at + 3].copy_from_slice(&len.to_be_bytes()[1..]);
    }

    /// Convert the buffer into the underlying `Vec<u8>`.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl Deref for Buf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Buf {
    fn from(value: Vec<u8>) -> Self {
        Buf(value)
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buf").field("len", &self.0.len()).finish()
    }
}

/// Lowercase hex rendering for log lines.
pub(crate) fn hex(data: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefixes_are_patched() {
        let mut buf = Buf::new();
        buf.with_u16_len(|b| {
            b.push(1);
            b.with_u24_len(|b| b.extend_from_slice(&[2, 3]));
        });
        assert_eq!(&*buf, &[0x00, 0x06, 0x01, 0x00, 0x00, 0x02, 0x02, 0x03]);
    }

    #[test]
    fn vec_prefixes() {
        let mut buf = Buf::new();
        buf.push_vec_u8(&[9]);
        buf.push_vec_u16(&[7, 7]);
        buf.push_u24(0x010203);
        assert_eq!(&*buf, &[1, 9, 0, 2, 7, 7, 1, 2, 3]);
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
