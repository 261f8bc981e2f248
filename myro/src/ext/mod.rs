use bytes::{Buf, BufMut, Bytes};

/// Length encoded integer prefix of 2 bytes integer.
const LENENC_U16: u8 = 0xFC;
/// Length encoded integer prefix of 3 bytes integer.
const LENENC_U24: u8 = 0xFD;
/// Length encoded integer prefix of 8 bytes integer.
const LENENC_U64: u8 = 0xFE;

/// Integer signess in mysql docs is awful.
pub trait UsizeExt {
    /// Length is `usize` in rust, while mysql length encoded integer is `u64`.
    fn to_u64(self) -> u64;
}

/// Length encoded operation in [`BufMut`].
pub trait BufMutExt {
    /// Write length encoded integer.
    fn put_lenenc_int(&mut self, value: u64);

    /// Write length encoded integer of `bytes` length followed by `bytes` itself.
    fn put_lenenc_bytes(&mut self, bytes: &[u8]);
}

/// Length encoded operation in [`Bytes`].
///
/// All operation returns [`None`] when the buffer is too short, the cursor
/// is left unspecified in that case, callers treat the whole packet as malformed.
pub trait BytesExt {
    /// Try to read length encoded integer.
    ///
    /// Returns [`None`] for `NULL` (`0xFB`) and `ERR` (`0xFF`) prefix.
    fn try_get_lenenc_int(&mut self) -> Option<u64>;

    /// Try to read length encoded string.
    fn try_get_lenenc_bytes(&mut self) -> Option<Bytes>;

    /// Try to split `len` bytes from the front.
    fn try_split_to(&mut self, len: usize) -> Option<Bytes>;
}

/// Helper trait to [`Display`][std::fmt::Display] bytes.
pub trait FmtExt {
    /// Lossy [`Display`][std::fmt::Display] bytes.
    fn lossy(&self) -> LossyFmt<'_>;
}

/// Lossy [`Display`][std::fmt::Display] implementation for bytes.
pub struct LossyFmt<'a>(pub &'a [u8]);

/// Returns the size of length encoded integer.
pub const fn lenenc_int_len(value: u64) -> usize {
    match value {
        0..251 => 1,
        251..0x1_0000 => 3,
        0x1_0000..0x100_0000 => 4,
        _ => 9,
    }
}

impl UsizeExt for usize {
    fn to_u64(self) -> u64 {
        self.try_into().expect("buffer size too large for protocol")
    }
}

impl<B: BufMut> BufMutExt for B {
    fn put_lenenc_int(&mut self, value: u64) {
        match lenenc_int_len(value) {
            1 => self.put_u8(value as u8),
            3 => {
                self.put_u8(LENENC_U16);
                self.put_u16_le(value as u16);
            }
            4 => {
                self.put_u8(LENENC_U24);
                self.put_uint_le(value, 3);
            }
            _ => {
                self.put_u8(LENENC_U64);
                self.put_u64_le(value);
            }
        }
    }

    fn put_lenenc_bytes(&mut self, bytes: &[u8]) {
        self.put_lenenc_int(bytes.len().to_u64());
        self.put_slice(bytes);
    }
}

impl BytesExt for Bytes {
    fn try_get_lenenc_int(&mut self) -> Option<u64> {
        let prefix = self.try_get_u8().ok()?;
        match prefix {
            0..251 => Some(prefix.into()),
            LENENC_U16 => self.try_get_u16_le().ok().map(Into::into),
            LENENC_U24 => self.try_get_uint_le(3).ok(),
            LENENC_U64 => self.try_get_u64_le().ok(),
            _ => None,
        }
    }

    fn try_get_lenenc_bytes(&mut self) -> Option<Bytes> {
        let len = self.try_get_lenenc_int()?;
        self.try_split_to(len.try_into().ok()?)
    }

    fn try_split_to(&mut self, len: usize) -> Option<Bytes> {
        (self.remaining() >= len).then(|| self.split_to(len))
    }
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};

    use super::{BufMutExt, BytesExt, lenenc_int_len};

    #[test]
    fn lenenc_int() {
        for value in [0u64, 250, 251, 0xFFFF, 0x1_0000, 0xFF_FFFF, 0x100_0000, u64::MAX] {
            let mut buf = BytesMut::new();
            buf.put_lenenc_int(value);
            assert_eq!(buf.len(), lenenc_int_len(value));
            assert_eq!(buf.freeze().try_get_lenenc_int(), Some(value));
        }
    }

    #[test]
    fn lenenc_null_and_short() {
        assert_eq!(Bytes::from_static(b"\xFB").try_get_lenenc_int(), None);
        assert_eq!(Bytes::from_static(b"\xFC\x01").try_get_lenenc_int(), None);
        assert_eq!(Bytes::from_static(b"\x05abc").try_get_lenenc_bytes(), None);
        assert_eq!(
            Bytes::from_static(b"\x03abcd").try_get_lenenc_bytes().as_deref(),
            Some(&b"abc"[..])
        );
    }
}
