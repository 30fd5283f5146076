//! Variable-length integer encoding/decoding.
//!
//! Integers are written as little-endian base-128 groups. Every byte but the
//! last has its high bit (`0x80`) set as a continuation marker.
//!
//! Signed integers are first mapped to unsigned ones so that the lowest bit
//! carries the sign: negative `n` becomes `|n| * 2 - 1`, non-negative `n`
//! becomes `n * 2`.
//!
//! See also: <https://en.wikipedia.org/wiki/LEB128>

use std::ops::{BitOr, BitOrAssign, Shl, Shr, ShrAssign};

use bytes::BufMut;

use crate::de::Error;

/// Bit operations the base-128 loops need. Unsigned integers only.
trait UvarintEncode:
    Sized
    + Default
    + Copy
    + PartialOrd
    + Shr<usize, Output = Self>
    + Shl<usize, Output = Self>
    + ShrAssign<usize>
    + BitOr<Output = Self>
    + BitOrAssign
    + From<u8>
{
    type Buf: AsMut<[u8]> + Default;

    fn trunc_u8(self) -> u8;
}

/// An integer that can be written as a varint.
///
/// Signed integers go through their zig-zag unsigned form. Unsigned integers
/// are written as-is.
pub trait Varint: Sized + Copy {
    #[allow(private_bounds)]
    type Unsigned: UvarintEncode;

    fn into_unsigned(self) -> Self::Unsigned;
    fn from_unsigned(value: Self::Unsigned) -> Self;
}

impl<T: UvarintEncode> Varint for T {
    type Unsigned = Self;

    fn into_unsigned(self) -> Self::Unsigned {
        self
    }

    fn from_unsigned(value: Self::Unsigned) -> Self {
        value
    }
}

const fn buf_size<T>() -> usize {
    bitness::<T>().div_ceil(7)
}

const fn bitness<T>() -> usize {
    size_of::<T>() * 8
}

/// Appends the varint encoding of `x` to `buf`.
pub fn write<T, B>(buf: &mut B, x: T)
where
    T: Varint,
    B: BufMut + ?Sized,
{
    write_inner(buf, x.into_unsigned());
}

fn write_inner<T, B>(out: &mut B, mut x: T)
where
    T: UvarintEncode,
    B: BufMut + ?Sized,
{
    let mut buf = T::Buf::default();
    let buf = buf.as_mut();
    let mut i = 0usize;
    while x >= T::from(0x80) {
        buf[i] = x.trunc_u8() | 0x80;
        x >>= 7;
        i += 1;
    }

    buf[i] = x.trunc_u8();
    i += 1;

    out.put_slice(&buf[..i]);
}

/// Decodes a varint from the start of `bytes`.
///
/// Decoding stops at the first byte without the continuation bit. If there is
/// no such byte, every byte is consumed and the accumulated value is returned.
/// Use [`scan`] first if a missing terminator should be treated as an error.
///
/// # Errors
///
/// Returns [`Error::IntegerOverflow`] if the encoded value does not fit `T`.
pub fn decode<T: Varint>(bytes: &[u8]) -> Result<T, Error> {
    decode_inner(bytes).map(T::from_unsigned)
}

fn decode_inner<T: UvarintEncode>(bytes: &[u8]) -> Result<T, Error> {
    let mut x = T::default();
    let mut s = 0usize;
    for &b in bytes {
        // ensure the shift isn't greater than the bit-count of `T`
        if s >= bitness::<T>() {
            return Err(Error::IntegerOverflow);
        }

        // convert to shifted `T`
        // ensure that all bits fit into `T`
        let tb = T::from(b & 0x7F);
        let ts = tb << s;
        if ts >> s != tb {
            return Err(Error::IntegerOverflow);
        }

        x |= ts;
        s += 7;

        if b < 0x80 {
            break;
        }
    }

    Ok(x)
}

/// Greedily collects the bytes of one varint, starting at `pos`.
///
/// The returned slice ends with the first byte below `0x80`, or at the end of
/// `buf` if there is none. It is empty if `pos` is out of bounds.
pub fn scan(buf: &[u8], pos: usize) -> &[u8] {
    let rest = buf.get(pos..).unwrap_or_default();
    match rest.iter().position(|&b| b < 0x80) {
        Some(end) => &rest[..=end],
        None => rest,
    }
}

/// Returns whether `bytes` ends in a byte without the continuation bit.
pub fn is_terminated(bytes: &[u8]) -> bool {
    bytes.last().is_some_and(|&b| b < 0x80)
}

/// Encodes a non-negative integer.
pub fn encode_unsigned(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(buf_size::<u64>());
    write(&mut buf, n);
    buf
}

/// Encodes a signed integer via its zig-zag form.
pub fn encode_signed(n: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(buf_size::<u64>());
    write(&mut buf, n);
    buf
}

/// Decodes a non-negative integer. See [`decode`].
///
/// # Errors
///
/// Returns [`Error::IntegerOverflow`] if the value exceeds 64 bits.
pub fn decode_unsigned(bytes: &[u8]) -> Result<u64, Error> {
    decode(bytes)
}

/// Decodes a signed integer from its zig-zag form. See [`decode`].
///
/// # Errors
///
/// Returns [`Error::IntegerOverflow`] if the value exceeds 64 bits.
pub fn decode_signed(bytes: &[u8]) -> Result<i64, Error> {
    decode(bytes)
}

macro_rules! impl_uvarint {
    ($($Ty:ty)*) => { $(
        impl UvarintEncode for $Ty {
            type Buf = [u8; buf_size::<Self>()];

            #[allow(clippy::cast_possible_truncation)]
            fn trunc_u8(self) -> u8 {
                self as u8
            }
        }
    )* };
}

macro_rules! impl_varint_signed {
    ($($Ty:ty as $Unsigned:ty),* $(,)?) => { $(
        impl Varint for $Ty {
            type Unsigned = $Unsigned;

            fn into_unsigned(self) -> Self::Unsigned {
                // `|n| * 2 - 1` rearranged so `MIN` does not overflow
                if self < 0 {
                    ((self.unsigned_abs() - 1) << 1) | 1
                } else {
                    self.unsigned_abs() << 1
                }
            }

            #[allow(clippy::cast_possible_wrap)]
            fn from_unsigned(value: Self::Unsigned) -> Self {
                // `value >> 1` always fits the signed type
                let half = (value >> 1) as $Ty;
                if value & 1 != 0 {
                    -half - 1
                } else {
                    half
                }
            }
        }
    )* };
}

impl_uvarint!(u32 u64 usize);
impl_varint_signed!(i32 as u32, i64 as u64);

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! round_trip {
        ($fn_name:ident, $Ty:ty, $values:expr) => {
            #[test]
            fn $fn_name() {
                const VALUES: &[$Ty] = &$values;
                let mut buf = Vec::new();
                for &v in VALUES {
                    buf.clear();
                    write(&mut buf, v);

                    assert!(is_terminated(&buf), "last byte must end the varint");
                    assert_eq!(scan(&buf, 0).len(), buf.len(), "scan must see every byte");

                    let r: $Ty = decode(&buf).expect("decoding worked");
                    assert_eq!(v, r, "must be equal");
                }
            }
        };
    }

    round_trip!(round_trip_usize, usize, [0, 1, 300, 65_535, usize::MAX]);
    round_trip!(
        round_trip_u32,
        u32,
        [500, 5000, 500_000, 500_000_000, 0, 0x7F, 0x80, u32::MAX]
    );
    round_trip!(
        round_trip_u64,
        u64,
        [0, 300, 1 << 35, 9_007_199_254_740_993, u64::MAX - 1, u64::MAX]
    );
    round_trip!(
        round_trip_i32,
        i32,
        [
            0,
            1,
            -1,
            63,
            -64,
            64,
            -65,
            1_000_000,
            -1_000_000,
            i32::MIN,
            i32::MAX
        ]
    );
    round_trip!(
        round_trip_i64,
        i64,
        [
            0,
            -1,
            300,
            -300,
            1 << 40,
            -(1 << 40),
            i64::MIN,
            i64::MIN + 1,
            i64::MAX
        ]
    );

    #[test]
    fn unsigned_bytes() {
        assert_eq!(encode_unsigned(0), [0x00]);
        assert_eq!(encode_unsigned(5), [0x05]);
        assert_eq!(encode_unsigned(0x7F), [0x7F]);
        assert_eq!(encode_unsigned(0x80), [0x80, 0x01]);
        assert_eq!(encode_unsigned(300), [0xAC, 0x02]);
    }

    #[test]
    fn signed_minus_five() {
        assert_eq!(encode_signed(-5), [0x09]);
        assert_eq!(decode_signed(&[0x09]).expect("valid varint"), -5);
    }

    #[test]
    fn sign_in_low_bit() {
        for n in [-300i64, -2, -1, 0, 1, 2, 300, i64::MIN, i64::MAX] {
            let zz = n.into_unsigned();
            assert_eq!(zz & 1 == 1, n < 0, "low bit must carry the sign of {n}");
            assert_eq!(decode_signed(&encode_signed(n)).expect("valid varint"), n);
        }
    }

    #[test]
    fn matches_shift_xor_zigzag() {
        // the arithmetic form above agrees with `(n << 1) ^ (n >> 63)`
        #[allow(clippy::cast_sign_loss)]
        fn shift_xor(n: i64) -> u64 {
            ((n << 1) ^ (n >> 63)) as u64
        }

        for n in [-12345i64, -1, 0, 1, 12345, i64::MIN, i64::MAX] {
            assert_eq!(n.into_unsigned(), shift_xor(n), "mapping of {n} differs");
        }
    }

    #[test]
    fn unterminated_returns_accumulated() {
        let v = decode_unsigned(&[0xFF, 0x81]).expect("no overflow");
        assert_eq!(v, 0x7F | (0x01 << 7));
        assert!(!is_terminated(&[0xFF, 0x81]), "no terminal byte");
    }

    #[test]
    fn overflow_is_detected() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert!(matches!(decode::<u32>(&bytes), Err(Error::IntegerOverflow)));
        assert_eq!(decode::<u64>(&bytes).expect("fits u64"), 0x7_FFFF_FFFF);
    }

    #[test]
    fn scan_stops_at_terminal_byte() {
        let buf = [0x08, 0xAC, 0x02, 0x12];
        assert_eq!(scan(&buf, 0), [0x08]);
        assert_eq!(scan(&buf, 1), [0xAC, 0x02]);
        assert_eq!(scan(&buf, 3), [0x12]);
        assert!(scan(&buf, 4).is_empty(), "past the end");
        assert_eq!(scan(&[0x80, 0x80], 0), [0x80, 0x80]);
    }
}
