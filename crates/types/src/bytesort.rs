//! Order-preserving byte encoding of scalars.
//!
//! For every kind, comparing two encodings byte-wise gives the same
//! ordering as comparing the values:
//!
//! - unsigned integers: big-endian
//! - signed integers: sign bit flipped, then big-endian, so negatives sort first
//! - floats: negative values have every bit inverted, others only the sign bit;
//!   `-0.0` is stored as `0.0` so equal values share one encoding
//! - bool: a single `0` or `1` byte
//! - strings: raw UTF-8
//!
//! Primary keys are always 8 bytes: integer IDs are widened to 64 bits
//! before encoding and surrogate keys are encoded as `u64`.

use byteorder::{BigEndian, ByteOrder};
use snafu::{ResultExt, Snafu};

use crate::scalar::{Scalar, ScalarKind};

/// Length of every encoded primary key.
pub const PRIMARY_KEY_LEN: usize = 8;

/// Errors from decoding byte-sortable keys.
#[derive(Debug, Snafu)]
pub enum KeyEncodingError {
    /// The input has the wrong length for a fixed-width kind.
    #[snafu(display("cannot decode {kind}: expected {expected} bytes, got {actual}"))]
    Length {
        /// Kind being decoded.
        kind: ScalarKind,
        /// Required byte count.
        expected: usize,
        /// Byte count provided.
        actual: usize,
    },

    /// A string key is not valid UTF-8.
    #[snafu(display("string key is not valid UTF-8: {source}"))]
    Utf8 {
        /// The underlying conversion error.
        source: std::string::FromUtf8Error,
    },

    /// A bool key holds a byte other than 0 or 1.
    #[snafu(display("invalid bool key byte {byte:#04x}"))]
    Bool {
        /// The offending byte.
        byte: u8,
    },

    /// A primary key was requested for a non-integer value.
    #[snafu(display("{kind} values cannot be used directly as a primary key"))]
    NotInteger {
        /// Kind of the rejected value.
        kind: ScalarKind,
    },
}

const SIGN_8: u8 = 1 << 7;
const SIGN_16: u16 = 1 << 15;
const SIGN_32: u32 = 1 << 31;
const SIGN_64: u64 = 1 << 63;

/// Encodes a scalar into a new buffer.
pub fn encode(value: &Scalar) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.kind().fixed_width().unwrap_or(16));
    encode_into(value, &mut out);
    out
}

/// Appends the encoding of a scalar to `out`.
pub fn encode_into(value: &Scalar, out: &mut Vec<u8>) {
    match value {
        Scalar::I8(v) => out.push((*v as u8) ^ SIGN_8),
        Scalar::I16(v) => push_u16(out, (*v as u16) ^ SIGN_16),
        Scalar::I32(v) => push_u32(out, (*v as u32) ^ SIGN_32),
        Scalar::I64(v) => push_u64(out, (*v as u64) ^ SIGN_64),
        Scalar::U8(v) => out.push(*v),
        Scalar::U16(v) => push_u16(out, *v),
        Scalar::U32(v) => push_u32(out, *v),
        Scalar::U64(v) => push_u64(out, *v),
        Scalar::F32(v) => {
            let bits = if *v == 0.0 { 0 } else { v.to_bits() };
            push_u32(out, if bits & SIGN_32 != 0 { !bits } else { bits | SIGN_32 });
        },
        Scalar::F64(v) => {
            let bits = if *v == 0.0 { 0 } else { v.to_bits() };
            push_u64(out, if bits & SIGN_64 != 0 { !bits } else { bits | SIGN_64 });
        },
        Scalar::Bool(v) => out.push(u8::from(*v)),
        Scalar::Str(v) => out.extend_from_slice(v.as_bytes()),
    }
}

/// Decodes bytes produced by [`encode`] for the given kind.
///
/// # Errors
///
/// Returns [`KeyEncodingError`] if the bytes are not a valid encoding of `kind`.
pub fn decode(kind: ScalarKind, bytes: &[u8]) -> Result<Scalar, KeyEncodingError> {
    if let Some(expected) = kind.fixed_width() {
        if bytes.len() != expected {
            return LengthSnafu { kind, expected, actual: bytes.len() }.fail();
        }
    }

    let value = match kind {
        ScalarKind::I8 => Scalar::I8((bytes[0] ^ SIGN_8) as i8),
        ScalarKind::I16 => Scalar::I16((BigEndian::read_u16(bytes) ^ SIGN_16) as i16),
        ScalarKind::I32 => Scalar::I32((BigEndian::read_u32(bytes) ^ SIGN_32) as i32),
        ScalarKind::I64 => Scalar::I64((BigEndian::read_u64(bytes) ^ SIGN_64) as i64),
        ScalarKind::U8 => Scalar::U8(bytes[0]),
        ScalarKind::U16 => Scalar::U16(BigEndian::read_u16(bytes)),
        ScalarKind::U32 => Scalar::U32(BigEndian::read_u32(bytes)),
        ScalarKind::U64 => Scalar::U64(BigEndian::read_u64(bytes)),
        ScalarKind::F32 => {
            let bits = BigEndian::read_u32(bytes);
            Scalar::F32(f32::from_bits(if bits & SIGN_32 != 0 { bits ^ SIGN_32 } else { !bits }))
        },
        ScalarKind::F64 => {
            let bits = BigEndian::read_u64(bytes);
            Scalar::F64(f64::from_bits(if bits & SIGN_64 != 0 { bits ^ SIGN_64 } else { !bits }))
        },
        ScalarKind::Bool => match bytes[0] {
            0 => Scalar::Bool(false),
            1 => Scalar::Bool(true),
            byte => return BoolSnafu { byte }.fail(),
        },
        ScalarKind::Str => Scalar::Str(String::from_utf8(bytes.to_vec()).context(Utf8Snafu)?),
    };
    Ok(value)
}

/// Encodes an integer ID as an 8-byte primary key.
///
/// Signed values are sign-extended to `i64`, unsigned values zero-extended
/// to `u64`, so every integer kind yields a key of [`PRIMARY_KEY_LEN`] bytes.
///
/// # Errors
///
/// Returns [`KeyEncodingError::NotInteger`] for non-integer values.
pub fn encode_primary(value: &Scalar) -> Result<[u8; PRIMARY_KEY_LEN], KeyEncodingError> {
    let mut key = [0u8; PRIMARY_KEY_LEN];
    let wide = match value {
        Scalar::I8(v) => (i64::from(*v) as u64) ^ SIGN_64,
        Scalar::I16(v) => (i64::from(*v) as u64) ^ SIGN_64,
        Scalar::I32(v) => (i64::from(*v) as u64) ^ SIGN_64,
        Scalar::I64(v) => (*v as u64) ^ SIGN_64,
        Scalar::U8(v) => u64::from(*v),
        Scalar::U16(v) => u64::from(*v),
        Scalar::U32(v) => u64::from(*v),
        Scalar::U64(v) => *v,
        other => return NotIntegerSnafu { kind: other.kind() }.fail(),
    };
    BigEndian::write_u64(&mut key, wide);
    Ok(key)
}

/// Encodes a surrogate key.
pub fn encode_surrogate(value: u64) -> [u8; PRIMARY_KEY_LEN] {
    let mut key = [0u8; PRIMARY_KEY_LEN];
    BigEndian::write_u64(&mut key, value);
    key
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, v);
    out.extend_from_slice(&buf);
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, v);
    out.extend_from_slice(&buf);
}

fn push_u64(out: &mut Vec<u8>, v: u64) {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, v);
    out.extend_from_slice(&buf);
}
