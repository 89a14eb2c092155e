//! Scalar values that can participate in primary and index keys.
//!
//! A [`Scalar`] is the dynamically-typed view of a record field the key
//! encoder understands. Record fields are lifted into scalars through
//! [`ScalarType`], which is implemented for every supported primitive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a scalar field.
///
/// Kinds are part of index names, so their display strings are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Str,
}

impl ScalarKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [ScalarKind; 12] = [
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::U32,
        ScalarKind::U64,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::Bool,
        ScalarKind::Str,
    ];

    /// Returns true for signed and unsigned integer kinds.
    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    /// Returns true for signed integer kinds.
    pub fn is_signed(self) -> bool {
        matches!(self, ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64)
    }

    /// Returns true for unsigned integer kinds.
    pub fn is_unsigned(self) -> bool {
        matches!(self, ScalarKind::U8 | ScalarKind::U16 | ScalarKind::U32 | ScalarKind::U64)
    }

    /// Encoded width in bytes, or `None` for variable-width strings.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ScalarKind::I8 | ScalarKind::U8 | ScalarKind::Bool => Some(1),
            ScalarKind::I16 | ScalarKind::U16 => Some(2),
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => Some(4),
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => Some(8),
            ScalarKind::Str => None,
        }
    }

    /// The zero value of this kind.
    pub fn zero(self) -> Scalar {
        match self {
            ScalarKind::I8 => Scalar::I8(0),
            ScalarKind::I16 => Scalar::I16(0),
            ScalarKind::I32 => Scalar::I32(0),
            ScalarKind::I64 => Scalar::I64(0),
            ScalarKind::U8 => Scalar::U8(0),
            ScalarKind::U16 => Scalar::U16(0),
            ScalarKind::U32 => Scalar::U32(0),
            ScalarKind::U64 => Scalar::U64(0),
            ScalarKind::F32 => Scalar::F32(0.0),
            ScalarKind::F64 => Scalar::F64(0.0),
            ScalarKind::Bool => Scalar::Bool(false),
            ScalarKind::Str => Scalar::Str(String::new()),
        }
    }

    /// Converts a sequence value into this integer kind.
    ///
    /// Returns `None` when the value does not fit the kind's width and
    /// signedness, or when the kind is not an integer.
    pub fn from_sequence(self, value: u64) -> Option<Scalar> {
        match self {
            ScalarKind::I8 => i8::try_from(value).ok().map(Scalar::I8),
            ScalarKind::I16 => i16::try_from(value).ok().map(Scalar::I16),
            ScalarKind::I32 => i32::try_from(value).ok().map(Scalar::I32),
            ScalarKind::I64 => i64::try_from(value).ok().map(Scalar::I64),
            ScalarKind::U8 => u8::try_from(value).ok().map(Scalar::U8),
            ScalarKind::U16 => u16::try_from(value).ok().map(Scalar::U16),
            ScalarKind::U32 => u32::try_from(value).ok().map(Scalar::U32),
            ScalarKind::U64 => Some(Scalar::U64(value)),
            _ => None,
        }
    }

    /// Stable name used in index names and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "int8",
            ScalarKind::I16 => "int16",
            ScalarKind::I32 => "int32",
            ScalarKind::I64 => "int64",
            ScalarKind::U8 => "uint8",
            ScalarKind::U16 => "uint16",
            ScalarKind::U32 => "uint32",
            ScalarKind::U64 => "uint64",
            ScalarKind::F32 => "float32",
            ScalarKind::F64 => "float64",
            ScalarKind::Bool => "bool",
            ScalarKind::Str => "string",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically-typed scalar value.
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Scalar {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    /// The kind of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::I8(_) => ScalarKind::I8,
            Scalar::I16(_) => ScalarKind::I16,
            Scalar::I32(_) => ScalarKind::I32,
            Scalar::I64(_) => ScalarKind::I64,
            Scalar::U8(_) => ScalarKind::U8,
            Scalar::U16(_) => ScalarKind::U16,
            Scalar::U32(_) => ScalarKind::U32,
            Scalar::U64(_) => ScalarKind::U64,
            Scalar::F32(_) => ScalarKind::F32,
            Scalar::F64(_) => ScalarKind::F64,
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }

    /// Returns true if this value equals the zero value of its kind.
    pub fn is_zero(&self) -> bool {
        *self == self.kind().zero()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::I8(v) => write!(f, "{v}"),
            Scalar::I16(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::U16(v) => write!(f, "{v}"),
            Scalar::U32(v) => write!(f, "{v}"),
            Scalar::U64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

/// A Rust type that maps onto exactly one [`ScalarKind`].
pub trait ScalarType: Clone + Send + Sync + 'static {
    /// The kind values of this type encode as.
    const KIND: ScalarKind;

    /// Lifts the value into a [`Scalar`].
    fn to_scalar(&self) -> Scalar;

    /// Lowers a [`Scalar`] back into this type, if the kinds match.
    fn from_scalar(value: Scalar) -> Option<Self>;
}

macro_rules! impl_scalar_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ScalarType for $ty {
                const KIND: ScalarKind = ScalarKind::$variant;

                fn to_scalar(&self) -> Scalar {
                    Scalar::$variant(*self)
                }

                fn from_scalar(value: Scalar) -> Option<Self> {
                    match value {
                        Scalar::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value)
                }
            }
        )*
    };
}

impl_scalar_type! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
}

impl ScalarType for String {
    const KIND: ScalarKind = ScalarKind::Str;

    fn to_scalar(&self) -> Scalar {
        Scalar::Str(self.clone())
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}
