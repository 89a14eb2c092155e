//! Proptest strategies for coffer key values.
//!
//! Reusable generators for property-based testing across crates.
//!
//! # Usage
//!
//! ```no_run
//! use coffer_test_utils::strategies;
//! use coffer_types::ScalarKind;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(value in strategies::arb_scalar_of(ScalarKind::Str)) {
//!         // test invariant with a randomly generated string scalar
//!     }
//! }
//! ```

use coffer_types::{Scalar, ScalarKind};
use proptest::prelude::*;

/// Generates an arbitrary scalar kind.
pub fn arb_kind() -> impl Strategy<Value = ScalarKind> {
    prop::sample::select(ScalarKind::ALL.to_vec())
}

/// Generates an arbitrary integer scalar of any width and signedness.
pub fn arb_integer() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        any::<i8>().prop_map(Scalar::I8),
        any::<i16>().prop_map(Scalar::I16),
        any::<i32>().prop_map(Scalar::I32),
        any::<i64>().prop_map(Scalar::I64),
        any::<u8>().prop_map(Scalar::U8),
        any::<u16>().prop_map(Scalar::U16),
        any::<u32>().prop_map(Scalar::U32),
        any::<u64>().prop_map(Scalar::U64),
    ]
}

/// Generates a short record name matching `[a-z][a-z0-9]{0,11}`.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,11}"
}

/// Generates an arbitrary scalar of the given kind.
pub fn arb_scalar_of(kind: ScalarKind) -> BoxedStrategy<Scalar> {
    match kind {
        ScalarKind::I8 => any::<i8>().prop_map(Scalar::I8).boxed(),
        ScalarKind::I16 => any::<i16>().prop_map(Scalar::I16).boxed(),
        ScalarKind::I32 => any::<i32>().prop_map(Scalar::I32).boxed(),
        ScalarKind::I64 => any::<i64>().prop_map(Scalar::I64).boxed(),
        ScalarKind::U8 => any::<u8>().prop_map(Scalar::U8).boxed(),
        ScalarKind::U16 => any::<u16>().prop_map(Scalar::U16).boxed(),
        ScalarKind::U32 => any::<u32>().prop_map(Scalar::U32).boxed(),
        ScalarKind::U64 => any::<u64>().prop_map(Scalar::U64).boxed(),
        ScalarKind::F32 => (-1.0e9f32..1.0e9f32).prop_map(Scalar::F32).boxed(),
        ScalarKind::F64 => (-1.0e18f64..1.0e18f64).prop_map(Scalar::F64).boxed(),
        ScalarKind::Bool => any::<bool>().prop_map(Scalar::Bool).boxed(),
        ScalarKind::Str => ".{0,16}".prop_map(Scalar::Str).boxed(),
    }
}
