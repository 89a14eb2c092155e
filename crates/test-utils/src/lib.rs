//! Shared test utilities for coffer crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`StoreDir`] - Scratch directory that names and inspects store files
//! - [`strategies`] - Proptest generators for scalar key values

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod store_dir;
pub use store_dir::StoreDir;

pub mod strategies;
