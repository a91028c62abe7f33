#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

/// Capability catalog of datasource parameters
pub mod catalog;

/// Datasource introspection
pub mod probe;

pub mod projection;

pub mod sort_keys;
pub use sort_keys::{sort_keys, to_sorted_yaml};

pub mod source;

pub mod stylesheet;
