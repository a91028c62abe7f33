#![cfg_attr(doc, doc = include_str!("../README.md"))]
#![forbid(unsafe_code)]

pub mod args;
pub mod config;

mod error;
pub use error::{TmError, TmResult};

pub mod loader;
pub mod logging;

// Ensure README.md contains valid code
#[cfg(doctest)]
#[doc = include_str!("../README.md")]
pub struct ReadmeDoctests;
