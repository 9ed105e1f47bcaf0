//! Shared utilities

pub mod sleep;

pub use sleep::*;
