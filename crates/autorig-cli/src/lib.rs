//! Autorig CLI library.
//!
//! Command implementations and file loading for the `autorig` binary.

pub mod commands;
pub mod input;
