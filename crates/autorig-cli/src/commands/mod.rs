//! CLI command implementations

pub mod clean;
pub mod eval;
pub mod manifest;
pub mod populate;
pub mod template;
