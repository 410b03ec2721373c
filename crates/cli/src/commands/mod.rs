//! CLI command implementations.

pub mod descriptor;
pub mod simulate;
