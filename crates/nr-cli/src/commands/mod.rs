//! CLI command implementations.

pub mod notify;
pub mod report;
pub mod util;
