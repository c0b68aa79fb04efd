//! Shared utilities.

pub mod errors;
pub mod logger;
pub mod printer;
