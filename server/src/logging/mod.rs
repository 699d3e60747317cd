//! Logging helpers.

pub mod sanitize;
