//! # Panel Common Library
//!
//! Shared code for the panel schedule workspace:
//! - Common error type
//! - Bootstrap configuration (TOML)
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
