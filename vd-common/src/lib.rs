//! # Visual Descriptor Common Library
//!
//! Shared code for the visual descriptor workspace:
//! - Error type and result alias
//! - TOML configuration loading and setting resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
