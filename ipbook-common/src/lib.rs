//! # IP-Book Common Library
//!
//! Shared code for the IP-Book services:
//! - Error types
//! - Configuration loading and root folder resolution
//! - Civil-time (fixed +09:00) timestamp utilities

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
