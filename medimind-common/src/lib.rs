//! # MediMind Common Library
//!
//! Shared code for the MediMind backend including:
//! - Configuration loading (CLI / ENV / TOML / compiled defaults)
//! - Database initialization and row models
//! - Reminder timezone helpers
//! - Identifier utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
