//! # Elisio Common Library
//!
//! Shared code for the Elisio client crates including:
//! - Corpus entities and JSON wire records
//! - Batch criteria and scan result types
//! - UI event types and the event bus
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
