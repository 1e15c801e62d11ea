//! Core admission + normalization pipeline for the receipt chat bridge.
//!
//! This crate is intentionally framework-agnostic. Telegram and the ESC/POS printer
//! live behind ports (traits) implemented in adapter crates.

pub mod attachments;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod fetch;
pub mod job;
pub mod logging;
pub mod messaging;
pub mod policy;
pub mod ports;
pub mod security;
pub mod sequencer;

pub use errors::{Error, Result};
