//! # Ambit Support
//!
//! Shared diagnostic helpers for the Ambit DI crates.
//!
//! This crate provides:
//! - Rendering of resolution chains for cycle errors
//! - "Did you mean?" suggestions for unknown tokens
//! - Short type names for `Debug` output

pub mod rendering;
