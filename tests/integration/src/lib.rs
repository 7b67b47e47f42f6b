//! Integration test utilities for the lobby
//!
//! This crate provides helpers for running several gateway servers in one
//! process, wired together over loopback HTTP.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
