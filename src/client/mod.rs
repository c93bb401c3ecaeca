//! Client driver.
//!
//! Runs a single session against one peer over UDP.

#[allow(clippy::module_inception)]
mod client;

pub use client::*;
