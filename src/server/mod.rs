//! Server driver.
//!
//! Runs a Session Table over one UDP socket, serving many peers at once.

#[allow(clippy::module_inception)]
mod server;

pub use server::*;
