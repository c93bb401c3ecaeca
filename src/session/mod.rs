//! Session layer: per-peer sessions and the demultiplexer that owns them.

#[allow(clippy::module_inception)]
mod session;
mod table;
mod termination;

pub use session::{Session, SessionStats};
pub use table::{Routing, SessionTable, TickReport};
pub use termination::{Termination, TerminationState};
