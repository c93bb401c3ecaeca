//! Core configuration, constants, error types and collaborator traits.

mod config;
pub mod constants;
mod error;
mod traits;

pub use config::{Config, ConfigBuilder};
pub use error::{ConfigError, Error, Result, SegmentError, SessionError};
pub use traits::{ByteSink, ByteSource, RecordingTransport, SourceRead, Transport};
