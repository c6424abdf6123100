//! PUL Export
//!
//! Destinations for serialized documents.
//!
//! Responsibilities:
//! - Receive the output of put operations
//! - Receive modified stores on write-back
//! - Make written content durable on sync

mod error;
mod sink;

pub use error::{ExportError, ExportResult};
pub use sink::{FileSink, MemorySink, Sink};
