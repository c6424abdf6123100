//! PUL Session
//!
//! Runs snapshots on behalf of a principal.
//!
//! Responsibilities:
//! - Allocate session ids
//! - Track the in-flight snapshot of each session with a cancellation handle
//! - Cancel a superseded snapshot of the same session before it locks
//! - Collect updates and commit them through the update engine

mod error;
mod registry;
mod session;

pub use error::{SessionError, SessionResult};
pub use registry::SessionRegistry;
pub use session::{Session, SessionId};
