//! PUL Store
//!
//! The storage collaborator of the update engine:
//! - `Store`: position-addressed primitive operations on a pre-order table
//! - `MemStore`: in-memory table implementation with stable node ids
//! - `Catalog`: all sources of one instance (named stores and local copies)
//! - `WriteLock`: exclusive write lock shared between snapshots
//! - `xml`: parsing into fragments and serialization of subtrees

mod catalog;
mod lock;
mod memory;
mod store;
pub mod xml;

pub use catalog::*;
pub use lock::*;
pub use memory::*;
pub use store::*;
