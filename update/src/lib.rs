//! PUL Update
//!
//! The pending update engine.
//!
//! Responsibilities:
//! - Collect update primitives per target node and merge them by type
//! - Validate a snapshot (name conflicts, dangling puts, duplicate put targets)
//! - Order primitives so that position-based edits stay correct
//! - Apply node edits, merge adjacent texts, run whole-store operations and puts

mod apply;
mod cancel;
mod comparator;
mod config;
mod database_updates;
mod error;
mod modifier;
mod name_pool;
mod node_updates;
mod permission;
mod primitive;
mod updates;

pub use cancel::CancelHandle;
pub use comparator::{compare, sort_descending, Located};
pub use config::UpdateOptions;
pub use database_updates::DatabaseUpdates;
pub use error::{ErrorKind, UpdateError, UpdateResult};
pub use modifier::{CheckedUpdates, ContextModifier, Scope};
pub use name_pool::{NamePool, NamespaceClash};
pub use node_updates::NodeUpdates;
pub use permission::{AccessList, AllowAll, Permissions};
pub use primitive::{NodeOp, Primitive, Put, StoreOp, Target, Update, UpdateKind};
pub use updates::{ApplyReport, Updates};
