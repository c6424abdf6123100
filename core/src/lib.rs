//! PUL Core Types
//!
//! This crate provides the foundational types used throughout the PUL system:
//! - Identity types (SourceId, NodeId, Principal, Pre)
//! - Qualified names (QName)
//! - Table rows and node kinds of the pre-order document encoding
//! - Fragments (node sequences used as update payloads)
//! - Common store error types

mod error;
mod fragment;
mod id;
mod name;
mod node;

pub use error::*;
pub use fragment::*;
pub use id::*;
pub use name::*;
pub use node::*;
