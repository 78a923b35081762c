//! Foundational types for the binary agreement protocol.
//!
//! This crate provides the types shared by every layer of the
//! implementation:
//!
//! - **Domain values**: [`Value`] (the tri-valued vote domain) and
//!   [`Phase`] (the two broadcast phases of a round)
//! - **Identity & parameters**: [`NodeId`] and the immutable
//!   [`ProtocolParams`] a node is booted with
//! - **Read model**: [`NodeSnapshot`], the state exposed to the
//!   control surface
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not
//! depend on any other workspace crates, making it the foundation layer.

mod params;
mod snapshot;
mod value;

pub use params::{NodeId, ProtocolParams};
pub use snapshot::NodeSnapshot;
pub use value::{Phase, Value};
