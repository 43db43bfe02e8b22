//! Domain layer types and invariants.

pub mod anchor;
pub mod blocks;
pub mod error;
