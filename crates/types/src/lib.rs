//! Foundation types shared across the canopy crates.
//!
//! This crate has no dependency on the schema model or the translators; it
//! defines the value types they exchange:
//! - **tree**: the rose tree of string nodes that every translator produces
//!   and consumes
//! - **flags**: the flag word accepted by most entry points
//! - **store**: the narrow interface to the external key/value store, plus an
//!   in-memory implementation for tests and embedders without a real backend

pub mod flags;
pub mod store;
pub mod tree;

pub use flags::Flags;
pub use store::{InMemoryStore, Store, StoreError};
pub use tree::DataTree;
