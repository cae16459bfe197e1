//! tinyforge - layered mapping table pipeline
//!
//! Resolves the dependencies declared for a build, hands each one to the
//! provider bound to its slot, and caches the canonical tiny tables those
//! providers extract, reorder and merge.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod resolver;
pub mod store;
pub mod table;
pub mod transform;
pub mod ui;

pub use error::{ForgeError, ForgeResult};
