//! CLI command implementations

pub mod cache;
pub mod config;
pub mod namespaces;
pub mod run;
pub mod table;

pub use cache::execute as cache;
pub use config::execute as config;
pub use namespaces::execute as namespaces;
pub use run::execute as run;
pub use table::{merge, reorder};
