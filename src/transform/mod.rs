//! Table transforms
//!
//! Reordering is a pure column permutation. Merging joins tables on their
//! shared first namespace through the [`TableMerger`] seam.

pub mod merge;
pub mod reorder;

pub use merge::{merge_tables, JoinMerger, TableMerger};
pub use reorder::{lead_with, remap_descriptor, reorder, reorder_file};
