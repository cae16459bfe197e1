//! Table merging
//!
//! The row-level join is an external transform behind [`TableMerger`]; the
//! pipeline only chooses inputs, orders them and checks preconditions.
//! [`JoinMerger`] is the in-process implementation used by default.

use crate::error::{ForgeError, ForgeResult};
use crate::table::{self, ClassMapping, MappingTable, MemberKind, MemberMapping};
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Joins two or more table files on their shared first namespace
#[async_trait]
pub trait TableMerger: Send + Sync {
    /// Merge `inputs` (in order) into a new table written to `output`
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> ForgeResult<()>;
}

/// Row join on the join namespace, first non-empty name wins per column
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinMerger;

#[async_trait]
impl TableMerger for JoinMerger {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> ForgeResult<()> {
        info!(":merging {} tables into {}", inputs.len(), output.display());

        let mut tables = Vec::with_capacity(inputs.len());
        for input in inputs {
            tables.push(table::read_table(input).await?);
        }

        let merged = merge_tables(&tables).map_err(|e| match e {
            ForgeError::Transform { reason, .. } => ForgeError::transform(inputs, reason),
            other => other,
        })?;
        table::write_table(&merged, output).await
    }
}

type MemberKey = (MemberKind, String, String);

struct ClassRow {
    names: Vec<String>,
    members: IndexMap<MemberKey, Vec<String>>,
}

/// Join `tables` on their common first namespace.
///
/// The result's namespaces are the join namespace followed by each input's
/// remaining namespaces in input order, duplicates collapsed. Every class and
/// member of every input appears exactly once; identifiers an entity lacks
/// stay empty.
pub fn merge_tables(tables: &[MappingTable]) -> ForgeResult<MappingTable> {
    if tables.len() < 2 {
        return Err(ForgeError::transform(
            &[],
            format!("merging needs at least two tables, got {}", tables.len()),
        ));
    }

    let join = tables[0].join_namespace();
    if let Some(other) = tables.iter().find(|t| t.join_namespace() != join) {
        return Err(ForgeError::transform(
            &[],
            format!(
                "all tables must start with the join namespace '{}' (found '{}')",
                join,
                other.join_namespace()
            ),
        ));
    }

    let mut namespaces: IndexSet<&str> = IndexSet::new();
    for table in tables {
        namespaces.extend(table.namespaces().iter().map(String::as_str));
    }
    let width = namespaces.len();
    debug!("Merged namespaces: {:?}", namespaces);

    let mut properties: IndexMap<String, String> = IndexMap::new();
    let mut rows: IndexMap<String, ClassRow> = IndexMap::new();

    for table in tables {
        let columns: Vec<usize> = table
            .namespaces()
            .iter()
            .filter_map(|ns| namespaces.get_index_of(ns.as_str()))
            .collect();

        for (key, value) in table.properties() {
            properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        for class in table.classes() {
            let row = rows
                .entry(class.names[0].clone())
                .or_insert_with(|| ClassRow {
                    names: vec![String::new(); width],
                    members: IndexMap::new(),
                });
            fill(&mut row.names, &class.names, &columns);

            for member in &class.members {
                let key = (
                    member.kind,
                    member.names[0].clone(),
                    member.descriptor.clone(),
                );
                let names = row
                    .members
                    .entry(key)
                    .or_insert_with(|| vec![String::new(); width]);
                fill(names, &member.names, &columns);
            }
        }
    }

    let classes = rows
        .into_values()
        .map(|row| ClassMapping {
            names: row.names,
            members: row
                .members
                .into_iter()
                .map(|((kind, _, descriptor), names)| MemberMapping {
                    kind,
                    descriptor,
                    names,
                })
                .collect(),
        })
        .collect();

    MappingTable::from_parts(
        namespaces.iter().map(|ns| ns.to_string()).collect(),
        properties.into_iter().collect(),
        classes,
    )
    .map_err(|reason| ForgeError::transform(&[], reason))
}

fn fill(target: &mut [String], source: &[String], columns: &[usize]) {
    for (name, &column) in source.iter().zip(columns) {
        if target[column].is_empty() && !name.is_empty() {
            target[column] = name.clone();
        }
    }
}
