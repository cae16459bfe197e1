//! Namespace reordering
//!
//! Re-projects a table's columns into a requested namespace order. Rows keep
//! their order. When the first namespace changes, member descriptors are
//! rewritten into the new first namespace using the table's own class names.

use crate::error::{ForgeError, ForgeResult};
use crate::table::{self, ClassMapping, MappingTable, MemberMapping};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Reorder `table` so its namespaces follow `order`.
///
/// `order` must be a permutation of the table's namespaces. A row whose name
/// in the new first namespace is absent keeps its previous first name there,
/// since the join column may not hold empty identifiers.
pub fn reorder(table: &MappingTable, order: &[&str]) -> ForgeResult<MappingTable> {
    let indices = permutation(table.namespaces(), order)?;

    let source = indices[0];
    let class_map: HashMap<&str, &str> = if source == 0 {
        HashMap::new()
    } else {
        table
            .classes()
            .iter()
            .filter_map(|c| Some((c.name(0)?, c.name(source)?)))
            .collect()
    };

    let classes = table
        .classes()
        .iter()
        .map(|class| ClassMapping {
            names: project(&class.names, &indices),
            members: class
                .members
                .iter()
                .map(|member| MemberMapping {
                    kind: member.kind,
                    descriptor: if class_map.is_empty() {
                        member.descriptor.clone()
                    } else {
                        remap_descriptor(&member.descriptor, &class_map)
                    },
                    names: project(&member.names, &indices),
                })
                .collect(),
        })
        .collect();

    MappingTable::from_parts(
        order.iter().map(|ns| ns.to_string()).collect(),
        table.properties().to_vec(),
        classes,
    )
    .map_err(|reason| ForgeError::transform(&[], reason))
}

/// Read `input`, reorder it and write the result to `output`
pub async fn reorder_file(input: &Path, output: &Path, order: &[&str]) -> ForgeResult<()> {
    info!(
        ":reordering {} to [{}] and saving to {}",
        input.display(),
        order.join(", "),
        output.display()
    );
    let table = table::read_table(input).await?;
    let reordered = reorder(&table, order).map_err(|e| match e {
        ForgeError::Transform { reason, .. } => {
            ForgeError::transform(&[input.to_path_buf(), output.to_path_buf()], reason)
        }
        other => other,
    })?;
    table::write_table(&reordered, output).await
}

/// `namespaces` with `first` moved to the front, the rest keeping their order
pub fn lead_with<'a>(namespaces: &'a [String], first: &'a str) -> Vec<&'a str> {
    std::iter::once(first)
        .chain(
            namespaces
                .iter()
                .map(String::as_str)
                .filter(|ns| *ns != first),
        )
        .collect()
}

/// Column indices of `order` within `namespaces`; fails unless `order` is a
/// permutation
fn permutation(namespaces: &[String], order: &[&str]) -> ForgeResult<Vec<usize>> {
    let not_permutation = || {
        ForgeError::transform(
            &[],
            format!(
                "[{}] is not a permutation of [{}]",
                order.join(", "),
                namespaces.join(", ")
            ),
        )
    };

    if order.len() != namespaces.len() {
        return Err(not_permutation());
    }

    let mut seen = HashSet::with_capacity(order.len());
    let mut indices = Vec::with_capacity(order.len());
    for ns in order {
        if !seen.insert(*ns) {
            return Err(not_permutation());
        }
        let index = namespaces
            .iter()
            .position(|n| n == ns)
            .ok_or_else(not_permutation)?;
        indices.push(index);
    }
    Ok(indices)
}

fn project(names: &[String], indices: &[usize]) -> Vec<String> {
    let mut projected: Vec<String> = indices.iter().map(|&i| names[i].clone()).collect();
    if projected[0].is_empty() {
        projected[0] = names[0].clone();
    }
    projected
}

/// Rewrite every `L<class>;` reference in a JVM descriptor through `class_map`
pub fn remap_descriptor(descriptor: &str, class_map: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(descriptor.len());
    let mut rest = descriptor;

    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..=start]);
        let after = &rest[start + 1..];
        match after.find(';') {
            Some(end) => {
                let name = &after[..end];
                out.push_str(class_map.get(name).copied().unwrap_or(name));
                out.push(';');
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
