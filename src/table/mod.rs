//! Namespace mapping tables
//!
//! A table is an ordered list of namespaces plus class and member rows that
//! carry one identifier per namespace, positionally aligned. The first
//! namespace is the join namespace: member descriptors are expressed in it
//! and merges match rows on it.
//!
//! Tables are values. Transforms produce new tables and never mutate their
//! inputs.

pub mod tiny;

pub use tiny::{parse_table, read_table, render_table, write_table, TableFormat, TableHeader};

use std::collections::HashSet;
use std::fmt;

/// Kind of a class member row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Field,
}

impl MemberKind {
    /// Tiny v2 line tag for this member kind
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Method => "m",
            Self::Field => "f",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Method => "method",
            Self::Field => "field",
        };
        write!(f, "{}", name)
    }
}

/// A method or field row, nested under its owner class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMapping {
    pub kind: MemberKind,
    /// Descriptor in the table's first namespace
    pub descriptor: String,
    /// One name per namespace; empty means absent
    pub names: Vec<String>,
}

/// A class row with its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    /// One name per namespace; empty means absent
    pub names: Vec<String>,
    pub members: Vec<MemberMapping>,
}

impl ClassMapping {
    /// Create a class row without members
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            members: Vec::new(),
        }
    }

    /// Builder-style member addition
    pub fn with_member(mut self, kind: MemberKind, descriptor: &str, names: Vec<String>) -> Self {
        self.members.push(MemberMapping {
            kind,
            descriptor: descriptor.to_string(),
            names,
        });
        self
    }

    /// Name of this class in the given column, if present
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }
}

/// In-memory namespace mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    namespaces: Vec<String>,
    properties: Vec<(String, String)>,
    classes: Vec<ClassMapping>,
}

impl MappingTable {
    /// Create an empty table over the given namespaces.
    ///
    /// Fails when the list is empty or contains duplicates.
    pub fn new(namespaces: Vec<String>) -> Result<Self, String> {
        check_namespaces(&namespaces)?;
        Ok(Self {
            namespaces,
            properties: Vec::new(),
            classes: Vec::new(),
        })
    }

    /// Assemble a table from parts, checking every row's width
    pub fn from_parts(
        namespaces: Vec<String>,
        properties: Vec<(String, String)>,
        classes: Vec<ClassMapping>,
    ) -> Result<Self, String> {
        let table = Self {
            namespaces,
            properties,
            classes,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// The namespace rows are joined on (the first one)
    pub fn join_namespace(&self) -> &str {
        &self.namespaces[0]
    }

    /// Column index of a namespace
    pub fn namespace_index(&self, namespace: &str) -> Option<usize> {
        self.namespaces.iter().position(|n| n == namespace)
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Value of a header property, if set
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> &[ClassMapping] {
        &self.classes
    }

    /// Append a class row; fails if any row width differs from the namespace count
    pub fn push_class(&mut self, class: ClassMapping) -> Result<(), String> {
        check_class(&class, self.namespaces.len())?;
        self.classes.push(class);
        Ok(())
    }

    /// Number of classes plus members
    pub fn entity_count(&self) -> usize {
        self.classes.iter().map(|c| 1 + c.members.len()).sum()
    }

    /// Check the structural invariants: unique namespaces, aligned rows
    pub fn validate(&self) -> Result<(), String> {
        check_namespaces(&self.namespaces)?;
        for class in &self.classes {
            check_class(class, self.namespaces.len())?;
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<(String, String)>, Vec<ClassMapping>) {
        (self.namespaces, self.properties, self.classes)
    }
}

fn check_namespaces(namespaces: &[String]) -> Result<(), String> {
    if namespaces.is_empty() {
        return Err("a table needs at least one namespace".to_string());
    }
    let mut seen = HashSet::with_capacity(namespaces.len());
    for ns in namespaces {
        if ns.is_empty() {
            return Err("namespace names must not be empty".to_string());
        }
        if !seen.insert(ns.as_str()) {
            return Err(format!("duplicate namespace '{}'", ns));
        }
    }
    Ok(())
}

fn check_class(class: &ClassMapping, width: usize) -> Result<(), String> {
    if class.names.len() != width {
        return Err(format!(
            "class row has {} names but the table has {} namespaces",
            class.names.len(),
            width
        ));
    }
    for member in &class.members {
        if member.names.len() != width {
            return Err(format!(
                "{} row '{}' has {} names but the table has {} namespaces",
                member.kind,
                member.names.first().map(String::as_str).unwrap_or(""),
                member.names.len(),
                width
            ));
        }
    }
    Ok(())
}

/// Convenience for building name vectors in tests and fixtures
pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
