//! Tiny mapping file reader and writer
//!
//! Two on-disk formats are understood:
//!
//! | Format | Header | Rows |
//! |--------|--------|------|
//! | v2 | `tiny\t2\t<minor>\t<ns>...` | `c`, indented `m` / `f` under their class |
//! | v1 | `v1\t<ns>...` | flat `CLASS`, `METHOD`, `FIELD` lines |
//!
//! Only v2 is written. Comments, parameters and local variables are skipped
//! when loading a table.

use super::{ClassMapping, MappingTable, MemberKind, MemberMapping};
use crate::error::{ForgeError, ForgeResult};
use crate::store::commit_bytes;
use indexmap::IndexMap;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Header property that switches on backslash escaping of names
pub const ESCAPED_NAMES: &str = "escaped-names";

/// Supported tiny format revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Legacy flat format, already merged
    V1,
    /// Nested format carrying namespace metadata
    V2,
}

impl TableFormat {
    /// Suffix appended to a mapping version when its table uses this format
    pub fn version_suffix(&self) -> &'static str {
        match self {
            Self::V1 => "",
            Self::V2 => "-v2",
        }
    }
}

/// Namespace metadata read from the first line of a tiny file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub format: TableFormat,
    pub namespaces: Vec<String>,
}

impl TableHeader {
    /// Parse a header line
    pub fn parse(path: &Path, line: &str) -> ForgeResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let parts: Vec<&str> = line.split('\t').collect();

        let (format, namespaces) = match parts.as_slice() {
            ["tiny", "2", _minor, namespaces @ ..] => (TableFormat::V2, namespaces),
            ["tiny", major, ..] => {
                return Err(ForgeError::FormatDetection {
                    path: path.to_path_buf(),
                    reason: format!("unsupported tiny major version {}", major),
                })
            }
            ["v1", namespaces @ ..] => (TableFormat::V1, namespaces),
            _ => {
                return Err(ForgeError::FormatDetection {
                    path: path.to_path_buf(),
                    reason: "header is neither tiny v1 nor tiny v2".to_string(),
                })
            }
        };

        if namespaces.is_empty() || namespaces.iter().any(|ns| ns.is_empty()) {
            return Err(ForgeError::FormatDetection {
                path: path.to_path_buf(),
                reason: "header declares no namespaces".to_string(),
            });
        }

        Ok(Self {
            format,
            namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
        })
    }

    /// Read only the header of a tiny file
    pub async fn read(path: &Path) -> ForgeResult<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ForgeError::io(format!("opening mappings {}", path.display()), e))?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| ForgeError::io(format!("reading mappings {}", path.display()), e))?;
        Self::parse(path, &line)
    }
}

/// Parse a complete tiny file (either format) into a table
pub fn parse_table(path: &Path, content: &str) -> ForgeResult<MappingTable> {
    let mut lines = content.lines();
    let header_line = lines.next().ok_or_else(|| ForgeError::FormatDetection {
        path: path.to_path_buf(),
        reason: "file is empty".to_string(),
    })?;
    let header = TableHeader::parse(path, header_line)?;

    match header.format {
        TableFormat::V2 => parse_v2(path, header.namespaces, lines),
        TableFormat::V1 => parse_v1(path, header.namespaces, lines),
    }
}

/// Read and parse a tiny file
pub async fn read_table(path: &Path) -> ForgeResult<MappingTable> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ForgeError::io(format!("reading mappings {}", path.display()), e))?;
    parse_table(path, &content)
}

/// Render a table as tiny v2
pub fn render_table(table: &MappingTable) -> String {
    let escaped = table.property(ESCAPED_NAMES).is_some();
    let mut out = String::new();

    out.push_str("tiny\t2\t0");
    for ns in table.namespaces() {
        out.push('\t');
        out.push_str(ns);
    }
    out.push('\n');

    for (key, value) in table.properties() {
        out.push('\t');
        out.push_str(key);
        if !value.is_empty() {
            out.push('\t');
            out.push_str(value);
        }
        out.push('\n');
    }

    for class in table.classes() {
        out.push('c');
        push_names(&mut out, &class.names, escaped);
        out.push('\n');

        for member in &class.members {
            out.push('\t');
            out.push_str(member.kind.tag());
            out.push('\t');
            out.push_str(&member.descriptor);
            push_names(&mut out, &member.names, escaped);
            out.push('\n');
        }
    }

    out
}

/// Write a table as tiny v2, replacing the destination atomically
pub async fn write_table(table: &MappingTable, path: &Path) -> ForgeResult<()> {
    commit_bytes(path, render_table(table).as_bytes()).await
}

fn push_names(out: &mut String, names: &[String], escaped: bool) {
    for name in names {
        out.push('\t');
        if escaped {
            out.push_str(&escape(name));
        } else {
            out.push_str(name);
        }
    }
}

fn parse_v2<'a>(
    path: &Path,
    namespaces: Vec<String>,
    lines: impl Iterator<Item = &'a str>,
) -> ForgeResult<MappingTable> {
    let width = namespaces.len();
    let mut properties = Vec::new();
    let mut classes: Vec<ClassMapping> = Vec::new();
    let mut escaped = false;

    for (index, raw) in lines.enumerate() {
        // Header is line 1
        let line_no = index + 2;
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() {
            continue;
        }

        let depth = raw.chars().take_while(|c| *c == '\t').count();
        let fields: Vec<&str> = raw[depth..].split('\t').collect();

        match (depth, fields[0]) {
            (1, key) if classes.is_empty() => {
                if key == ESCAPED_NAMES {
                    escaped = true;
                }
                let value = fields.get(1).copied().unwrap_or_default();
                properties.push((key.to_string(), value.to_string()));
            }
            (0, "c") => {
                let names = read_names(path, line_no, &fields[1..], width, escaped)?;
                classes.push(ClassMapping::new(names));
            }
            (1, tag @ ("m" | "f")) => {
                let kind = if tag == "m" {
                    MemberKind::Method
                } else {
                    MemberKind::Field
                };
                let class = classes.last_mut().ok_or_else(|| ForgeError::TableParse {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("{} outside of a class", kind),
                })?;
                let descriptor = fields.get(1).copied().ok_or_else(|| ForgeError::TableParse {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("{} without descriptor", kind),
                })?;
                let names = read_names(path, line_no, &fields[2..], width, escaped)?;
                class.members.push(MemberMapping {
                    kind,
                    descriptor: descriptor.to_string(),
                    names,
                });
            }
            // comments, parameters, local variables
            (1, "c") | (2.., _) => {}
            (_, other) => {
                return Err(ForgeError::TableParse {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("unexpected entry '{}' at depth {}", other, depth),
                })
            }
        }
    }

    MappingTable::from_parts(namespaces, properties, classes).map_err(|reason| {
        ForgeError::TableParse {
            path: path.to_path_buf(),
            line: 0,
            reason,
        }
    })
}

fn parse_v1<'a>(
    path: &Path,
    namespaces: Vec<String>,
    lines: impl Iterator<Item = &'a str>,
) -> ForgeResult<MappingTable> {
    let width = namespaces.len();
    let mut classes: IndexMap<String, ClassMapping> = IndexMap::new();

    for (index, raw) in lines.enumerate() {
        let line_no = index + 2;
        let raw = raw.trim_end_matches('\r');
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = raw.split('\t').collect();

        match fields[0] {
            "CLASS" => {
                let names = read_names(path, line_no, &fields[1..], width, false)?;
                let key = names[0].clone();
                match classes.get_mut(&key) {
                    // a member line may have created a placeholder already
                    Some(existing) => existing.names = names,
                    None => {
                        classes.insert(key, ClassMapping::new(names));
                    }
                }
            }
            tag @ ("METHOD" | "FIELD") => {
                let kind = if tag == "METHOD" {
                    MemberKind::Method
                } else {
                    MemberKind::Field
                };
                if fields.len() < 3 {
                    return Err(ForgeError::TableParse {
                        path: path.to_path_buf(),
                        line: line_no,
                        reason: format!("{} needs an owner and a descriptor", tag),
                    });
                }
                let owner = fields[1];
                let names = read_names(path, line_no, &fields[3..], width, false)?;
                let class = classes.entry(owner.to_string()).or_insert_with(|| {
                    let mut placeholder = vec![String::new(); width];
                    placeholder[0] = owner.to_string();
                    ClassMapping::new(placeholder)
                });
                class.members.push(MemberMapping {
                    kind,
                    descriptor: fields[2].to_string(),
                    names,
                });
            }
            other => {
                return Err(ForgeError::TableParse {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: format!("unknown v1 entry '{}'", other),
                })
            }
        }
    }

    MappingTable::from_parts(namespaces, Vec::new(), classes.into_values().collect()).map_err(
        |reason| ForgeError::TableParse {
            path: path.to_path_buf(),
            line: 0,
            reason,
        },
    )
}

/// Collect one name per namespace; missing trailing names are treated as absent
fn read_names(
    path: &Path,
    line: usize,
    fields: &[&str],
    width: usize,
    escaped: bool,
) -> ForgeResult<Vec<String>> {
    if fields.len() > width {
        return Err(ForgeError::TableParse {
            path: path.to_path_buf(),
            line,
            reason: format!("{} names for {} namespaces", fields.len(), width),
        });
    }
    if fields.first().is_none_or(|n| n.is_empty()) {
        return Err(ForgeError::TableParse {
            path: path.to_path_buf(),
            line,
            reason: "missing name in the first namespace".to_string(),
        });
    }

    let mut names: Vec<String> = fields
        .iter()
        .map(|n| if escaped { unescape(n) } else { n.to_string() })
        .collect();
    names.resize(width, String::new());
    Ok(names)
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
