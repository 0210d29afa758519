use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

/// One cell of a data row.
///
/// Closed union; every consumer matches exhaustively. Positional indices
/// are significant, so an empty cell is `Absent` rather than being dropped
/// or flattened to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// One or more individual code points, optionally carrying the
    /// angle-bracketed prefix of named-alias and decomposition rows
    /// (`<circle> 5F97`).
    Points {
        points: Vec<u32>,
        prefix: Option<String>,
    },
    /// An inclusive code point range (`0000..10FFFF`).
    Range { first: u32, last: u32 },
    /// Plain text value, trimmed.
    Text(String),
    /// An empty cell between delimiters.
    Absent,
}

impl Field {
    /// True for the `Points`/`Range` shapes a data row must lead with.
    pub fn is_code_points(&self) -> bool {
        matches!(self, Field::Points { .. } | Field::Range { .. })
    }
}

/// Description of one field ordinal, taken from a header comment such as
/// `# First field: Code point`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// First whitespace-separated token of the description; empty when the
    /// description is empty.
    pub word: String,
    pub description: String,
}

/// One logical record of a UCD file: either a data row, a `# Property:`
/// header, or a `# @missing:` directive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entry {
    pub fields: Vec<Field>,
    /// Set by `# Property:` and `# Derived Property:` lines.
    pub property: Option<String>,
    /// Segment marker (`@Part0`) in effect when this entry was read.
    pub segment: Option<String>,
    /// Trailing `#` comment of the source line, trimmed.
    pub comment: Option<String>,
    /// True for `# @missing:` directive entries.
    pub missing: bool,
    /// True when the entry came from a `# Derived Property:` line.
    pub derived: bool,
}

/// Fully parsed UCD file. Built once per parse call, never mutated after.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UcdFile {
    /// Timestamp of the `# Date:` header line, when present.
    pub date: Option<DateTime<Utc>>,
    /// Version seeded from a `<name>-<major>.<minor>.<patch>.txt` comment.
    pub version: Option<Version>,
    /// Sparse mapping from 0-based field ordinal to its definition. A
    /// definition line may be skipped, so gaps are legal.
    pub field_defs: BTreeMap<usize, FieldDef>,
    /// All entries, in source order.
    pub entries: Vec<Entry>,
}

impl UcdFile {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a UcdFile {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_shape_predicates() {
        assert!(Field::Points {
            points: vec![0x41],
            prefix: None
        }
        .is_code_points());
        assert!(Field::Range {
            first: 0,
            last: 0x10FFFF
        }
        .is_code_points());
        assert!(!Field::Text("Cc".into()).is_code_points());
        assert!(!Field::Absent.is_code_points());
    }

    #[test]
    fn file_iterates_entries_in_order() {
        let file = UcdFile {
            entries: vec![
                Entry {
                    property: Some("foo".into()),
                    ..Entry::default()
                },
                Entry {
                    property: Some("bar".into()),
                    ..Entry::default()
                },
            ],
            ..UcdFile::default()
        };
        let names: Vec<_> = (&file)
            .into_iter()
            .map(|e| e.property.as_deref().unwrap())
            .collect();
        assert_eq!(names, ["foo", "bar"]);
        assert_eq!(file.len(), 2);
    }
}
