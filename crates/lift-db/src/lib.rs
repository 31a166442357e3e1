//! Load LIFT lexicons and extract typed fields into row-aligned tables.
//!
//! A [`Lexicon`] parses the document once and keeps it read-only. Fields
//! described by [`lift_types::FieldSpec`] are extracted into a
//! [`lift_types::Table`] with exactly one row per occurrence of the field's
//! level, so tables extracted from the same level can be joined on the row
//! index. Tagged fields (by `@lang` or `@type`) pivot into one column per
//! distinct tag seen anywhere in the document.
//!
//! Source files are read either through a memory map or into an owned
//! buffer, chosen at runtime via [`LoadMode`].
//!
//! # Example
//! ```no_run
//! use lift_db::{LoadMode, Lexicon, field_by_name};
//! use lift_types::Level;
//!
//! # fn main() -> lift_db::Result<()> {
//! let lexicon = Lexicon::load_with_mode("/path/to/dictionary.lift", LoadMode::Owned)?
//!     .with_inner_sep(" ~ ");
//! println!("{} entries", lexicon.level_occurrence_count(Level::Entry));
//!
//! let glosses = lexicon.extract(field_by_name("gloss")?)?;
//! for (key, values) in glosses.columns() {
//!     println!("{key}: {:?}", values);
//! }
//! # Ok(()) }
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path as FsPath;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use memmap2::Mmap;
use tracing::{debug, info};

use lift_types::{ColumnKey, FieldSpec, FieldType, Level, MISSING_TAG, PARENT_ID_COLUMN, Table};

mod error;
mod frequency;
pub mod path;
pub mod tree;

pub use error::{LiftError, Result};
pub use frequency::{Counter, Frequencies};
use path::Path;
use tree::{NodeId, Tree};

/// Separator used for `MULTIPLE` and `MULTIPLE_WITH_META_LANG` fields unless
/// overridden with [`Lexicon::with_inner_sep`].
pub const DEFAULT_INNER_SEP: &str = "/";

/// Strategy for loading the document file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map the file while it is parsed.
    Mmap,
    /// Read the file into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// A parsed LIFT document plus its lazily filled per-level caches.
pub struct Lexicon {
    tree: Tree,
    inner_sep: String,
    occurrences: DashMap<Level, Arc<[NodeId]>>,
    object_languages: BTreeSet<String>,
    meta_languages: BTreeSet<String>,
}

impl Lexicon {
    /// Load a LIFT file, memory-mapping it while parsing.
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    pub fn load_with_mode(path: impl AsRef<FsPath>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let buffer = load_file(path, mode)?;
        let text = std::str::from_utf8(buffer.as_slice())?;
        let lexicon = Self::parse(text)?;
        info!(
            "loaded {} ({} entries)",
            path.display(),
            lexicon.level_occurrence_count(Level::Entry)
        );
        Ok(lexicon)
    }

    /// Parse a document held in memory.
    pub fn parse(xml: &str) -> Result<Self> {
        let tree = Tree::parse(xml)?;
        let lift = tree
            .element_children(tree.root())
            .find(|node| tree.name(*node) == Some("lift"))
            .ok_or(LiftError::NotALexicon)?;

        let mut object_languages = BTreeSet::new();
        let mut meta_languages = BTreeSet::new();
        for entry in tree
            .element_children(lift)
            .filter(|node| tree.name(*node) == Some("entry"))
        {
            for node in tree.descendants(entry) {
                let Some(lang) = tree.attribute(node, "lang") else {
                    continue;
                };
                if tree.name(node) == Some("form") {
                    object_languages.insert(lang.to_string());
                } else {
                    meta_languages.insert(lang.to_string());
                }
            }
        }

        Ok(Self {
            tree,
            inner_sep: DEFAULT_INNER_SEP.to_string(),
            occurrences: DashMap::new(),
            object_languages,
            meta_languages,
        })
    }

    /// Separator joining the values of repeatable fields.
    pub fn with_inner_sep(mut self, inner_sep: impl Into<String>) -> Self {
        self.inner_sep = inner_sep.into();
        self
    }

    /// Occurrences of `level` in document order, computed once per level.
    pub fn occurrences(&self, level: Level) -> Arc<[NodeId]> {
        let nodes = self.occurrences.entry(level).or_insert_with(|| {
            let path = Path::parse(level.occurrences_path())
                .expect("level occurrence paths are well-formed");
            let nodes = path.select_nodes(&self.tree, self.tree.root());
            debug!(level = %level, count = nodes.len(), "cached level occurrences");
            nodes.into()
        });
        Arc::clone(nodes.value())
    }

    pub fn level_occurrence_count(&self, level: Level) -> usize {
        self.occurrences(level).len()
    }

    /// Language codes of `form` elements (the described languages).
    pub fn object_languages(&self) -> &BTreeSet<String> {
        &self.object_languages
    }

    /// Language codes of every other element (the describing languages).
    pub fn meta_languages(&self) -> &BTreeSet<String> {
        &self.meta_languages
    }

    /// The `@id` of every occurrence of `level`.
    pub fn identifiers(&self, level: Level) -> Result<Vec<String>> {
        self.occurrences(level)
            .iter()
            .enumerate()
            .map(|(index, node)| match self.tree.attribute(*node, "id") {
                Some(id) if !id.is_empty() => Ok(id.to_string()),
                _ => Err(LiftError::MissingIdentifier { level, index }),
            })
            .collect()
    }

    /// The identifier of the parent occurrence of every occurrence of `level`.
    pub fn parent_identifiers(&self, level: Level) -> Result<Vec<String>> {
        let expr = level
            .parent_id_path()
            .ok_or(LiftError::NoParentLevel(level))?;
        let path = Path::parse(expr)?;
        self.occurrences(level)
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let id = path.string_value(&self.tree, *node);
                if id.is_empty() {
                    Err(LiftError::MissingIdentifier { level, index })
                } else {
                    Ok(id)
                }
            })
            .collect()
    }

    /// Extract one field into a table with one row per occurrence of its level.
    pub fn extract(&self, field: &FieldSpec) -> Result<Table> {
        let occurrences = self.occurrences(field.level);
        let node_path = Path::parse(field.node_path)?;
        let value_path = Path::parse(field.value_path)?;
        let nodes_by_occurrence: Vec<Vec<NodeId>> = occurrences
            .iter()
            .map(|occurrence| node_path.select_nodes(&self.tree, *occurrence))
            .collect();
        let value = |node: &NodeId| value_path.string_value(&self.tree, *node);

        let mut table = Table::with_rows(occurrences.len());
        match field.field_type {
            FieldType::Unique => {
                let offenders: Vec<usize> = nodes_by_occurrence
                    .iter()
                    .enumerate()
                    .filter(|(_, nodes)| nodes.len() > 1)
                    .map(|(index, _)| index)
                    .collect();
                if let Some(&first) = offenders.first() {
                    return Err(LiftError::MultipleValuesForUniqueField {
                        field: field.name.to_string(),
                        level: field.level,
                        count: offenders.len(),
                        values: nodes_by_occurrence[first].iter().map(value).collect(),
                        indices: offenders,
                    });
                }
                let values = nodes_by_occurrence
                    .iter()
                    .map(|nodes| nodes.first().map(value).unwrap_or_default())
                    .collect();
                table.insert_column(ColumnKey::untagged(field.name), values);
            }
            FieldType::Multiple => {
                let values = nodes_by_occurrence
                    .iter()
                    .map(|nodes| {
                        nodes
                            .iter()
                            .map(value)
                            .collect::<Vec<_>>()
                            .join(self.inner_sep.as_str())
                    })
                    .collect();
                table.insert_column(ColumnKey::untagged(field.name), values);
            }
            FieldType::UniqueByObjectLang
            | FieldType::UniqueByMetaLang
            | FieldType::UniqueByType
            | FieldType::MultipleWithMetaLang => {
                self.pivot(field, &nodes_by_occurrence, &value_path, &mut table)?;
            }
        }
        Ok(table)
    }

    /// Pivot tagged occurrences into one column per distinct tag.
    ///
    /// A node without its tag attribute is filed under [`MISSING_TAG`].
    /// Cells are gathered in a sparse row -> tag -> values map over the
    /// full row range, so rows without any field node stay in place.
    fn pivot(
        &self,
        field: &FieldSpec,
        nodes_by_occurrence: &[Vec<NodeId>],
        value_path: &Path,
        table: &mut Table,
    ) -> Result<()> {
        let Some(attribute) = field.field_type.tag_attribute().map(|a| a.name()) else {
            return Ok(());
        };
        let mut tags: IndexSet<String> = IndexSet::new();
        let mut cells: Vec<IndexMap<String, Vec<String>>> =
            vec![IndexMap::new(); nodes_by_occurrence.len()];

        for (index, nodes) in nodes_by_occurrence.iter().enumerate() {
            for node in nodes {
                let tag = self
                    .tree
                    .attribute(*node, attribute)
                    .filter(|tag| !tag.is_empty())
                    .unwrap_or(MISSING_TAG);
                let values = cells[index].entry(tag.to_string()).or_default();
                if !values.is_empty() && !field.field_type.allows_repeated_tag() {
                    return Err(LiftError::DuplicateTagForUniqueField {
                        field: field.name.to_string(),
                        level: field.level,
                        attribute,
                        tag: tag.to_string(),
                        index,
                    });
                }
                values.push(value_path.string_value(&self.tree, *node));
                tags.insert(tag.to_string());
            }
        }

        for tag in tags {
            let column = cells
                .iter()
                .map(|row| {
                    row.get(&tag)
                        .map(|values| values.join(self.inner_sep.as_str()))
                        .unwrap_or_default()
                })
                .collect();
            table.insert_column(ColumnKey::new(field.name, tag), column);
        }
        Ok(())
    }

    /// Observed subfields (tag values) of a field, in first-seen order.
    pub fn subfields(&self, field: &FieldSpec) -> Result<Vec<String>> {
        if !field.field_type.is_tagged() {
            return Ok(Vec::new());
        }
        let table = self.extract(field)?;
        Ok(table
            .subfields(field.name)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Build the table of one level: every field column-joined on the row
    /// index, then the identifier column (`ID` for entries, `parent_id`
    /// otherwise).
    pub fn build_level_table(&self, level: Level, fields: &[&FieldSpec]) -> Result<Table> {
        if let Some(field) = fields.iter().find(|f| f.level != level) {
            return Err(LiftError::LevelMismatch {
                field: field.name.to_string(),
                expected: level,
                found: field.level,
            });
        }

        info!("creating table for level '{level}'");
        let mut table = Table::with_rows(self.level_occurrence_count(level));
        for field in fields {
            let extracted = self.extract(field)?;
            debug!(
                "field '{}' added with {} values",
                field.name,
                extracted.n_rows()
            );
            table.join_columns(extracted);
        }

        match level {
            Level::Entry => table.insert_column(level.id_column(), self.identifiers(level)?),
            _ => table.insert_column(
                ColumnKey::untagged(PARENT_ID_COLUMN),
                self.parent_identifiers(level)?,
            ),
        }
        Ok(table)
    }
}

/// Look a vocabulary field up by name.
pub fn field_by_name(name: &str) -> Result<&'static FieldSpec> {
    lift_types::field(name).ok_or_else(|| LiftError::UnknownField(name.to_string()))
}

/// Look several fields up, reporting the first unknown name.
pub fn fields_by_name<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static FieldSpec>> {
    names.iter().map(|n| field_by_name(n.as_ref().trim())).collect()
}

fn load_file(path: &FsPath, mode: LoadMode) -> Result<Buffer> {
    let read_error = |source: std::io::Error| LiftError::Read {
        path: path.to_path_buf(),
        source,
    };
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).map_err(read_error)?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .map_err(read_error)
        }
        LoadMode::Owned => {
            let mut file = File::open(path).map_err(read_error)?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(read_error)?;
            Ok(Buffer::Owned(buf))
        }
    }
}
