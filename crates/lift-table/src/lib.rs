//! Linked per-level tables and their cross-level aggregation.
//!
//! A [`TableSet`] builds one level table per level used by the requested
//! fields; [`TableSet::aggregate`] then folds them into a single table, in
//! long format (one row per lowest-level occurrence) or collapsed (one row
//! per entry). The [`writer`] module serializes the result.

use indexmap::IndexMap;
use tracing::info;

use lift_db::{Lexicon, LiftError, Result};
use lift_types::{FieldSpec, Level, Table};

mod aggregate;
pub mod writer;

pub use aggregate::{build_aggregated_table, group_by_parent, inner_join};

/// Default separator of aggregated cells.
pub const DEFAULT_AGGREGATE_SEP: &str = ";";

/// The level tables of one extraction request, lowest level first.
#[derive(Clone, Debug)]
pub struct TableSet {
    fields: IndexMap<Level, Vec<FieldSpec>>,
    tables: IndexMap<Level, Table>,
}

impl TableSet {
    pub fn new(lexicon: &Lexicon, fields: &[&FieldSpec]) -> Result<Self> {
        if fields.is_empty() {
            return Err(LiftError::NoFields);
        }

        let mut by_level: IndexMap<Level, Vec<FieldSpec>> = IndexMap::new();
        for level in Level::BOTTOM_UP {
            let level_fields: Vec<FieldSpec> = fields
                .iter()
                .filter(|f| f.level == level)
                .map(|f| **f)
                .collect();
            if !level_fields.is_empty() {
                by_level.insert(level, level_fields);
            }
        }

        // Examples only reach entries through their sense.
        if by_level.contains_key(&Level::Example)
            && by_level.contains_key(&Level::Entry)
            && !by_level.contains_key(&Level::Sense)
        {
            info!("adding identifier-only sense table to link examples to entries");
            let at = by_level.get_index_of(&Level::Example).map_or(0, |i| i + 1);
            by_level.shift_insert(at, Level::Sense, Vec::new());
        }

        let mut tables = IndexMap::new();
        for (level, level_fields) in &by_level {
            let refs: Vec<&FieldSpec> = level_fields.iter().collect();
            let mut table = lexicon.build_level_table(*level, &refs)?;
            if *level == Level::Sense && by_level.contains_key(&Level::Example) {
                table.insert_column(
                    Level::Sense.id_column(),
                    lexicon.identifiers(Level::Sense)?,
                );
            }
            tables.insert(*level, table);
        }

        Ok(Self {
            fields: by_level,
            tables,
        })
    }

    /// Levels with a table, lowest first.
    pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.tables.keys().copied()
    }

    pub fn level_table(&self, level: Level) -> Option<&Table> {
        self.tables.get(&level)
    }

    pub fn fields_for(&self, level: Level) -> &[FieldSpec] {
        self.fields
            .get(&level)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Observed tag values of a requested field.
    pub fn subfields(&self, field: &FieldSpec) -> Vec<&str> {
        self.level_table(field.level)
            .map(|table| {
                table
                    .subfields(field.name)
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn into_tables(self) -> Vec<(Level, Table)> {
        self.tables.into_iter().collect()
    }

    /// Fold every level table into one; see [`build_aggregated_table`].
    pub fn aggregate(self, aggregate: bool, inner_sep: &str) -> Result<Table> {
        build_aggregated_table(self.into_tables(), aggregate, inner_sep)
    }
}
