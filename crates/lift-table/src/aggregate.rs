use std::cmp::Reverse;
use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, info};

use lift_db::{LiftError, Result};
use lift_types::{ColumnKey, Level, PARENT_ID_COLUMN, Table};

/// Join level tables into one table, from the lowest level up.
///
/// A single table is returned unchanged. Otherwise every lower table is
/// inner-joined with the next higher one on `higher.ID == lower.parent_id`;
/// with `aggregate` set, the lower table is first collapsed to one row per
/// parent, its cells joined with `inner_sep`. Every table but the lowest
/// must belong to the parent level of the one below it.
pub fn build_aggregated_table(
    mut level_tables: Vec<(Level, Table)>,
    aggregate: bool,
    inner_sep: &str,
) -> Result<Table> {
    let has = |level: Level| level_tables.iter().any(|(l, _)| *l == level);
    if has(Level::Sense) && has(Level::Variant) {
        return Err(LiftError::ConflictingLevels);
    }
    if level_tables.is_empty() {
        return Err(LiftError::NoFields);
    }

    level_tables.sort_by_key(|(level, _)| Reverse(level.depth()));
    let mut levels = level_tables.into_iter();
    let Some((mut lower_level, mut acc)) = levels.next() else {
        return Err(LiftError::NoFields);
    };

    for (level, higher) in levels {
        if lower_level.parent() != Some(level) {
            return Err(LiftError::LevelGap {
                lower: lower_level,
                higher: level,
            });
        }
        if aggregate {
            acc = group_by_parent(&acc, lower_level, inner_sep)?;
            debug!("{lower_level} table grouped into {} rows", acc.n_rows());
        }
        info!("joining {lower_level} table with {level} table");
        acc = inner_join(&higher, level, &acc, lower_level)?;
        lower_level = level;
    }
    info!("aggregated table has {} rows", acc.n_rows());
    Ok(acc)
}

/// One row per distinct `parent_id`, in first-seen order; every other
/// column is joined with `inner_sep`.
pub fn group_by_parent(table: &Table, level: Level, inner_sep: &str) -> Result<Table> {
    let parent_key = ColumnKey::untagged(PARENT_ID_COLUMN);
    let parents = table
        .column(&parent_key)
        .ok_or_else(|| missing_column(level, &parent_key))?;

    let mut groups: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for (row, parent) in parents.iter().enumerate() {
        groups.entry(parent.as_str()).or_default().push(row);
    }

    let mut grouped = Table::with_rows(groups.len());
    for (key, values) in table.columns() {
        let column = if *key == parent_key {
            groups.keys().map(|parent| parent.to_string()).collect()
        } else {
            groups
                .values()
                .map(|rows| {
                    rows.iter()
                        .map(|row| values[*row].as_str())
                        .collect::<Vec<_>>()
                        .join(inner_sep)
                })
                .collect()
        };
        grouped.insert_column(key.clone(), column);
    }
    Ok(grouped)
}

/// Inner join on `higher.<id column> == lower.parent_id`.
///
/// Rows follow the higher table, each followed by its lower rows in order.
/// Columns of the higher table come first; the lower `parent_id` is dropped.
pub fn inner_join(
    higher: &Table,
    higher_level: Level,
    lower: &Table,
    lower_level: Level,
) -> Result<Table> {
    let id_key = higher_level.id_column();
    let parent_key = ColumnKey::untagged(PARENT_ID_COLUMN);
    let ids = higher
        .column(&id_key)
        .ok_or_else(|| missing_column(higher_level, &id_key))?;
    let parents = lower
        .column(&parent_key)
        .ok_or_else(|| missing_column(lower_level, &parent_key))?;

    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, parent) in parents.iter().enumerate() {
        children.entry(parent.as_str()).or_default().push(row);
    }
    let pairs: Vec<(usize, usize)> = ids
        .iter()
        .enumerate()
        .flat_map(|(h, id)| {
            children
                .get(id.as_str())
                .into_iter()
                .flatten()
                .map(move |l| (h, *l))
        })
        .collect();

    let mut joined = Table::with_rows(pairs.len());
    for (key, values) in higher.columns() {
        joined.insert_column(
            key.clone(),
            pairs.iter().map(|(h, _)| values[*h].clone()).collect(),
        );
    }
    for (key, values) in lower.columns().filter(|(key, _)| **key != parent_key) {
        joined.insert_column(
            key.clone(),
            pairs.iter().map(|(_, l)| values[*l].clone()).collect(),
        );
    }
    Ok(joined)
}

fn missing_column(level: Level, key: &ColumnKey) -> LiftError {
    LiftError::MissingJoinColumn {
        level,
        column: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[(&str, &str, &[&str])]) -> Table {
        let rows = columns.first().map_or(0, |(_, _, v)| v.len());
        let mut t = Table::with_rows(rows);
        for (field, sub, values) in columns {
            t.insert_column(
                ColumnKey::new(*field, *sub),
                values.iter().map(|v| v.to_string()).collect(),
            );
        }
        t
    }

    #[test]
    fn groups_rows_by_parent_in_first_seen_order() {
        let senses = table(&[
            ("gloss", "en", &["road", "bark", "path"]),
            ("parent_id", "", &["A", "B", "A"]),
        ]);
        let grouped = group_by_parent(&senses, Level::Sense, "~").unwrap();
        assert_eq!(grouped.n_rows(), 2);
        assert_eq!(grouped.row(0), vec!["road~path", "A"]);
        assert_eq!(grouped.row(1), vec!["bark", "B"]);
    }

    #[test]
    fn inner_join_drops_unmatched_rows() {
        let entries = table(&[("form", "tww", &["a", "b", "c"]), ("ID", "", &["A", "B", "C"])]);
        let senses = table(&[
            ("gloss", "en", &["x", "y", "z"]),
            ("parent_id", "", &["A", "Z", "A"]),
        ]);
        let joined = inner_join(&entries, Level::Entry, &senses, Level::Sense).unwrap();
        let labels: Vec<String> = joined.keys().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["form[tww]", "ID", "gloss[en]"]);
        assert_eq!(joined.n_rows(), 2);
        assert_eq!(joined.row(0), vec!["a", "A", "x"]);
        assert_eq!(joined.row(1), vec!["a", "A", "z"]);
    }

    #[test]
    fn join_needs_the_higher_identifier() {
        let senses = table(&[("parent_id", "", &["A"])]);
        let examples = table(&[("parent_id", "", &["s1"])]);
        assert!(matches!(
            inner_join(&senses, Level::Sense, &examples, Level::Example),
            Err(LiftError::MissingJoinColumn {
                level: Level::Sense,
                ..
            })
        ));
    }

    #[test]
    fn refuses_to_skip_a_level() {
        let entries = table(&[("form", "tww", &["a"]), ("ID", "", &["A"])]);
        let examples = table(&[("example", "tww", &["ex"]), ("parent_id", "", &["s1"])]);
        for aggregate in [false, true] {
            let tables = vec![
                (Level::Entry, entries.clone()),
                (Level::Example, examples.clone()),
            ];
            assert!(matches!(
                build_aggregated_table(tables, aggregate, ";"),
                Err(LiftError::LevelGap {
                    lower: Level::Example,
                    higher: Level::Entry
                })
            ));
        }
    }

    #[test]
    fn folds_three_levels_bottom_up() {
        let entries = table(&[("ID", "", &["A", "B"])]);
        let senses = table(&[
            ("gloss", "en", &["road", "bark"]),
            ("parent_id", "", &["A", "B"]),
            ("ID", "sense", &["s1", "s2"]),
        ]);
        let examples = table(&[
            ("example", "tww", &["ex1", "ex2"]),
            ("parent_id", "", &["s1", "s1"]),
        ]);
        let tables = vec![
            (Level::Entry, entries),
            (Level::Sense, senses),
            (Level::Example, examples),
        ];

        let long = build_aggregated_table(tables.clone(), false, ";").unwrap();
        assert_eq!(long.n_rows(), 2);
        assert_eq!(long.row(1), vec!["A", "road", "s1", "ex2"]);

        let wide = build_aggregated_table(tables, true, ";").unwrap();
        assert_eq!(wide.n_rows(), 1);
        assert_eq!(wide.row(0), vec!["A", "road", "s1", "ex1;ex2"]);
    }
}
