use std::path::PathBuf;

use lift_types::Level;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LiftError>;

#[derive(Debug, Error)]
pub enum LiftError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },
    #[error("document has no <lift> root element")]
    NotALexicon,
    #[error("invalid path expression '{expr}': {reason}")]
    InvalidPath { expr: String, reason: &'static str },
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field '{field}' belongs to level {found}, not {expected}")]
    LevelMismatch {
        field: String,
        expected: Level,
        found: Level,
    },
    #[error(
        "{count} non single value(s) for unique field '{field}' at {level} occurrence(s) {indices:?}: {}",
        .values.join(" / ")
    )]
    MultipleValuesForUniqueField {
        field: String,
        level: Level,
        count: usize,
        indices: Vec<usize>,
        values: Vec<String>,
    },
    #[error("duplicate {attribute} '{tag}' for field '{field}' at {level} occurrence {index}")]
    DuplicateTagForUniqueField {
        field: String,
        level: Level,
        attribute: &'static str,
        tag: String,
        index: usize,
    },
    #[error("missing identifier for {level} occurrence {index} (or for its parent)")]
    MissingIdentifier { level: Level, index: usize },
    #[error("level {0} has no parent level")]
    NoParentLevel(Level),
    #[error(
        "unknown subfield '{subfield}' for field '{field}'. Available subfields are: {}",
        .available.join(",")
    )]
    UnknownSubfield {
        field: String,
        subfield: String,
        available: Vec<String>,
    },
    #[error("cannot combine sense and variant tables (an entry can have several of each)")]
    ConflictingLevels,
    #[error("'{separator}' cannot separate aggregated values: it is the field delimiter of the output")]
    InvalidSeparator { separator: String, delimiter: char },
    #[error("no field received")]
    NoFields,
    #[error("cannot join the {lower} table to the {higher} table: {higher} is not its parent level")]
    LevelGap { lower: Level, higher: Level },
    #[error("{level} table has no {column} column to join on")]
    MissingJoinColumn { level: Level, column: String },
}
