//! Shared types describing where information lives in a LIFT lexicon.
//!
//! A LIFT document nests `entry` elements that contain `sense` elements
//! (which in turn contain `example` elements) and `variant` elements. Each
//! of these positions is a [`Level`]. Named pieces of information attached
//! to a level are described by a [`FieldSpec`]; the [`FieldType`] of a field
//! decides how repeated or language/type-tagged occurrences collapse into
//! table columns.
//!
//! The vocabulary is a fixed, hand-authored table: use [`field`] to look a
//! descriptor up by name, or [`fields`] to walk all of them.
//!
//! ```rust
//! use lift_types::{FieldType, Level, field};
//!
//! let gloss = field("gloss").unwrap();
//! assert_eq!(gloss.level, Level::Sense);
//! assert_eq!(gloss.field_type, FieldType::MultipleWithMetaLang);
//! assert_eq!(Level::Example.parent(), Some(Level::Sense));
//! ```

use std::fmt;

mod table;

pub use table::{ColumnKey, Table};

/// Label of the identifier column of the entry level.
pub const ID_COLUMN: &str = "ID";
/// Label of the column holding the identifier of the parent occurrence.
pub const PARENT_ID_COLUMN: &str = "parent_id";
/// Subfield of tagged occurrences lacking their `lang` / `type` attribute.
pub const MISSING_TAG: &str = "-";

/// Position in the fixed `entry > sense > example` / `entry > variant` hierarchy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Level {
    Entry,
    Sense,
    Example,
    Variant,
}

impl Level {
    /// All levels, top to bottom.
    pub const ALL: [Level; 4] = [Level::Entry, Level::Sense, Level::Example, Level::Variant];

    /// Levels from the lowest to the root, the order in which tables are joined.
    pub const BOTTOM_UP: [Level; 4] = [Level::Example, Level::Sense, Level::Variant, Level::Entry];

    /// Parse a level name (`entry`, `sense`, `example`, `variant`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "entry" => Some(Level::Entry),
            "sense" => Some(Level::Sense),
            "example" => Some(Level::Example),
            "variant" => Some(Level::Variant),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Entry => "entry",
            Level::Sense => "sense",
            Level::Example => "example",
            Level::Variant => "variant",
        }
    }

    /// Plural used in summaries ("entries", "senses", ...).
    pub fn plural(self) -> &'static str {
        match self {
            Level::Entry => "entries",
            Level::Sense => "senses",
            Level::Example => "examples",
            Level::Variant => "variants",
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Entry => None,
            Level::Sense | Level::Variant => Some(Level::Entry),
            Level::Example => Some(Level::Sense),
        }
    }

    /// Distance from the root level.
    pub fn depth(self) -> usize {
        match self {
            Level::Entry => 0,
            Level::Sense | Level::Variant => 1,
            Level::Example => 2,
        }
    }

    /// Document-rooted path selecting every occurrence of the level.
    pub fn occurrences_path(self) -> &'static str {
        match self {
            Level::Entry => "/lift/entry",
            Level::Sense => "/lift/entry/sense",
            Level::Example => "/lift/entry/sense/example",
            Level::Variant => "/lift/entry/variant",
        }
    }

    /// Path from an occurrence to the identifier of its parent occurrence.
    pub fn parent_id_path(self) -> Option<&'static str> {
        match self {
            Level::Entry => None,
            Level::Sense | Level::Example | Level::Variant => Some("../@id"),
        }
    }

    /// Column under which a level's own identifiers are stored.
    ///
    /// The entry keeps the bare `ID` label; lower levels qualify it with
    /// their name so that joined tables never carry two `ID` columns.
    pub fn id_column(self) -> ColumnKey {
        match self {
            Level::Entry => ColumnKey::untagged(ID_COLUMN),
            other => ColumnKey::new(ID_COLUMN, other.name()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attribute distinguishing tagged occurrences of a field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TagAttribute {
    Lang,
    Type,
}

impl TagAttribute {
    pub fn name(self) -> &'static str {
        match self {
            TagAttribute::Lang => "lang",
            TagAttribute::Type => "type",
        }
    }
}

/// Which language set the tags of a language-tagged field are drawn from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LanguageSet {
    Object,
    Meta,
}

impl LanguageSet {
    pub fn name(self) -> &'static str {
        match self {
            LanguageSet::Object => "object",
            LanguageSet::Meta => "meta",
        }
    }
}

/// Repetition and tagging policy of a field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FieldType {
    /// At most one occurrence per level occurrence.
    Unique,
    /// Any number of occurrences, concatenated into one column.
    Multiple,
    /// One column per object language, one occurrence per language.
    UniqueByObjectLang,
    /// One column per meta language, one occurrence per language.
    UniqueByMetaLang,
    /// One column per `@type`, one occurrence per type.
    UniqueByType,
    /// One column per meta language; same-language occurrences are concatenated.
    MultipleWithMetaLang,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Unique => "UNIQUE",
            FieldType::Multiple => "MULTIPLE",
            FieldType::UniqueByObjectLang => "UNIQUE_BY_OBJECT_LANG",
            FieldType::UniqueByMetaLang => "UNIQUE_BY_META_LANG",
            FieldType::UniqueByType => "UNIQUE_BY_TYPE",
            FieldType::MultipleWithMetaLang => "MULTIPLE_WITH_META_LANG",
        }
    }

    /// Attribute carrying the tag, or `None` for untagged fields.
    pub fn tag_attribute(self) -> Option<TagAttribute> {
        match self {
            FieldType::Unique | FieldType::Multiple => None,
            FieldType::UniqueByType => Some(TagAttribute::Type),
            FieldType::UniqueByObjectLang
            | FieldType::UniqueByMetaLang
            | FieldType::MultipleWithMetaLang => Some(TagAttribute::Lang),
        }
    }

    pub fn is_tagged(self) -> bool {
        self.tag_attribute().is_some()
    }

    /// Whether two occurrences may share a tag within one level occurrence.
    pub fn allows_repeated_tag(self) -> bool {
        matches!(self, FieldType::MultipleWithMetaLang)
    }

    pub fn language_set(self) -> Option<LanguageSet> {
        match self {
            FieldType::UniqueByObjectLang => Some(LanguageSet::Object),
            FieldType::UniqueByMetaLang | FieldType::MultipleWithMetaLang => {
                Some(LanguageSet::Meta)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one named field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FieldSpec {
    pub name: &'static str,
    pub level: Level,
    /// Path from a level occurrence to the field's node(s).
    pub node_path: &'static str,
    /// Path from a field node to its textual value.
    pub value_path: &'static str,
    pub field_type: FieldType,
    /// Inline markup is expected inside the value (it is flattened).
    pub mixed_content: bool,
}

const fn spec(
    name: &'static str,
    level: Level,
    node_path: &'static str,
    value_path: &'static str,
    field_type: FieldType,
    mixed_content: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        level,
        node_path,
        value_path,
        field_type,
        mixed_content,
    }
}

static VOCABULARY: [FieldSpec; 17] = [
    spec("ID", Level::Entry, ".", "@id", FieldType::Unique, false),
    spec(
        "form",
        Level::Entry,
        "lexical-unit/form",
        "text",
        FieldType::UniqueByObjectLang,
        true,
    ),
    spec(
        "citation",
        Level::Entry,
        "citation/form",
        "text",
        FieldType::UniqueByObjectLang,
        true,
    ),
    spec(
        "pronunciation",
        Level::Entry,
        "pronunciation/form",
        "text",
        FieldType::UniqueByObjectLang,
        true,
    ),
    spec(
        "morphtype",
        Level::Entry,
        "trait[@name='morph-type']",
        "@value",
        FieldType::Unique,
        false,
    ),
    spec("note", Level::Entry, "note", "form/text", FieldType::UniqueByType, true),
    spec("field", Level::Entry, "field", "form/text", FieldType::UniqueByType, true),
    spec("relation", Level::Entry, "relation", "@ref", FieldType::Multiple, false),
    spec(
        "variantform",
        Level::Variant,
        "form",
        ".",
        FieldType::UniqueByObjectLang,
        true,
    ),
    spec("sense_ID", Level::Sense, ".", "@id", FieldType::Unique, false),
    spec(
        "category",
        Level::Sense,
        "grammatical-info",
        "@value",
        FieldType::Unique,
        false,
    ),
    spec(
        "gloss",
        Level::Sense,
        "gloss",
        "text",
        FieldType::MultipleWithMetaLang,
        true,
    ),
    spec(
        "definition",
        Level::Sense,
        "definition/form",
        ".",
        FieldType::UniqueByMetaLang,
        true,
    ),
    spec(
        "semanticdomain",
        Level::Sense,
        "trait[@name='semantic-domain-ddp4']",
        "@value",
        FieldType::Multiple,
        false,
    ),
    spec("sensenote", Level::Sense, "note", "form/text", FieldType::UniqueByType, true),
    spec(
        "example",
        Level::Example,
        "form",
        "text",
        FieldType::UniqueByObjectLang,
        true,
    ),
    spec(
        "translation",
        Level::Example,
        "translation/form",
        "text",
        FieldType::MultipleWithMetaLang,
        true,
    ),
];

/// The whole vocabulary, in declaration order.
pub fn fields() -> &'static [FieldSpec] {
    &VOCABULARY
}

/// Look a field descriptor up by its unique name.
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    VOCABULARY.iter().find(|f| f.name == name)
}

/// Descriptors attached to `level`.
pub fn fields_for_level(level: Level) -> impl Iterator<Item = &'static FieldSpec> {
    VOCABULARY.iter().filter(move |f| f.level == level)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn vocabulary_names_are_unique() {
        let names: HashSet<_> = fields().iter().map(|f| f.name).collect();
        assert_eq!(names.len(), fields().len());
    }

    #[test]
    fn looks_up_fields_by_name() {
        let form = field("form").expect("form is in the vocabulary");
        assert_eq!(form.level, Level::Entry);
        assert_eq!(form.field_type, FieldType::UniqueByObjectLang);
        assert!(field("no-such-field").is_none());
    }

    #[test]
    fn level_hierarchy() {
        assert_eq!(Level::Entry.parent(), None);
        assert_eq!(Level::Variant.parent(), Some(Level::Entry));
        assert_eq!(Level::Example.parent(), Some(Level::Sense));
        assert_eq!(Level::from_name("Sense"), Some(Level::Sense));
        assert_eq!(Level::from_name("lemma"), None);
        for level in Level::ALL {
            assert_eq!(level.parent_id_path().is_some(), level.parent().is_some());
        }
    }

    #[test]
    fn identifier_columns_do_not_collide() {
        let keys: HashSet<_> = Level::ALL.iter().map(|l| l.id_column()).collect();
        assert_eq!(keys.len(), Level::ALL.len());
        assert_eq!(Level::Entry.id_column(), ColumnKey::untagged("ID"));
    }

    #[test]
    fn tag_attributes_follow_field_type() {
        assert_eq!(FieldType::Unique.tag_attribute(), None);
        assert_eq!(FieldType::UniqueByType.tag_attribute(), Some(TagAttribute::Type));
        assert_eq!(
            FieldType::MultipleWithMetaLang.tag_attribute(),
            Some(TagAttribute::Lang)
        );
        assert!(FieldType::MultipleWithMetaLang.allows_repeated_tag());
        assert!(!FieldType::UniqueByMetaLang.allows_repeated_tag());
        assert_eq!(
            FieldType::UniqueByObjectLang.language_set(),
            Some(LanguageSet::Object)
        );
    }
}
