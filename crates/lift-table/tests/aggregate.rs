use std::path::PathBuf;

use lift_db::{Lexicon, LiftError, fields_by_name};
use lift_table::{TableSet, build_aggregated_table, writer};
use lift_types::{ColumnKey, Level};

const TWO_ENTRIES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<lift version="0.13">
  <entry id="A">
    <lexical-unit><form lang="tww"><text>efe</text></form></lexical-unit>
    <sense id="A1"><gloss lang="en"><text>road</text></gloss></sense>
    <sense id="A2"><gloss lang="en"><text>path</text></gloss></sense>
  </entry>
  <entry id="B">
    <lexical-unit><form lang="tww"><text>hei</text></form></lexical-unit>
    <sense id="B1"><gloss lang="en"><text>bark</text></gloss></sense>
  </entry>
</lift>"#;

fn two_entries() -> Lexicon {
    Lexicon::parse(TWO_ENTRIES).expect("parse inline lexicon")
}

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("lift-db")
        .join("tests")
        .join("fixtures")
        .join("tiny.lift")
}

fn column<'t>(table: &'t lift_types::Table, field: &str, subfield: &str) -> Vec<&'t str> {
    table
        .column(&ColumnKey::new(field, subfield))
        .expect("column present")
        .iter()
        .map(String::as_str)
        .collect()
}

#[test]
fn aggregated_output_has_one_row_per_entry() {
    let lex = two_entries();
    let fields = fields_by_name(&["form", "gloss"]).unwrap();
    let table = TableSet::new(&lex, &fields)
        .unwrap()
        .aggregate(true, "~")
        .unwrap();
    assert_eq!(table.n_rows(), 2);
    assert_eq!(column(&table, "gloss", "en"), vec!["road~path", "bark"]);
    assert_eq!(column(&table, "ID", ""), vec!["A", "B"]);
    assert!(!table.contains(&ColumnKey::untagged("parent_id")));
}

#[test]
fn long_output_has_one_row_per_sense() {
    let lex = two_entries();
    let fields = fields_by_name(&["form", "gloss"]).unwrap();
    let table = TableSet::new(&lex, &fields)
        .unwrap()
        .aggregate(false, "~")
        .unwrap();
    assert_eq!(table.n_rows(), 3);
    assert_eq!(column(&table, "form", "tww"), vec!["efe", "efe", "hei"]);
    assert_eq!(column(&table, "gloss", "en"), vec!["road", "path", "bark"]);
}

#[test]
fn single_level_is_returned_unchanged() {
    let lex = two_entries();
    let fields = fields_by_name(&["gloss"]).unwrap();
    let set = TableSet::new(&lex, &fields).unwrap();
    let level_table = set.level_table(Level::Sense).unwrap().clone();
    assert_eq!(set.clone().aggregate(true, "~").unwrap(), level_table);
    assert_eq!(set.aggregate(false, "~").unwrap(), level_table);
}

#[test]
fn sense_and_variant_tables_conflict() {
    let lex = Lexicon::load(fixture()).unwrap();
    let fields = fields_by_name(&["gloss", "variantform"]).unwrap();
    let set = TableSet::new(&lex, &fields).unwrap();
    assert!(matches!(
        set.aggregate(true, ";"),
        Err(LiftError::ConflictingLevels)
    ));
}

#[test]
fn empty_request_is_rejected() {
    let lex = two_entries();
    assert!(matches!(
        TableSet::new(&lex, &[]),
        Err(LiftError::NoFields)
    ));
    assert!(matches!(
        build_aggregated_table(Vec::new(), true, ";"),
        Err(LiftError::NoFields)
    ));
}

#[test]
fn examples_are_bridged_to_entries_through_senses() {
    let lex = Lexicon::load(fixture()).unwrap();
    let fields = fields_by_name(&["form", "example"]).unwrap();
    let set = TableSet::new(&lex, &fields).unwrap();
    let levels: Vec<Level> = set.levels().collect();
    assert_eq!(levels, vec![Level::Example, Level::Sense, Level::Entry]);
    assert!(set.fields_for(Level::Sense).is_empty());
    assert!(
        set.level_table(Level::Sense)
            .unwrap()
            .contains(&Level::Sense.id_column())
    );

    let table = set.aggregate(false, ";").unwrap();
    assert_eq!(table.n_rows(), 1);
    assert_eq!(column(&table, "ID", ""), vec!["efe_1"]);
    assert_eq!(column(&table, "ID", "sense"), vec!["efe_1_s1"]);
    assert_eq!(column(&table, "example", "tww"), vec!["efe ne"]);
}

#[test]
fn aggregates_every_level_of_the_fixture() {
    let lex = Lexicon::load(fixture()).unwrap();
    let fields = fields_by_name(&["form", "morphtype", "category", "gloss", "translation"]).unwrap();
    let set = TableSet::new(&lex, &fields).unwrap();
    assert_eq!(set.subfields(fields[3]), vec!["en", "fr"]);

    let table = set.aggregate(true, ";").unwrap();
    assert_eq!(table.n_rows(), 1);
    assert_eq!(column(&table, "translation", "en"), vec!["this road"]);
    assert_eq!(column(&table, "category", ""), vec!["Noun"]);
}

#[test]
fn aggregated_table_writes_as_csv_and_cldf() {
    let lex = two_entries();
    let fields = fields_by_name(&["form", "gloss"]).unwrap();
    let table = TableSet::new(&lex, &fields)
        .unwrap()
        .aggregate(true, ";")
        .unwrap();

    writer::check_separator(";", b',').unwrap();
    let mut csv = Vec::new();
    writer::write_csv(&table, &mut csv, b',').unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert_eq!(csv.lines().next(), Some("form[tww],ID,gloss[en]"));

    let dir = tempfile::tempdir().unwrap();
    let forms = writer::write_cldf_wordlist(&table, &dir.path().join("cldf")).unwrap();
    assert_eq!(forms, 2);
    assert!(dir.path().join("cldf").join(writer::CLDF_METADATA_FILE).exists());
}
