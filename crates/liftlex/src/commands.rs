use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use lift_db::{Counter, Frequencies, Lexicon, field_by_name, fields_by_name};
use lift_table::{TableSet, writer};
use lift_types::{Level, Table};

const DELIMITER: u8 = b',';

#[derive(Serialize)]
struct CountRow<'a> {
    value: &'a str,
    count: usize,
}

#[derive(Serialize)]
struct FieldRow {
    name: &'static str,
    level: &'static str,
    #[serde(rename = "type")]
    field_type: &'static str,
    node_path: &'static str,
    value_path: &'static str,
    languages: &'static str,
}

pub fn summary(lexicon: &Lexicon, mut out: Box<dyn Write>) -> Result<()> {
    for level in Level::ALL {
        writeln!(out, "{}: {}", level.plural(), lexicon.level_occurrence_count(level))?;
    }
    let join = |langs: &std::collections::BTreeSet<String>| {
        langs.iter().map(String::as_str).collect::<Vec<_>>().join(",")
    };
    writeln!(out, "object languages: {}", join(lexicon.object_languages()))?;
    writeln!(out, "meta languages: {}", join(lexicon.meta_languages()))?;
    out.flush()?;
    Ok(())
}

pub fn values(lexicon: &Lexicon, field: &str, out: Box<dyn Write>) -> Result<()> {
    let table = lexicon.extract(field_by_name(field)?)?;
    write_table(&table, out)
}

pub fn subfields(lexicon: &Lexicon, field: &str, mut out: Box<dyn Write>) -> Result<()> {
    let field = field_by_name(field)?;
    if !field.field_type.is_tagged() {
        info!("field '{}' has no subfield", field.name);
    }
    for subfield in lexicon.subfields(field)? {
        writeln!(out, "{subfield}")?;
    }
    out.flush()?;
    Ok(())
}

/// Counts sorted by decreasing frequency, ties in first-seen order.
pub fn count(
    lexicon: &Lexicon,
    field: &str,
    subfield: Option<&str>,
    out: Box<dyn Write>,
) -> Result<()> {
    let field = field_by_name(field)?;
    let freqs = lexicon.frequencies(field, subfield)?;
    let counter: &Counter = match &freqs {
        Frequencies::Single(counter) => counter,
        Frequencies::BySubfield(by) => match freqs.single() {
            Some(counter) => counter,
            None if by.is_empty() => bail!("field '{}' has no value in this lexicon", field.name),
            None => bail!(
                "field '{}' has several subfields ({}); choose one with --subfield",
                field.name,
                by.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            ),
        },
    };

    let mut rows: Vec<CountRow<'_>> = counter
        .iter()
        .map(|(value, count)| CountRow {
            value,
            count: *count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Build the cross-level table of the requested fields.
pub fn convert(lexicon: &Lexicon, fields: &[String], aggregate: bool, sep: &str) -> Result<Table> {
    writer::check_separator(sep, DELIMITER)?;
    let fields = fields_by_name(fields)?;
    let table = TableSet::new(lexicon, &fields)?.aggregate(aggregate, sep)?;
    Ok(table)
}

pub fn write_table(table: &Table, out: Box<dyn Write>) -> Result<()> {
    writer::write_csv(table, out, DELIMITER)?;
    Ok(())
}

pub fn write_cldf(table: &Table, dir: &Path, mut out: Box<dyn Write>) -> Result<()> {
    let forms = writer::write_cldf_wordlist(table, dir)
        .with_context(|| format!("cannot write CLDF dataset to {}", dir.display()))?;
    writeln!(out, "{forms} forms written to {}", dir.display())?;
    out.flush()?;
    Ok(())
}

pub fn fields(out: Box<dyn Write>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for field in lift_types::fields() {
        writer.serialize(FieldRow {
            name: field.name,
            level: field.level.name(),
            field_type: field.field_type.name(),
            node_path: field.node_path,
            value_path: field.value_path,
            languages: field.field_type.language_set().map_or("", |set| set.name()),
        })?;
    }
    writer.flush()?;
    Ok(())
}
