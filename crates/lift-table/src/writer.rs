//! Serialized forms of a table: delimited text and CLDF Wordlists.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde_json::{Value, json};
use tracing::info;

use lift_db::{LiftError, Result};
use lift_types::{ColumnKey, Table};

pub const CLDF_FORMS_FILE: &str = "forms.csv";
pub const CLDF_METADATA_FILE: &str = "Wordlist-metadata.json";

const CLDF_TERMS: &str = "http://cldf.clld.org/v1.0/terms.rdf";
const CLDF_COLUMNS: [(&str, &str); 4] = [
    ("ID", "id"),
    ("Language_ID", "languageReference"),
    ("Parameter_ID", "parameterReference"),
    ("Form", "form"),
];

/// Reject an aggregation separator that would collide with the delimiter.
pub fn check_separator(inner_sep: &str, delimiter: u8) -> Result<()> {
    if inner_sep.as_bytes() == [delimiter] {
        return Err(LiftError::InvalidSeparator {
            separator: inner_sep.to_string(),
            delimiter: char::from(delimiter),
        });
    }
    Ok(())
}

/// Write `table` with a `field` / `field[subfield]` header row.
pub fn write_csv<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    out.write_record(table.keys().map(ToString::to_string))
        .map_err(io::Error::from)?;
    for row in table.rows() {
        out.write_record(&row).map_err(io::Error::from)?;
    }
    out.flush()?;
    Ok(())
}

/// Write a CLDF Wordlist (`forms.csv` plus its metadata) into `dir`.
///
/// Every non-empty `form[lang]` cell becomes one form row; the first
/// non-empty `gloss` cell of the row is its parameter. Other columns are
/// carried along under their flattened `fieldsubfield` name. Returns the
/// number of forms written.
pub fn write_cldf_wordlist(table: &Table, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;

    let form_keys: Vec<&ColumnKey> = table.keys().filter(|k| k.field == "form").collect();
    let gloss_keys: Vec<&ColumnKey> = table.keys().filter(|k| k.field == "gloss").collect();
    let extra_keys: Vec<&ColumnKey> = table
        .keys()
        .filter(|k| k.field != "form" && k.field != "gloss")
        .collect();
    let extra_names: Vec<String> = extra_keys.iter().map(|k| flattened_name(k)).collect();

    let mut out = csv::Writer::from_writer(BufWriter::new(File::create(
        dir.join(CLDF_FORMS_FILE),
    )?));
    let header = CLDF_COLUMNS
        .iter()
        .map(|(name, _)| name.to_string())
        .chain(extra_names.iter().cloned());
    out.write_record(header).map_err(io::Error::from)?;

    let mut written = 0;
    for row in 0..table.n_rows() {
        let parameter = gloss_keys
            .iter()
            .filter_map(|k| table.cell(row, k))
            .find(|v| !v.is_empty())
            .unwrap_or_default();
        for key in &form_keys {
            let form = table.cell(row, key).unwrap_or_default();
            if form.is_empty() {
                continue;
            }
            written += 1;
            let id = written.to_string();
            let mut record = vec![id.as_str(), key.subfield.as_str(), parameter, form];
            record.extend(extra_keys.iter().map(|k| table.cell(row, k).unwrap_or_default()));
            out.write_record(&record).map_err(io::Error::from)?;
        }
    }
    out.flush()?;

    let metadata = wordlist_metadata(&extra_names);
    let file = BufWriter::new(File::create(dir.join(CLDF_METADATA_FILE))?);
    serde_json::to_writer_pretty(file, &metadata).map_err(io::Error::from)?;

    info!("wrote {written} forms to {}", dir.display());
    Ok(written)
}

/// `fieldsubfield`, prefixed when it would shadow a CLDF column.
fn flattened_name(key: &ColumnKey) -> String {
    let name = format!("{}{}", key.field, key.subfield);
    if CLDF_COLUMNS.iter().any(|(cldf, _)| *cldf == name) {
        format!("lift_{name}")
    } else {
        name
    }
}

fn wordlist_metadata(extra_names: &[String]) -> Value {
    let mut columns: Vec<Value> = CLDF_COLUMNS
        .iter()
        .map(|(name, term)| {
            json!({
                "name": name,
                "required": *name != "Parameter_ID",
                "propertyUrl": format!("{CLDF_TERMS}#{term}"),
                "datatype": "string",
            })
        })
        .collect();
    columns.extend(
        extra_names
            .iter()
            .map(|name| json!({ "name": name, "datatype": "string" })),
    );

    json!({
        "@context": "http://www.w3.org/ns/csvw",
        "dc:conformsTo": format!("{CLDF_TERMS}#Wordlist"),
        "dialect": { "commentPrefix": null },
        "tables": [{
            "url": CLDF_FORMS_FILE,
            "dc:conformsTo": format!("{CLDF_TERMS}#FormTable"),
            "tableSchema": {
                "columns": columns,
                "primaryKey": ["ID"],
            },
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::with_rows(2);
        for (field, sub, values) in [
            ("form", "tww", ["efe", ""]),
            ("form", "ntu", ["efu", ""]),
            ("gloss", "en", ["road", "bark"]),
            ("ID", "", ["efe_1", "hei_2"]),
        ] {
            table.insert_column(
                ColumnKey::new(field, sub),
                values.iter().map(|v| v.to_string()).collect(),
            );
        }
        table
    }

    #[test]
    fn separator_must_differ_from_delimiter() {
        assert!(check_separator(";", b',').is_ok());
        assert!(check_separator(",,", b',').is_ok());
        assert!(matches!(
            check_separator(",", b','),
            Err(LiftError::InvalidSeparator { delimiter: ',', .. })
        ));
    }

    #[test]
    fn csv_header_uses_column_labels() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf, b'\t').unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("form[tww]\tform[ntu]\tgloss[en]\tID"));
        assert_eq!(lines.next(), Some("efe\tefu\troad\tefe_1"));
        assert_eq!(lines.next(), Some("\t\tbark\thei_2"));
    }

    #[test]
    fn cldf_wordlist_has_one_row_per_form() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_cldf_wordlist(&sample(), dir.path()).unwrap();
        assert_eq!(written, 2);

        let forms = fs::read_to_string(dir.path().join(CLDF_FORMS_FILE)).unwrap();
        let lines: Vec<&str> = forms.lines().collect();
        assert_eq!(lines[0], "ID,Language_ID,Parameter_ID,Form,lift_ID");
        assert_eq!(lines[1], "1,tww,road,efe,efe_1");
        assert_eq!(lines[2], "2,ntu,road,efu,efe_1");
        assert_eq!(lines.len(), 3);

        let metadata: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(CLDF_METADATA_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(metadata["tables"][0]["url"], CLDF_FORMS_FILE);
        assert_eq!(
            metadata["tables"][0]["tableSchema"]["columns"][4]["name"],
            "lift_ID"
        );
    }
}
