use indexmap::IndexMap;

use lift_types::FieldSpec;

use crate::{LiftError, Lexicon, Result};

/// Value -> number of level occurrences holding it, in first-seen order.
pub type Counter = IndexMap<String, usize>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Frequencies {
    /// Counts of an untagged field, or of one requested subfield.
    Single(Counter),
    /// One counter per subfield (tag value) of a tagged field.
    BySubfield(IndexMap<String, Counter>),
}

impl Frequencies {
    /// The single counter, or the only subfield's counter.
    pub fn single(&self) -> Option<&Counter> {
        match self {
            Frequencies::Single(counter) => Some(counter),
            Frequencies::BySubfield(by) if by.len() == 1 => by.values().next(),
            Frequencies::BySubfield(_) => None,
        }
    }

    pub fn subfield(&self, subfield: &str) -> Option<&Counter> {
        match self {
            Frequencies::Single(_) => None,
            Frequencies::BySubfield(by) => by.get(subfield),
        }
    }
}

impl Lexicon {
    /// Count extracted values of `field`, globally or for one subfield.
    pub fn frequencies(&self, field: &FieldSpec, subfield: Option<&str>) -> Result<Frequencies> {
        let table = self.extract(field)?;

        if !field.field_type.is_tagged() {
            if let Some(subfield) = subfield.filter(|s| !s.is_empty()) {
                return Err(LiftError::UnknownSubfield {
                    field: field.name.to_string(),
                    subfield: subfield.to_string(),
                    available: Vec::new(),
                });
            }
            let counter = table
                .columns()
                .next()
                .map(|(_, values)| count(values))
                .unwrap_or_default();
            return Ok(Frequencies::Single(counter));
        }

        match subfield {
            Some(subfield) => {
                let column = table
                    .columns()
                    .find(|(key, _)| key.subfield == subfield)
                    .map(|(_, values)| count(values));
                column
                    .map(Frequencies::Single)
                    .ok_or_else(|| LiftError::UnknownSubfield {
                        field: field.name.to_string(),
                        subfield: subfield.to_string(),
                        available: table
                            .subfields(field.name)
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    })
            }
            None => Ok(Frequencies::BySubfield(
                table
                    .columns()
                    .map(|(key, values)| (key.subfield.clone(), count(values)))
                    .collect(),
            )),
        }
    }
}

fn count(values: &[String]) -> Counter {
    let mut counter = Counter::new();
    for value in values {
        *counter.entry(value.clone()).or_insert(0) += 1;
    }
    counter
}
