//! The small path language used by level and field descriptors.
//!
//! Supported: absolute (`/lift/entry`) and relative (`lexical-unit/form`)
//! location paths made of `.`, `..`, element names or `*`, each optionally
//! filtered by `[@attr]` / `[@attr='value']`, and a final `@attr` step.

use crate::error::{LiftError, Result};
use crate::tree::{NodeId, Tree};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Step {
    SelfNode,
    Parent,
    Child {
        name: Option<String>,
        predicates: Vec<Predicate>,
    },
    Attribute(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Predicate {
    HasAttribute(String),
    AttributeEquals(String, String),
}

/// One selected item: an element (or text) node, or an attribute value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Item<'t> {
    Node(NodeId),
    Attribute(&'t str),
}

impl Path {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(invalid(expr, "empty path"));
        }
        let (absolute, body) = match trimmed.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut steps = Vec::new();
        if !body.is_empty() {
            let raw_steps = split_steps(body).ok_or_else(|| invalid(expr, "unbalanced brackets"))?;
            for raw in raw_steps {
                if matches!(steps.last(), Some(Step::Attribute(_))) {
                    return Err(invalid(expr, "attribute step must come last"));
                }
                steps.push(parse_step(expr, raw)?);
            }
        }

        Ok(Self { absolute, steps })
    }

    /// Evaluate from `context` (ignored for absolute paths), in document order.
    pub fn select<'t>(&self, tree: &'t Tree, context: NodeId) -> Vec<Item<'t>> {
        let mut current = vec![if self.absolute { tree.root() } else { context }];
        for step in &self.steps {
            current = match step {
                Step::SelfNode => current,
                Step::Parent => {
                    let mut parents: Vec<NodeId> =
                        current.iter().filter_map(|n| tree.parent(*n)).collect();
                    parents.sort();
                    parents.dedup();
                    parents
                }
                Step::Child { name, predicates } => current
                    .iter()
                    .flat_map(|n| tree.element_children(*n))
                    .filter(|child| {
                        name.as_deref().is_none_or(|name| tree.name(*child) == Some(name))
                            && predicates.iter().all(|p| p.matches(tree, *child))
                    })
                    .collect(),
                Step::Attribute(attribute) => {
                    return current
                        .iter()
                        .filter_map(|n| tree.attribute(*n, attribute))
                        .map(Item::Attribute)
                        .collect();
                }
            };
            if current.is_empty() {
                break;
            }
        }
        current.into_iter().map(Item::Node).collect()
    }

    /// Selected nodes only (attribute results are skipped).
    pub fn select_nodes(&self, tree: &Tree, context: NodeId) -> Vec<NodeId> {
        self.select(tree, context)
            .into_iter()
            .filter_map(|item| match item {
                Item::Node(node) => Some(node),
                Item::Attribute(_) => None,
            })
            .collect()
    }

    /// String value of the first selected item, or `""` if nothing matches.
    pub fn string_value(&self, tree: &Tree, context: NodeId) -> String {
        match self.select(tree, context).first() {
            Some(Item::Node(node)) => tree.string_value(*node),
            Some(Item::Attribute(value)) => value.to_string(),
            None => String::new(),
        }
    }
}

impl Predicate {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        match self {
            Predicate::HasAttribute(name) => tree.attribute(node, name).is_some(),
            Predicate::AttributeEquals(name, value) => {
                tree.attribute(node, name) == Some(value.as_str())
            }
        }
    }
}

fn invalid(expr: &str, reason: &'static str) -> LiftError {
    LiftError::InvalidPath {
        expr: expr.to_string(),
        reason,
    }
}

/// Split on `/` outside of brackets and quotes.
fn split_steps(body: &str) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in body.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, '/') if depth == 0 => {
                out.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    out.push(&body[start..]);
    Some(out)
}

fn parse_step(expr: &str, raw: &str) -> Result<Step> {
    let raw = raw.trim();
    match raw {
        "" => return Err(invalid(expr, "empty step")),
        "." => return Ok(Step::SelfNode),
        ".." => return Ok(Step::Parent),
        _ => {}
    }
    if let Some(name) = raw.strip_prefix('@') {
        if !is_name(name) {
            return Err(invalid(expr, "invalid attribute name"));
        }
        return Ok(Step::Attribute(name.to_string()));
    }

    let (name, mut rest) = match raw.find('[') {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };
    let name = match name {
        "*" => None,
        n if is_name(n) => Some(n.to_string()),
        _ => return Err(invalid(expr, "invalid element name")),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = rest
            .find(']')
            .filter(|_| rest.starts_with('['))
            .ok_or_else(|| invalid(expr, "malformed predicate"))?;
        predicates.push(parse_predicate(expr, &rest[1..close])?);
        rest = &rest[close + 1..];
    }

    Ok(Step::Child { name, predicates })
}

fn parse_predicate(expr: &str, inner: &str) -> Result<Predicate> {
    let inner = inner
        .trim()
        .strip_prefix('@')
        .ok_or_else(|| invalid(expr, "predicates must test an attribute"))?;
    match inner.split_once('=') {
        None if is_name(inner.trim()) => Ok(Predicate::HasAttribute(inner.trim().to_string())),
        None => Err(invalid(expr, "invalid attribute name")),
        Some((name, value)) => {
            let name = name.trim();
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(|| invalid(expr, "predicate value must be quoted"))?;
            if !is_name(name) {
                return Err(invalid(expr, "invalid attribute name"));
            }
            Ok(Predicate::AttributeEquals(
                name.to_string(),
                unquoted.to_string(),
            ))
        }
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lift_types::{Level, fields};

    const DOC: &str = r#"<lift>
  <entry id="a">
    <trait name="morph-type" value="stem"/>
    <trait name="semantic-domain-ddp4" value="1.1 Sky"/>
    <sense id="a1"><gloss lang="en"><text>road</text></gloss></sense>
    <sense id="a2"><gloss lang="en"><text>path</text></gloss></sense>
  </entry>
  <entry id="b"/>
</lift>"#;

    fn strings(items: Vec<Item<'_>>, tree: &Tree) -> Vec<String> {
        items
            .into_iter()
            .map(|item| match item {
                Item::Node(n) => tree.string_value(n),
                Item::Attribute(v) => v.to_string(),
            })
            .collect()
    }

    #[test]
    fn every_descriptor_path_parses() {
        for level in Level::ALL {
            Path::parse(level.occurrences_path()).expect("occurrence path");
            if let Some(p) = level.parent_id_path() {
                Path::parse(p).expect("parent id path");
            }
        }
        for field in fields() {
            Path::parse(field.node_path).expect("node path");
            Path::parse(field.value_path).expect("value path");
        }
    }

    #[test]
    fn selects_absolute_and_relative_steps() {
        let tree = Tree::parse(DOC).unwrap();
        let entries = Path::parse("/lift/entry").unwrap().select_nodes(&tree, tree.root());
        assert_eq!(entries.len(), 2);
        let glosses = Path::parse("sense/gloss/text").unwrap();
        assert_eq!(
            strings(glosses.select(&tree, entries[0]), &tree),
            vec!["road", "path"]
        );
        assert!(glosses.select(&tree, entries[1]).is_empty());
    }

    #[test]
    fn filters_on_attribute_predicates() {
        let tree = Tree::parse(DOC).unwrap();
        let entry = Path::parse("/lift/entry").unwrap().select_nodes(&tree, tree.root())[0];
        let morph = Path::parse("trait[@name='morph-type']/@value").unwrap();
        assert_eq!(strings(morph.select(&tree, entry), &tree), vec!["stem"]);
        let any_trait = Path::parse("*[@value]").unwrap();
        assert_eq!(any_trait.select(&tree, entry).len(), 2);
    }

    #[test]
    fn walks_to_parent_identifier() {
        let tree = Tree::parse(DOC).unwrap();
        let senses = Path::parse("/lift/entry/sense").unwrap().select_nodes(&tree, tree.root());
        let parent_id = Path::parse("../@id").unwrap();
        assert_eq!(parent_id.string_value(&tree, senses[1]), "a");
        assert_eq!(Path::parse(".").unwrap().string_value(&tree, senses[0]), "road");
        assert_eq!(Path::parse("@missing").unwrap().string_value(&tree, senses[0]), "");
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "a//b", "@id/text", "trait[@name='x'", "trait[name='x']", "a[@b=c]"] {
            assert!(
                matches!(Path::parse(bad), Err(LiftError::InvalidPath { .. })),
                "{bad} should not parse"
            );
        }
    }
}
