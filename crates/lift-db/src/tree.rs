//! Read-only element tree built from `quick-xml` events.
//!
//! Nodes live in a single arena in document order, so comparing two
//! [`NodeId`]s compares their document position.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{LiftError, Result};

/// Handle to a node of a [`Tree`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    /// Parse a whole document.
    ///
    /// Every text node is kept, blank ones included, so that spaces between
    /// inline elements survive. Names are stored without namespace prefixes.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut tree = Tree {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        };
        let mut open = vec![tree.root()];

        loop {
            let event = reader.read_event().map_err(|source| LiftError::Xml {
                position: reader.buffer_position() as u64,
                source,
            })?;
            let parent = open.last().copied().unwrap_or(tree.root());
            match event {
                Event::Start(start) => {
                    let id = tree
                        .push_element(&start, parent)
                        .map_err(|source| LiftError::Xml {
                            position: reader.buffer_position() as u64,
                            source,
                        })?;
                    open.push(id);
                }
                Event::Empty(start) => {
                    tree.push_element(&start, parent)
                        .map_err(|source| LiftError::Xml {
                            position: reader.buffer_position() as u64,
                            source,
                        })?;
                }
                Event::End(_) => {
                    open.pop();
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|source| LiftError::Xml {
                        position: reader.buffer_position() as u64,
                        source,
                    })?;
                    tree.push_text(&text, parent);
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    tree.push_text(&String::from_utf8_lossy(&raw), parent);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(tree)
    }

    /// The document node; its element children are the root elements.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Local name of an element, `None` for text and the document node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn attribute(&self, id: NodeId, attribute: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(name, _)| name == attribute)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    /// Every node below `id`, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    /// Text content of a node with all nested markup flattened.
    ///
    /// Inner whitespace is kept as written; the indentation surrounding the
    /// whole value is trimmed.
    pub fn string_value(&self, id: NodeId) -> String {
        let value: String = match &self.nodes[id.0].kind {
            NodeKind::Text(text) => text.clone(),
            _ => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| match &self.nodes[node.0].kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        };
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            value
        } else {
            trimmed.to_string()
        }
    }

    fn push_element(
        &mut self,
        start: &BytesStart<'_>,
        parent: NodeId,
    ) -> std::result::Result<NodeId, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(self.push(NodeKind::Element { name, attributes }, parent))
    }

    fn push_text(&mut self, text: &str, parent: NodeId) {
        if text.is_empty() {
            return;
        }
        self.push(NodeKind::Text(text.to_string()), parent);
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<lift version="0.13">
  <entry id="a">
    <lexical-unit>
      <form lang="tww"><text>ef<span lang="en">e</span> &amp; co</text></form>
    </lexical-unit>
    <trait name="morph-type" value="stem"/>
  </entry>
</lift>"#;

    #[test]
    fn builds_elements_in_document_order() {
        let tree = Tree::parse(DOC).expect("parse");
        let lift = tree.element_children(tree.root()).next().expect("root element");
        assert_eq!(tree.name(lift), Some("lift"));
        assert_eq!(tree.attribute(lift, "version"), Some("0.13"));
        let entry = tree.element_children(lift).next().expect("entry");
        assert_eq!(tree.attribute(entry, "id"), Some("a"));
        assert_eq!(tree.parent(entry), Some(lift));
        let children: Vec<_> = tree
            .element_children(entry)
            .filter_map(|c| tree.name(c))
            .collect();
        assert_eq!(children, vec!["lexical-unit", "trait"]);
        assert!(tree.descendants(entry).windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn flattens_mixed_content() {
        let tree = Tree::parse(DOC).expect("parse");
        let lift = tree.element_children(tree.root()).next().unwrap();
        let entry = tree.element_children(lift).next().unwrap();
        assert_eq!(tree.string_value(entry), "efe & co");
    }

    #[test]
    fn keeps_blank_text_between_inline_elements() {
        let tree = Tree::parse(
            "<text>\n  <span>big</span> <span>road</span>\n</text>",
        )
        .expect("parse");
        let text = tree.element_children(tree.root()).next().unwrap();
        assert_eq!(tree.string_value(text), "big road");
    }

    #[test]
    fn reports_malformed_documents() {
        let err = Tree::parse("<lift><entry></lift>").unwrap_err();
        assert!(matches!(err, LiftError::Xml { .. }));
    }
}
