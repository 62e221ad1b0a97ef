//! YAML node tree
//!
//! Built from `yaml-rust` parser events instead of deserializing into
//! `serde_yaml::Value`, so that repeated mapping keys survive (the validator
//! reports them) and scalars keep the text they were written with. Scalar
//! typing happens on access: `007` is a valid name, a valid id and a valid
//! number, depending on where it appears.

use std::collections::HashMap;
use yaml_rust::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust::scanner::{Marker, TScalarStyle};

/// A parsed YAML node
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Scalar { text: String, plain: bool },
    Sequence(Vec<Node>),
    /// Entries in document order, repeated keys included.
    Mapping(Vec<(Node, Node)>),
}

impl Node {
    /// Parse the first document of `content`.
    ///
    /// An empty input yields a null scalar.
    pub(crate) fn parse(content: &str) -> Result<Node, String> {
        let mut builder = TreeBuilder::default();
        let mut parser = Parser::new(content.chars());
        parser.load(&mut builder, false).map_err(|e| e.to_string())?;
        if let Some(error) = builder.error {
            return Err(error);
        }
        Ok(builder.root.unwrap_or_else(Node::null))
    }

    fn null() -> Node {
        Node::Scalar {
            text: String::new(),
            plain: true,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(
            self,
            Node::Scalar { text, plain: true } if matches!(text.as_str(), "" | "~" | "null" | "Null" | "NULL")
        )
    }

    /// Scalar text as written, quotes removed.
    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            Node::Scalar { text, .. } if !self.is_null() => Some(text),
            _ => None,
        }
    }

    /// Unquoted `true` / `false` in any of the YAML 1.2 spellings.
    pub(crate) fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Scalar { text, plain: true } => match text.as_str() {
                "true" | "True" | "TRUE" => Some(true),
                "false" | "False" | "FALSE" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub(crate) fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub(crate) fn as_mapping(&self) -> Option<&[(Node, Node)]> {
        match self {
            Node::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Value of the first entry whose key is `key`.
    pub(crate) fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| matches!(k, Node::Scalar { text, .. } if text == key))
            .map(|(_, v)| v)
    }

    pub(crate) fn shape(&self) -> &'static str {
        match self {
            node if node.is_null() => "null",
            Node::Scalar { .. } => "a scalar",
            Node::Sequence(_) => "a list",
            Node::Mapping(_) => "a mapping",
        }
    }
}

enum Frame {
    Sequence {
        anchor: usize,
        items: Vec<Node>,
    },
    Mapping {
        anchor: usize,
        entries: Vec<(Node, Node)>,
        key: Option<Node>,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    anchors: HashMap<usize, Node>,
    root: Option<Node>,
    error: Option<String>,
}

impl TreeBuilder {
    fn complete(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping { entries, key, .. }) => match key.take() {
                None => *key = Some(node),
                Some(k) => entries.push((k, node)),
            },
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        match event {
            Event::Scalar(text, style, anchor, _) => {
                let plain = style == TScalarStyle::Plain;
                self.complete(Node::Scalar { text, plain }, anchor);
            }
            Event::SequenceStart(anchor) => self.stack.push(Frame::Sequence {
                anchor,
                items: Vec::new(),
            }),
            Event::MappingStart(anchor) => self.stack.push(Frame::Mapping {
                anchor,
                entries: Vec::new(),
                key: None,
            }),
            Event::SequenceEnd | Event::MappingEnd => match self.stack.pop() {
                Some(Frame::Sequence { anchor, items }) => {
                    self.complete(Node::Sequence(items), anchor)
                }
                Some(Frame::Mapping { anchor, entries, .. }) => {
                    self.complete(Node::Mapping(entries), anchor)
                }
                None => {}
            },
            Event::Alias(id) => match self.anchors.get(&id).cloned() {
                Some(node) => self.complete(node, 0),
                None => {
                    self.error = Some(format!(
                        "unknown alias at line {} column {}",
                        mark.line(),
                        mark.col() + 1
                    ))
                }
            },
            _ => {}
        }
    }
}
