//! Selector syntax tree.

use serde::Serialize;
use std::fmt;

/// `[attribute op value i]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSelector {
    pub attribute: String,
    /// `None` for a presence check (`[attr]`)
    pub operator: Option<String>,
    pub value: Option<String>,
    /// Value was written as a quoted string
    pub quoted: bool,
    /// Trailing `i` flag
    pub insensitive: bool,
}

/// A node of the parsed selector.
///
/// A query parses to a `Root` holding one `Selector` per comma-separated
/// clause. Pseudo-selector arguments are themselves `Selector` nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Ast {
    Root { nodes: Vec<Ast> },
    Selector { nodes: Vec<Ast>, source: String },
    Tag { value: String },
    String { value: String },
    Identifier { value: String },
    Class { value: String },
    Universal,
    Nesting,
    Comment { value: String },
    Combinator { value: String },
    Attribute(AttributeSelector),
    Pseudo { value: String, nodes: Vec<Ast> },
}

impl Ast {
    pub fn kind(&self) -> &'static str {
        match self {
            Ast::Root { .. } => "root",
            Ast::Selector { .. } => "selector",
            Ast::Tag { .. } => "tag",
            Ast::String { .. } => "string",
            Ast::Identifier { .. } => "identifier",
            Ast::Class { .. } => "class",
            Ast::Universal => "universal",
            Ast::Nesting => "nesting",
            Ast::Comment { .. } => "comment",
            Ast::Combinator { .. } => "combinator",
            Ast::Attribute(_) => "attribute",
            Ast::Pseudo { .. } => "pseudo",
        }
    }

    pub fn children(&self) -> &[Ast] {
        match self {
            Ast::Root { nodes } | Ast::Selector { nodes, .. } | Ast::Pseudo { nodes, .. } => nodes,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Ast>> {
        match self {
            Ast::Root { nodes } | Ast::Selector { nodes, .. } | Ast::Pseudo { nodes, .. } => {
                Some(nodes)
            }
            _ => None,
        }
    }

    /// Raw text of a `Selector` node.
    pub fn source(&self) -> Option<&str> {
        match self {
            Ast::Selector { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Universal and tag nodes count as "simple" for descendant elision.
    pub(crate) fn is_universal_or_tag(&self) -> bool {
        matches!(self, Ast::Universal | Ast::Tag { .. })
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Root { nodes } => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", node)?;
                }
                Ok(())
            }
            Ast::Selector { source, .. } => f.write_str(source),
            Ast::Tag { value } => f.write_str(value),
            Ast::String { value } => write!(f, "\"{}\"", value),
            Ast::Identifier { value } => write!(f, "#{}", value),
            Ast::Class { value } => write!(f, ".{}", value),
            Ast::Universal => f.write_str("*"),
            Ast::Nesting => f.write_str("&"),
            Ast::Comment { value } => write!(f, "/*{}*/", value),
            Ast::Combinator { value } => f.write_str(value),
            Ast::Attribute(attr) => {
                write!(f, "[{}", attr.attribute)?;
                if let (Some(op), Some(value)) = (&attr.operator, &attr.value) {
                    write!(f, "{}", op)?;
                    if attr.quoted {
                        write!(f, "\"{}\"", value)?;
                    } else {
                        f.write_str(value)?;
                    }
                }
                if attr.insensitive {
                    f.write_str(" i")?;
                }
                f.write_str("]")
            }
            Ast::Pseudo { value, nodes } => {
                write!(f, ":{}", value)?;
                if !nodes.is_empty() {
                    f.write_str("(")?;
                    for (i, node) in nodes.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", node)?;
                    }
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}
