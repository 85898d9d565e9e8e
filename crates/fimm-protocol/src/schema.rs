//! Node schemas parsed from the engine's `help` text.
//!
//! The help grammar per line is `<name>? <typeTag> [- [(args):] description]`;
//! a literal `Children:` marker introduces one such line per child. The
//! text is not perfectly regular, so child lines that fail to parse are
//! skipped with a warning rather than aborting the whole describe.

use serde::Serialize;

use crate::error::ProtocolError;

/// Marker line introducing the child descriptors.
const CHILDREN_MARKER: &str = "Children:";

/// Type tag of a remote node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeType {
    Integer,
    Float,
    String,
    /// Complex-valued matrix primitive.
    ComplexMat,
    Function,
    /// `LIST<...>` with the raw element tag.
    List(String),
    /// Any composite/object tag, e.g. `NODE`.
    Object(String),
}

impl NodeType {
    /// Parse a type-tag token.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "INTEGER" => Self::Integer,
            "FLOAT" => Self::Float,
            "STRING" => Self::String,
            "CPXMAT" => Self::ComplexMat,
            "FUNCTION" => Self::Function,
            _ if tag.starts_with("LIST") => {
                let elem = tag
                    .strip_prefix("LIST")
                    .and_then(|rest| rest.strip_prefix('<'))
                    .and_then(|rest| rest.strip_suffix('>'))
                    .unwrap_or_default();
                Self::List(elem.to_owned())
            }
            other => Self::Object(other.to_owned()),
        }
    }

    /// Primitive kinds read and write as scalars.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::String | Self::ComplexMat
        )
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function)
    }
}

/// One named, typed child of a composite node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildDesc {
    pub name: String,
    pub node_type: NodeType,
}

/// The decoded shape of a remote path.
///
/// Created once per distinct path and cached for the session's lifetime;
/// schema is assumed immutable for a given path within a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSchema {
    pub name: Option<String>,
    pub node_type: NodeType,
    pub description: Option<String>,
    /// Ordered child descriptors, as listed by the engine.
    pub children: Vec<ChildDesc>,
}

impl NodeSchema {
    /// Descriptor of the named child, if any.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ChildDesc> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// Parse a complete `help` response body into a schema.
///
/// # Errors
/// `Remote` when the body carries the `ERROR` marker, `BadHelp` when the
/// first line fails the declaration grammar.
pub fn parse_help(text: &str) -> Result<NodeSchema, ProtocolError> {
    let text = text.trim();
    if text.starts_with(crate::decode::ERROR_MARKER) {
        return Err(ProtocolError::Remote(text.to_owned()));
    }

    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default();
    let (name, node_type, description) =
        parse_decl(first).ok_or_else(|| ProtocolError::BadHelp(first.to_owned()))?;

    let mut children = Vec::new();
    let mut in_children = false;
    for line in lines {
        if !in_children {
            in_children = line.trim() == CHILDREN_MARKER;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        match parse_decl(line) {
            Some((Some(child_name), child_type, _)) => children.push(ChildDesc {
                name: child_name,
                node_type: child_type,
            }),
            _ => tracing::warn!(line, "skipping unparsable help line"),
        }
    }

    Ok(NodeSchema {
        name,
        node_type,
        description,
        children,
    })
}

/// Parse one declaration line into (name, type, description).
///
/// A single token is a bare type tag; with two or more the first token is
/// the name. The description may be prefixed by a hyphen and a
/// parenthesised argument list ending in `):`.
fn parse_decl(line: &str) -> Option<(Option<String>, NodeType, Option<String>)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (name, tag, rest) = match tokens.as_slice() {
        [] => return None,
        [tag] => (None, *tag, &[] as &[&str]),
        [name, tag, rest @ ..] => (Some((*name).to_owned()), *tag, rest),
    };

    let mut desc = rest.join(" ");
    if let Some(stripped) = desc.strip_prefix('-') {
        desc = stripped.trim_start().to_owned();
    }
    if desc.starts_with('(') {
        if let Some(pos) = desc.find("):") {
            desc = desc[pos + 2..].trim_start().to_owned();
        }
    }

    let description = (!desc.is_empty()).then_some(desc);
    Some((name, NodeType::parse(tag), description))
}
