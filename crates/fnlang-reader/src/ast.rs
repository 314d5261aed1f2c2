use std::fmt;

use fnlang_core::Span;

/// One parsed form. `List` (`[...]`), `Map` (`{...}`) and `Expression`
/// (`(...)`) are distinct kinds because the evaluator treats them
/// differently; everything else is a literal leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Int(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Atom(String),
    List(Vec<Node>),
    Map(Vec<Node>),
    Expression(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// True for literal leaves (everything except List/Map/Expression).
    pub fn is_value(&self) -> bool {
        !matches!(
            self.kind,
            NodeKind::List(_) | NodeKind::Map(_) | NodeKind::Expression(_)
        )
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::List(items) | NodeKind::Map(items) | NodeKind::Expression(items) => items,
            _ => &[],
        }
    }

    /// Render the node back to source text, for diagnostics.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match &self.kind {
            NodeKind::Int(n) => write!(f, "{n}"),
            NodeKind::Float(x) => write!(f, "{x}"),
            NodeKind::String(s) => write!(f, "{s:?}"),
            NodeKind::Symbol(s) | NodeKind::Atom(s) => write!(f, "{s}"),
            NodeKind::List(items) => {
                write!(f, "[")?;
                join(f, items)?;
                write!(f, "]")
            }
            NodeKind::Map(items) => {
                write!(f, "{{")?;
                join(f, items)?;
                write!(f, "}}")
            }
            NodeKind::Expression(items) => {
                write!(f, "(")?;
                join(f, items)?;
                write!(f, ")")
            }
        }
    }
}
