use serde::Serialize;

/// A vertex of the dependency graph: one top-level declaration of the
/// analyzed package, tagged with its declaration kind.
///
/// A type `Foo` and a function `Foo` are different nodes. Methods never get a
/// node of their own; they are folded into their receiver's `Type` node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "name")]
pub enum Node {
    #[serde(rename = "func")]
    Function(String),
    #[serde(rename = "type")]
    Type(String),
    #[serde(rename = "const")]
    Constant(String),
    #[serde(rename = "var")]
    Variable(String),
}

impl Node {
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(name.into())
    }

    pub fn ty(name: impl Into<String>) -> Self {
        Self::Type(name.into())
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::Constant(name.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Function(_) => NodeKind::Function,
            Self::Type(_) => NodeKind::Type,
            Self::Constant(_) => NodeKind::Constant,
            Self::Variable(_) => NodeKind::Variable,
        }
    }

    /// The declared symbol name, without the kind prefix.
    pub fn name(&self) -> &str {
        match self {
            Self::Function(name)
            | Self::Type(name)
            | Self::Constant(name)
            | Self::Variable(name) => name,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[serde(rename = "func")]
    Function,
    Type,
    #[serde(rename = "const")]
    Constant,
    #[serde(rename = "var")]
    Variable,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Function,
        NodeKind::Type,
        NodeKind::Constant,
        NodeKind::Variable,
    ];

    /// The Go keyword that introduces a declaration of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "func",
            Self::Type => "type",
            Self::Constant => "const",
            Self::Variable => "var",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge: `from`'s definition references `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub from: Node,
    pub to: Node,
}

impl Edge {
    pub fn new(from: Node, to: Node) -> Self {
        Self { from, to }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
