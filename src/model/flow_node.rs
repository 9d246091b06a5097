use super::{Codedata, Properties, Property};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of node kinds a flow model is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    ActionCall,
    NewConnection,
    FunctionCall,
    DataMapper,
    NewData,
    UpdateData,
    If,
    While,
    Break,
    Continue,
    Return,
    Fail,
    Panic,
    ExpressionStatement,
}

impl NodeKind {
    pub const ALL: [NodeKind; 14] = [
        NodeKind::ActionCall,
        NodeKind::NewConnection,
        NodeKind::FunctionCall,
        NodeKind::DataMapper,
        NodeKind::NewData,
        NodeKind::UpdateData,
        NodeKind::If,
        NodeKind::While,
        NodeKind::Break,
        NodeKind::Continue,
        NodeKind::Return,
        NodeKind::Fail,
        NodeKind::Panic,
        NodeKind::ExpressionStatement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::ActionCall => "ACTION_CALL",
            NodeKind::NewConnection => "NEW_CONNECTION",
            NodeKind::FunctionCall => "FUNCTION_CALL",
            NodeKind::DataMapper => "DATA_MAPPER",
            NodeKind::NewData => "NEW_DATA",
            NodeKind::UpdateData => "UPDATE_DATA",
            NodeKind::If => "IF",
            NodeKind::While => "WHILE",
            NodeKind::Break => "BREAK",
            NodeKind::Continue => "CONTINUE",
            NodeKind::Return => "RETURN",
            NodeKind::Fail => "FAIL",
            NodeKind::Panic => "PANIC",
            NodeKind::ExpressionStatement => "EXPRESSION_STATEMENT",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display information of a node or branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Metadata {
    pub fn new(label: &str, description: &str) -> Self {
        Self {
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

/// Bitset of node flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeFlags(u32);

impl NodeFlags {
    pub const NONE: NodeFlags = NodeFlags(0);
    /// The call result is unwrapped with `check`.
    pub const CHECKED: NodeFlags = NodeFlags(1);
    /// The statement returns the call result.
    pub const RETURNING: NodeFlags = NodeFlags(1 << 1);
    /// The value is produced by a data-mapping function.
    pub const IS_DATA_MAPPED: NodeFlags = NodeFlags(1 << 2);
    /// The declaration is `final`.
    pub const FINAL: NodeFlags = NodeFlags(1 << 3);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: NodeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: NodeFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: NodeFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: NodeFlags, enabled: bool) {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl std::ops::BitOr for NodeFlags {
    type Output = NodeFlags;

    fn bitor(self, rhs: NodeFlags) -> NodeFlags {
        NodeFlags(self.0 | rhs.0)
    }
}

/// A nested block owned by a control-flow node (e.g. the `Then` arm of an `IF`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub label: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl Branch {
    pub const THEN_LABEL: &'static str = "Then";
    pub const ELSE_LABEL: &'static str = "Else";
    pub const BODY_LABEL: &'static str = "Body";

    pub fn new(label: &str, children: Vec<FlowNode>) -> Self {
        Self {
            label: label.to_string(),
            properties: Properties::new(),
            children,
        }
    }
}

/// One visual unit of program structure in the editable graph.
///
/// A node is a *template* while its codedata carries no line range and *concrete*
/// once it is positioned in real source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    kind: NodeKind,
    #[serde(default)]
    pub metadata: Metadata,
    pub codedata: Codedata,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub flags: NodeFlags,
}

impl FlowNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: None,
            kind,
            metadata: Metadata::default(),
            codedata: Codedata::new(kind),
            properties: Properties::new(),
            branches: Vec::new(),
            flags: NodeFlags::NONE,
        }
    }

    /// Creates a node with the given codedata; its `node` field is forced to `kind`.
    pub fn with_codedata(kind: NodeKind, mut codedata: Codedata) -> Self {
        codedata.node = kind;
        Self {
            codedata,
            ..Self::new(kind)
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_template(&self) -> bool {
        self.codedata.line_range.is_none()
    }

    pub fn has_flag(&self, flag: NodeFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn returning(&self) -> bool {
        self.has_flag(NodeFlags::RETURNING)
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// The bound variable name, used as the sort key for connections.
    pub fn variable_name(&self) -> String {
        self.properties
            .get(Property::VARIABLE_KEY)
            .map(Property::source_text)
            .unwrap_or_default()
    }

    pub fn branch(&self, label: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.label == label)
    }
}
