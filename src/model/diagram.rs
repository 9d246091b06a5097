use super::FlowNode;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The flow model of one canvas: statement nodes in program order, plus the
/// connections visible to them sorted by variable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub file_path: String,
    pub nodes: Vec<FlowNode>,
    pub connections: Vec<FlowNode>,
}

impl Diagram {
    pub fn new(file_path: &str, nodes: Vec<FlowNode>, connections: Vec<FlowNode>) -> Self {
        // Stable sort, case-sensitive byte order, so regenerations diff cleanly.
        let connections = connections
            .into_iter()
            .sorted_by_key(FlowNode::variable_name)
            .collect();
        Self {
            file_path: file_path.to_string(),
            nodes,
            connections,
        }
    }

    pub fn empty(file_path: &str) -> Self {
        Self::new(file_path, Vec::new(), Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    pub fn outline(&self) -> DiagramOutline<'_> {
        DiagramOutline { diagram: self }
    }
}

/// A wrapper that renders a diagram as a box-drawing tree.
pub struct DiagramOutline<'a> {
    diagram: &'a Diagram,
}

impl fmt::Display for DiagramOutline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.diagram.file_path)?;
        writeln!(f, "├── connections")?;
        self.fmt_nodes(&self.diagram.connections, f, "│   ")?;
        writeln!(f, "└── nodes")?;
        self.fmt_nodes(&self.diagram.nodes, f, "    ")
    }
}

impl DiagramOutline<'_> {
    fn fmt_nodes(&self, nodes: &[FlowNode], f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        for (index, node) in nodes.iter().enumerate() {
            self.fmt_node(node, f, prefix, index + 1 == nodes.len())?;
        }
        Ok(())
    }

    fn fmt_node(
        &self,
        node: &FlowNode,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let node_marker = if is_last { "└── " } else { "├── " };
        write!(f, "{}{}{} ({})", prefix, node_marker, node.metadata.label, node.kind())?;
        if let Some(range) = &node.codedata.line_range {
            write!(f, " @{}", range.start_line)?;
        }
        writeln!(f)?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        for (index, branch) in node.branches.iter().enumerate() {
            let branch_is_last = index + 1 == node.branches.len();
            let branch_marker = if branch_is_last { "└── " } else { "├── " };
            writeln!(f, "{}{}[{}]", child_prefix, branch_marker, branch.label)?;
            let branch_prefix = format!(
                "{}{}",
                child_prefix,
                if branch_is_last { "    " } else { "│   " }
            );
            self.fmt_nodes(&branch.children, f, &branch_prefix)?;
        }
        Ok(())
    }
}
