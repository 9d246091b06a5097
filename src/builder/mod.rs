//! Per-kind node builders: templates, nodes from source, and source from nodes.

mod call;
mod connection;
mod control;
mod data;
mod exit;
mod expression;
pub mod source;

pub use call::{ActionCallBuilder, FunctionCallBuilder};
pub use connection::NewConnectionBuilder;
pub use control::{BreakBuilder, ContinueBuilder, IfBuilder, WhileBuilder};
pub use data::{DataMapperBuilder, NewDataBuilder, UpdateDataBuilder};
pub use exit::{FailBuilder, PanicBuilder, ReturnBuilder};
pub use expression::ExpressionStatementBuilder;
pub use source::{EditTarget, FileEdits, SourceBuilder, SourceContext, SyntaxKind, TextEdit, TextRange, TokenBuilder};

use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{Codedata, FlowNode, NodeFlags, NodeKind, Property};
use crate::template::TemplateRegistry;
use ahash::AHashMap;
use std::path::Path;

/// Inputs of a template request.
pub struct TemplateContext<'a> {
    pub codedata: &'a Codedata,
    pub templates: &'a dyn TemplateRegistry,
}

/// Defines how one node kind is templated, recognized in source and rendered back.
pub trait NodeBuilder: Send + Sync {
    fn kind(&self) -> NodeKind;

    /// Sets the label and description shared by every node of this kind.
    fn set_const_data(&self, node: &mut FlowNode);

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError>;

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError>;

    /// Emits the tokens of one statement.
    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError>;

    fn to_source(&self, mut source: SourceBuilder<'_>) -> Result<FileEdits, BuildError> {
        self.write_source(&mut source)?;
        source.text_edit(EditTarget::Current);
        Ok(source.build())
    }

    /// A node of this kind carrying `codedata` and the constant data only.
    fn template_node(&self, codedata: &Codedata) -> FlowNode {
        let mut node = FlowNode::with_codedata(self.kind(), codedata.clone());
        self.set_const_data(&mut node);
        node
    }

    /// A node of this kind positioned at `site`.
    fn concrete_node(&self, analyzer: &CodeAnalyzer<'_>, site: &SourceSite<'_>) -> FlowNode {
        let mut node = FlowNode::with_codedata(self.kind(), analyzer.codedata(self.kind(), site));
        node.id = Some(site.id());
        self.set_const_data(&mut node);
        node
    }
}

/// Binds the declared variable of `site`, if any, onto `node`. Returning nodes
/// never bind.
pub(crate) fn bind_variable(node: &mut FlowNode, site: &SourceSite<'_>) {
    node.flags.set(NodeFlags::CHECKED, site.checked);
    node.flags.set(NodeFlags::RETURNING, site.returning);
    if site.returning {
        return;
    }
    if let Some(declaration) = site.declaration {
        node.properties.insert(Property::variable(&declaration.name));
        node.properties.insert(Property::data_type(&declaration.type_desc));
        node.flags.set(NodeFlags::FINAL, declaration.is_final());
    }
}

fn register_default_builders(registry: &mut AHashMap<NodeKind, Box<dyn NodeBuilder>>) {
    let builders: [Box<dyn NodeBuilder>; 14] = [
        Box::new(ActionCallBuilder),
        Box::new(NewConnectionBuilder),
        Box::new(FunctionCallBuilder),
        Box::new(DataMapperBuilder),
        Box::new(NewDataBuilder),
        Box::new(UpdateDataBuilder),
        Box::new(IfBuilder),
        Box::new(WhileBuilder),
        Box::new(BreakBuilder),
        Box::new(ContinueBuilder),
        Box::new(ReturnBuilder),
        Box::new(FailBuilder),
        Box::new(PanicBuilder),
        Box::new(ExpressionStatementBuilder),
    ];
    for builder in builders {
        registry.insert(builder.kind(), builder);
    }
}

/// The registry of node builders, one per [`NodeKind`].
pub struct NodeBuilders {
    builders: AHashMap<NodeKind, Box<dyn NodeBuilder>>,
}

impl NodeBuilders {
    pub fn new() -> Self {
        let mut builders: AHashMap<NodeKind, Box<dyn NodeBuilder>> = AHashMap::new();
        register_default_builders(&mut builders);
        Self { builders }
    }

    /// Replaces the builder registered for `builder.kind()`.
    pub fn with_builder(mut self, builder: Box<dyn NodeBuilder>) -> Self {
        self.builders.insert(builder.kind(), builder);
        self
    }

    pub fn get(&self, kind: NodeKind) -> Result<&dyn NodeBuilder, BuildError> {
        self.builders
            .get(&kind)
            .map(|builder| builder.as_ref())
            .ok_or(BuildError::UnsupportedKind(kind))
    }

    pub fn node_template(
        &self,
        codedata: &Codedata,
        templates: &dyn TemplateRegistry,
    ) -> Result<FlowNode, BuildError> {
        let builder = self.get(codedata.node)?;
        builder.set_template_data(&TemplateContext {
            codedata,
            templates,
        })
    }

    /// A node carrying only the constant data of its kind.
    pub fn const_node(&self, codedata: &Codedata) -> Result<FlowNode, BuildError> {
        Ok(self.get(codedata.node)?.template_node(codedata))
    }

    pub fn to_source(
        &self,
        flow_node: &FlowNode,
        file_path: &Path,
        connections_file: &str,
    ) -> Result<FileEdits, BuildError> {
        let builder = self.get(flow_node.kind())?;
        let context = SourceContext {
            file_path,
            builders: self,
            connections_file,
        };
        builder.to_source(SourceBuilder::new(flow_node, context))
    }
}

impl Default for NodeBuilders {
    fn default() -> Self {
        Self::new()
    }
}
