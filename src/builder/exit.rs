use super::{NodeBuilder, SourceBuilder, SyntaxKind, TemplateContext};
use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{FlowNode, Metadata, NodeKind, Property};

/// Concrete node whose optional `expression` mirrors the statement's operand.
fn exit_node(
    builder: &impl NodeBuilder,
    analyzer: &CodeAnalyzer<'_>,
    site: &SourceSite<'_>,
    optional: bool,
) -> FlowNode {
    let mut node = builder.concrete_node(analyzer, site);
    let text = site.expression.map(|e| e.text.as_str()).unwrap_or_default();
    node.properties
        .insert(Property::expression(text).optional(optional));
    node
}

/// `<keyword>[ <expression>];`
fn write_exit(source: &mut SourceBuilder<'_>, keyword: SyntaxKind) {
    source.token().keyword(keyword);
    if let Some(expression) = source.text(Property::EXPRESSION_KEY) {
        source.token().expression(&expression);
    }
    source.token().end_of_statement();
}

pub struct ReturnBuilder;

impl NodeBuilder for ReturnBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::Return
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Return", "Value of the expression to return");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties.insert(
            Property::expression("")
                .with_description("Return value")
                .optional(true),
        );
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        Ok(exit_node(self, analyzer, site, true))
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        write_exit(source, SyntaxKind::ReturnKeyword);
        Ok(())
    }
}

pub struct FailBuilder;

impl NodeBuilder for FailBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::Fail
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Fail", "Fail the execution");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties.insert(
            Property::expression("")
                .with_description("Fail value")
                .optional(true),
        );
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        Ok(exit_node(self, analyzer, site, true))
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        write_exit(source, SyntaxKind::FailKeyword);
        Ok(())
    }
}

pub struct PanicBuilder;

const DEFAULT_PANIC_VALUE: &str = "error(\"\")";

impl NodeBuilder for PanicBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::Panic
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Panic", "Panic and stop the execution");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties.insert(
            Property::expression(DEFAULT_PANIC_VALUE)
                .with_default(DEFAULT_PANIC_VALUE)
                .with_description("Panic value"),
        );
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        Ok(exit_node(self, analyzer, site, false))
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        source.require(Property::EXPRESSION_KEY)?;
        write_exit(source, SyntaxKind::PanicKeyword);
        Ok(())
    }
}
