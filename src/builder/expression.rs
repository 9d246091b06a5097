use super::{NodeBuilder, SourceBuilder, TemplateContext};
use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{FlowNode, Metadata, NodeKind, Property};

// `_ = ()` is the smallest statement that is valid on its own.
const DEFAULT_EXPRESSION: &str = "_ = ()";

pub struct ExpressionStatementBuilder;

impl NodeBuilder for ExpressionStatementBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::ExpressionStatement
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Custom Expression", "Evaluate an expression");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties
            .insert(Property::expression(DEFAULT_EXPRESSION).with_default(DEFAULT_EXPRESSION));
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(expression) = site.expression else {
            return Err(site.unexpected(self.kind()));
        };
        let mut node = self.concrete_node(analyzer, site);
        node.properties.insert(Property::expression(&expression.text));
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let expression = source.require(Property::EXPRESSION_KEY)?;
        source.token().expression(&expression).end_of_statement();
        Ok(())
    }
}
