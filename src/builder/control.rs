use super::{NodeBuilder, SourceBuilder, SyntaxKind, TemplateContext};
use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{Branch, FlowNode, Metadata, NodeKind, Property};
use crate::syntax::{ElseBody, Statement};

/// Defines builders for statements that are a single keyword.
macro_rules! define_keyword_builders {
    ( $( ($struct_name:ident, $kind:path, $keyword:path, $label:expr, $description:expr) ),* $(,)? ) => {
        $(
            pub struct $struct_name;

            impl NodeBuilder for $struct_name {
                fn kind(&self) -> NodeKind { $kind }

                fn set_const_data(&self, node: &mut FlowNode) {
                    node.metadata = Metadata::new($label, $description);
                }

                fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
                    Ok(self.template_node(context.codedata))
                }

                fn build_from_source(&self, analyzer: &CodeAnalyzer<'_>, site: &SourceSite<'_>) -> Result<FlowNode, BuildError> {
                    Ok(self.concrete_node(analyzer, site))
                }

                fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
                    source.token().keyword($keyword).end_of_statement();
                    Ok(())
                }
            }
        )*
    };
}

define_keyword_builders! {
    (BreakBuilder, NodeKind::Break, SyntaxKind::BreakKeyword, "Break", "Break out of the enclosing loop"),
    (ContinueBuilder, NodeKind::Continue, SyntaxKind::ContinueKeyword, "Continue", "Skip to the next iteration of the enclosing loop"),
}

const DEFAULT_CONDITION: &str = "true";

pub struct IfBuilder;

impl NodeBuilder for IfBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::If
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("If", "Add conditional branch to the flow");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties
            .insert(Property::condition(DEFAULT_CONDITION).with_default(DEFAULT_CONDITION));
        node.branches = vec![
            Branch::new(Branch::THEN_LABEL, Vec::new()),
            Branch::new(Branch::ELSE_LABEL, Vec::new()),
        ];
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(Statement::If(if_statement)) = site.statement else {
            return Err(site.unexpected(self.kind()));
        };
        let mut node = self.concrete_node(analyzer, site);
        node.properties
            .insert(Property::condition(&if_statement.condition.text));
        node.branches.push(Branch::new(
            Branch::THEN_LABEL,
            analyzer.analyze_block(&if_statement.then_block),
        ));
        match &if_statement.else_body {
            Some(ElseBody::Block(block)) => node
                .branches
                .push(Branch::new(Branch::ELSE_LABEL, analyzer.analyze_block(block))),
            Some(ElseBody::If(statement)) => node.branches.push(Branch::new(
                Branch::ELSE_LABEL,
                analyzer.analyze_statement(statement).into_iter().collect(),
            )),
            None => {}
        }
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let condition = source.require(Property::CONDITION_KEY)?;
        let node = source.flow_node;
        let then_children = node
            .branch(Branch::THEN_LABEL)
            .map(|b| b.children.as_slice())
            .unwrap_or_default();
        source
            .token()
            .keyword(SyntaxKind::IfKeyword)
            .expression(&condition);
        source.body(then_children)?;

        let Some(else_branch) = node.branch(Branch::ELSE_LABEL) else {
            return Ok(());
        };
        match else_branch.children.as_slice() {
            [] => {}
            [nested] if nested.kind() == NodeKind::If => {
                let text = source.render_child(nested)?;
                source
                    .token()
                    .whitespace()
                    .keyword(SyntaxKind::ElseKeyword)
                    .raw(&text);
            }
            children => {
                source
                    .token()
                    .whitespace()
                    .keyword(SyntaxKind::ElseKeyword);
                source.body(children)?;
            }
        }
        Ok(())
    }
}

pub struct WhileBuilder;

impl NodeBuilder for WhileBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::While
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("While", "Loop over a block of code while a condition holds");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties
            .insert(Property::condition(DEFAULT_CONDITION).with_default(DEFAULT_CONDITION));
        node.branches = vec![Branch::new(Branch::BODY_LABEL, Vec::new())];
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(Statement::While(while_statement)) = site.statement else {
            return Err(site.unexpected(self.kind()));
        };
        let mut node = self.concrete_node(analyzer, site);
        node.properties
            .insert(Property::condition(&while_statement.condition.text));
        node.branches.push(Branch::new(
            Branch::BODY_LABEL,
            analyzer.analyze_block(&while_statement.body),
        ));
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let condition = source.require(Property::CONDITION_KEY)?;
        let node = source.flow_node;
        let children = node
            .branch(Branch::BODY_LABEL)
            .map(|b| b.children.as_slice())
            .unwrap_or_default();
        source
            .token()
            .keyword(SyntaxKind::WhileKeyword)
            .expression(&condition);
        source.body(children)?;
        Ok(())
    }
}
