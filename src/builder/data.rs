use super::{NodeBuilder, SourceBuilder, SyntaxKind, TemplateContext, bind_variable};
use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{FlowNode, Metadata, NodeFlags, NodeKind, Property, ValueType};
use crate::syntax::{Argument, ExpressionKind, Statement};
use itertools::Itertools;

const DEFAULT_VARIABLE: &str = "var1";
const NIL: &str = "()";

pub struct NewDataBuilder;

impl NodeBuilder for NewDataBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::NewData
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Declare Variable", "New variable with type");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties
            .insert(Property::variable(DEFAULT_VARIABLE).with_default(DEFAULT_VARIABLE));
        node.properties
            .insert(Property::data_type("var").with_default("var"));
        node.properties
            .insert(Property::expression(NIL).with_default(NIL).optional(true));
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(declaration) = site.declaration else {
            return Err(site.unexpected(self.kind()));
        };
        let mut node = self.concrete_node(analyzer, site);
        node.properties.insert(Property::variable(&declaration.name));
        node.properties
            .insert(Property::data_type(&declaration.type_desc));
        let initializer = declaration
            .initializer
            .as_ref()
            .map(|e| e.text.as_str())
            .unwrap_or_default();
        node.properties
            .insert(Property::expression(initializer).optional(true));
        node.flags.set(NodeFlags::FINAL, declaration.is_final());
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let variable = source.require(Property::VARIABLE_KEY)?;
        let data_type = source
            .text(Property::DATA_TYPE_KEY)
            .unwrap_or_else(|| "var".to_string());
        if source.flow_node.has_flag(NodeFlags::FINAL) {
            source.token().keyword(SyntaxKind::FinalKeyword);
        }
        source.token().name(&data_type).whitespace().name(&variable);
        if let Some(expression) = source.text(Property::EXPRESSION_KEY) {
            source
                .token()
                .keyword(SyntaxKind::EqualToken)
                .expression(&expression);
        }
        source.token().end_of_statement();
        Ok(())
    }
}

pub struct UpdateDataBuilder;

impl NodeBuilder for UpdateDataBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::UpdateData
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Assign", "Assign a value to a variable");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        node.properties
            .insert(Property::variable(DEFAULT_VARIABLE).with_default(DEFAULT_VARIABLE));
        node.properties
            .insert(Property::expression(NIL).with_default(NIL));
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(Statement::Assignment(assignment)) = site.statement else {
            return Err(site.unexpected(self.kind()));
        };
        let mut node = self.concrete_node(analyzer, site);
        node.properties.insert(Property::variable(&assignment.target));
        node.properties
            .insert(Property::expression(&assignment.value.text));
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let variable = source.require(Property::VARIABLE_KEY)?;
        let expression = source.require(Property::EXPRESSION_KEY)?;
        source
            .token()
            .name(&variable)
            .keyword(SyntaxKind::EqualToken)
            .expression(&expression)
            .end_of_statement();
        Ok(())
    }
}

/// A declaration initialized by a call to a data-mapping function.
pub struct DataMapperBuilder;

impl NodeBuilder for DataMapperBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::DataMapper
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Data Mapper", "Map data from multiple variables to a record type");
        node.flags.insert(NodeFlags::IS_DATA_MAPPED);
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        let function = context
            .codedata
            .symbol
            .clone()
            .unwrap_or_else(|| "transform".to_string());
        node.properties
            .insert(Property::variable(DEFAULT_VARIABLE).with_default(DEFAULT_VARIABLE));
        node.properties
            .insert(Property::data_type("var").with_default("var"));
        node.properties.insert(
            Property::new(Property::FUNCTION_NAME_KEY, "Function", ValueType::Identifier)
                .with_default(function.as_str()),
        );
        node.properties.insert(
            Property::new(Property::INPUTS_KEY, "Inputs", ValueType::Expression)
                .with_description("Arguments of the mapping function")
                .optional(true),
        );
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(ExpressionKind::FunctionCall {
            name, arguments, ..
        }) = site.expression.map(|e| &e.kind)
        else {
            return Err(site.unexpected(self.kind()));
        };
        let mut node = self.concrete_node(analyzer, site);
        node.codedata.symbol = Some(name.clone());
        node.properties.insert(
            Property::new(Property::FUNCTION_NAME_KEY, "Function", ValueType::Identifier)
                .with_value(name.as_str()),
        );
        let inputs = arguments.iter().map(Argument::to_source).join(", ");
        node.properties.insert(
            Property::new(Property::INPUTS_KEY, "Inputs", ValueType::Expression)
                .with_value(inputs)
                .optional(true),
        );
        bind_variable(&mut node, site);
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        source.require(Property::VARIABLE_KEY)?;
        let function = source.require(Property::FUNCTION_NAME_KEY)?;
        let inputs = source.text(Property::INPUTS_KEY).unwrap_or_default();
        source.new_variable();
        if source.flow_node.has_flag(NodeFlags::CHECKED) {
            source.token().keyword(SyntaxKind::CheckKeyword);
        }
        source
            .token()
            .name(&function)
            .keyword(SyntaxKind::OpenParenToken)
            .expression(&inputs)
            .keyword(SyntaxKind::CloseParenToken)
            .end_of_statement();
        Ok(())
    }
}
