use super::{NodeBuilder, SourceBuilder, SyntaxKind, TemplateContext, bind_variable};
use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{Codedata, FlowNode, Metadata, NodeFlags, NodeKind, Properties, Property, ValueType};
use crate::syntax::{Argument, ExpressionKind};
use serde_json::Value;

/// Maps call arguments onto parameter properties.
///
/// Keys come from the template's parameters, then from `parameter_names`, then
/// fall back to `arg<i>`. Positional arguments stay required; named ones are
/// optional unless the template says otherwise.
pub(crate) fn argument_properties(
    arguments: &[Argument],
    template: Option<&FlowNode>,
    parameter_names: Option<&[String]>,
) -> Properties {
    let mut properties: Properties = template
        .map(|template| {
            template
                .properties
                .iter()
                .filter(|p| !Property::STRUCTURAL_KEYS.contains(&p.key.as_str()))
                .map(|p| p.clone().with_value(Value::Null))
                .collect()
        })
        .unwrap_or_default();
    let template_keys: Vec<String> = properties.keys().map(str::to_string).collect();

    let mut position = 0;
    for argument in arguments {
        match argument {
            Argument::Positional(value) => {
                let key = template_keys
                    .get(position)
                    .cloned()
                    .or_else(|| parameter_names.and_then(|names| names.get(position).cloned()))
                    .unwrap_or_else(|| format!("arg{}", position));
                position += 1;
                set_argument(&mut properties, &key, &value.text, false);
            }
            Argument::Named { name, value } => {
                set_argument(&mut properties, name, &value.text, true)
            }
        }
    }
    properties
}

fn set_argument(properties: &mut Properties, key: &str, text: &str, named: bool) {
    match properties.get_mut(key) {
        Some(property) => property.value = Value::String(text.to_string()),
        None => properties.insert(
            Property::new(key, key, ValueType::Expression)
                .with_value(text)
                .optional(named),
        ),
    }
}

fn default_connection_name(codedata: &Codedata) -> String {
    let module = codedata
        .module
        .as_deref()
        .and_then(|m| m.rsplit('.').next())
        .unwrap_or("connection");
    format!("{}Client", module)
}

/// Copies template metadata, flags and parameters onto a fresh node.
fn apply_template(node: &mut FlowNode, template: FlowNode) {
    if !template.metadata.label.is_empty() {
        node.metadata = template.metadata;
    }
    node.flags = template.flags;
    for property in template.properties {
        node.properties.insert(property);
    }
}

/// `[T v = ][return ][check ]`, the prefix shared by call statements.
fn write_call_prefix(source: &mut SourceBuilder<'_>) {
    let node = source.flow_node;
    if node.returning() {
        source.token().keyword(SyntaxKind::ReturnKeyword);
    } else {
        source.new_variable();
    }
    if node.has_flag(NodeFlags::CHECKED) {
        source.token().keyword(SyntaxKind::CheckKeyword);
    }
}

pub struct ActionCallBuilder;

impl NodeBuilder for ActionCallBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::ActionCall
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Action Call", "Invoke a remote operation of a connection");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let template = context.templates.node_template(context.codedata)?;
        let target_type = template
            .properties
            .text(Property::TARGET_TYPE_KEY)
            .unwrap_or_else(|| "var".to_string());

        let mut node = self.template_node(context.codedata);
        let connection = context
            .codedata
            .parent_symbol
            .clone()
            .unwrap_or_else(|| default_connection_name(context.codedata));
        node.properties.insert(Property::connection(&connection));
        apply_template(&mut node, template);
        node.properties
            .insert_if_absent(Property::variable("result").with_default("result"));
        node.properties
            .insert_if_absent(Property::data_type(&target_type).with_default(target_type.as_str()));
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(ExpressionKind::RemoteCall {
            client,
            method,
            arguments,
        }) = site.expression.map(|e| &e.kind)
        else {
            return Err(site.unexpected(self.kind()));
        };

        let mut node = self.concrete_node(analyzer, site);
        if let Some(class) = analyzer.connection_class(client, site.span.start) {
            node.codedata.org = class.org;
            node.codedata.module = class.module;
            node.codedata.object = Some(class.name);
        }
        node.codedata.symbol = Some(method.clone());
        node.codedata.parent_symbol = Some(client.clone());
        node.metadata.label = method.clone();

        let template = analyzer.template(&node.codedata);
        node.properties.insert(Property::connection(client));
        for property in argument_properties(arguments, template.as_ref(), None) {
            node.properties.insert(property);
        }
        bind_variable(&mut node, site);
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let connection = source.require(Property::CONNECTION_KEY)?;
        let node = source.flow_node;
        let operation = node
            .codedata
            .symbol
            .clone()
            .filter(|symbol| !symbol.is_empty())
            .or_else(|| Some(node.metadata.label.clone()).filter(|label| !label.is_empty()))
            .ok_or_else(|| BuildError::MissingCodedata {
                kind: self.kind(),
                field: "symbol".to_string(),
            })?;

        write_call_prefix(source);
        source
            .token()
            .name(&connection)
            .keyword(SyntaxKind::RightArrowToken)
            .name(&operation);
        source.arguments();
        source.token().end_of_statement();
        Ok(())
    }
}

pub struct FunctionCallBuilder;

impl NodeBuilder for FunctionCallBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::FunctionCall
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Function Call", "Call a function");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let mut node = self.template_node(context.codedata);
        if context.codedata.module.is_some() {
            let template = context.templates.node_template(context.codedata)?;
            apply_template(&mut node, template);
        } else if let Some(symbol) = &context.codedata.symbol {
            // Functions of the edited module need no registry entry.
            node.metadata.label = symbol.clone();
        }
        Ok(node)
    }

    fn build_from_source(
        &self,
        analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        let Some(ExpressionKind::FunctionCall {
            prefix,
            name,
            arguments,
        }) = site.expression.map(|e| &e.kind)
        else {
            return Err(site.unexpected(self.kind()));
        };

        let mut node = self.concrete_node(analyzer, site);
        node.codedata.symbol = Some(name.clone());
        node.metadata.label = name.clone();

        let (template, parameter_names) = match prefix {
            Some(prefix) => {
                node.codedata.module_prefix = Some(prefix.clone());
                match analyzer.import(prefix) {
                    Some(import) => {
                        node.codedata.org = import.org.clone();
                        node.codedata.module = Some(import.module.clone());
                    }
                    None => node.codedata.module = Some(prefix.clone()),
                }
                (analyzer.template(&node.codedata), None)
            }
            None => (None, analyzer.semantic().function_parameters(name)),
        };

        for property in argument_properties(arguments, template.as_ref(), parameter_names.as_deref())
        {
            node.properties.insert(property);
        }
        bind_variable(&mut node, site);
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let node = source.flow_node;
        let symbol = node
            .codedata
            .symbol
            .clone()
            .filter(|symbol| !symbol.is_empty())
            .ok_or_else(|| BuildError::MissingCodedata {
                kind: self.kind(),
                field: "symbol".to_string(),
            })?;
        let function = match node.codedata.qualifier() {
            Some(qualifier) => format!("{}:{}", qualifier, symbol),
            None => symbol,
        };

        write_call_prefix(source);
        source.token().name(&function);
        source.arguments();
        source.token().end_of_statement();
        Ok(())
    }
}
