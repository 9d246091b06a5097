use super::call::argument_properties;
use super::{EditTarget, FileEdits, NodeBuilder, SourceBuilder, SyntaxKind, TemplateContext};
use crate::analyzer::{CodeAnalyzer, SourceSite};
use crate::error::BuildError;
use crate::model::{FlowNode, Metadata, NodeFlags, NodeKind, Property, Scope};
use crate::syntax::ExpressionKind;

const INIT_SYMBOL: &str = "init";

pub struct NewConnectionBuilder;

impl NodeBuilder for NewConnectionBuilder {
    fn kind(&self) -> NodeKind {
        NodeKind::NewConnection
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("New Connection", "Create a new connection");
        if node.codedata.symbol.is_none() {
            node.codedata.symbol = Some(INIT_SYMBOL.to_string());
        }
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        let template = context.templates.node_template(context.codedata)?;
        let mut node = self.template_node(context.codedata);
        if !template.metadata.label.is_empty() {
            node.metadata = template.metadata;
        }
        for property in template.properties {
            node.properties.insert(property);
        }

        let codedata = &context.codedata;
        let module = codedata.module.as_deref().unwrap_or("connection");
        let prefix = module.rsplit('.').next().unwrap_or(module);
        let variable = format!("{}Client", prefix);
        let data_type = match &codedata.object {
            Some(object) => format!("{}:{}", prefix, object),
            None => format!("{}:Client", prefix),
        };
        node.properties
            .insert(Property::variable(&variable).with_default(variable.as_str()));
        node.properties
            .insert(Property::data_type(&data_type).with_default(data_type.as_str()).editable(false));
        node.properties.insert(Scope::Global.property());
        node.flags = NodeFlags::CHECKED | NodeFlags::FINAL;
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
        let arguments = match site.expression.map(|e| &e.kind) {
            Some(ExpressionKind::New { arguments, .. }) => arguments.as_slice(),
            None => &[],
            Some(_) => return Err(site.unexpected(self.kind())),
        };

        let mut node = self.concrete_node(analyzer, site);
        if let Some(class) = analyzer.client_type(&declaration.type_desc) {
            node.metadata.label = class.name.clone();
            node.codedata.org = class.org;
            node.codedata.module = class.module;
            node.codedata.object = Some(class.name);
        }
        node.codedata.in_display_annotation = declaration.has_annotation("display");

        let template = analyzer.template(&node.codedata);
        for property in argument_properties(arguments, template.as_ref(), None) {
            node.properties.insert(property);
        }
        node.properties.insert(Property::variable(&declaration.name));
        node.properties
            .insert(Property::data_type(&declaration.type_desc).editable(false));
        node.properties.insert(analyzer.scope().property());
        node.flags.set(NodeFlags::CHECKED, site.checked);
        node.flags.set(NodeFlags::FINAL, declaration.is_final());
        Ok(node)
    }

    fn write_source(&self, source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        let variable = source.require(Property::VARIABLE_KEY)?;
        let data_type = source.require(Property::DATA_TYPE_KEY)?;
        if source.flow_node.has_flag(NodeFlags::FINAL) {
            source.token().keyword(SyntaxKind::FinalKeyword);
        }
        source
            .token()
            .name(&data_type)
            .whitespace()
            .name(&variable)
            .keyword(SyntaxKind::EqualToken)
            .keyword(SyntaxKind::CheckKeyword)
            .keyword(SyntaxKind::NewKeyword)
            .name(&data_type);
        source.arguments();
        source.token().end_of_statement();
        Ok(())
    }

    /// Local connections go to the requesting file, global ones to the shared
    /// connections file next to it.
    fn to_source(&self, mut source: SourceBuilder<'_>) -> Result<FileEdits, BuildError> {
        let scope: Scope = source.require(Property::SCOPE_KEY)?.parse()?;
        let connections_file = source.context().connections_file;
        let target = match scope {
            Scope::Local => EditTarget::Current,
            Scope::Global => EditTarget::Sibling(connections_file),
            Scope::Service => {
                return Err(BuildError::InvalidScope {
                    value: scope.to_string(),
                });
            }
        };
        self.write_source(&mut source)?;
        source.text_edit(target);
        Ok(source.build())
    }
}
