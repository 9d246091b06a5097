//! Turns syntax into flow nodes.
//!
//! The analyzer classifies each statement into a [`NodeKind`] and hands it to the
//! registered builder. It never mutates the tree; a node that fails to build is
//! logged and skipped without affecting its siblings.

use crate::builder::NodeBuilders;
use crate::error::BuildError;
use crate::model::{Codedata, FlowNode, LinePosition, NodeKind, Scope};
use crate::syntax::*;
use crate::template::TemplateRegistry;

/// The syntax a node is built from, with the facts classification already
/// established about it.
#[derive(Debug, Clone, Copy)]
pub struct SourceSite<'t> {
    pub span: Span,
    pub statement: Option<&'t Statement>,
    pub declaration: Option<&'t VariableDeclaration>,
    /// The classified expression, with any `check` already stripped for calls.
    pub expression: Option<&'t Expression>,
    pub checked: bool,
    pub returning: bool,
}

impl<'t> SourceSite<'t> {
    fn new(span: Span) -> Self {
        Self {
            span,
            statement: None,
            declaration: None,
            expression: None,
            checked: false,
            returning: false,
        }
    }

    /// Node ids are the `line:offset` of the construct start.
    pub fn id(&self) -> String {
        self.span.start.to_string()
    }

    pub fn unexpected(&self, kind: NodeKind) -> BuildError {
        BuildError::UnexpectedConstruct {
            kind,
            found: self
                .statement
                .map(Statement::kind_name)
                .unwrap_or("a module-level declaration")
                .to_string(),
        }
    }
}

pub struct CodeAnalyzer<'a> {
    document: &'a Document,
    semantic: &'a dyn SemanticModel,
    templates: &'a dyn TemplateRegistry,
    builders: &'a NodeBuilders,
    scope: Scope,
    data_mappings: &'a [String],
}

impl<'a> CodeAnalyzer<'a> {
    pub fn new(
        document: &'a Document,
        semantic: &'a dyn SemanticModel,
        templates: &'a dyn TemplateRegistry,
        builders: &'a NodeBuilders,
        scope: Scope,
        data_mappings: &'a [String],
    ) -> Self {
        Self {
            document,
            semantic,
            templates,
            builders,
            scope,
            data_mappings,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn semantic(&self) -> &dyn SemanticModel {
        self.semantic
    }

    pub fn document(&self) -> &Document {
        self.document
    }

    /// The same analyzer, for declarations found in another scope tier.
    pub fn with_scope(&self, scope: Scope) -> CodeAnalyzer<'a> {
        CodeAnalyzer { scope, ..*self }
    }

    pub fn analyze(&self, node: NodeRef<'_>) -> Vec<FlowNode> {
        match node {
            NodeRef::Module(module) => module
                .members
                .iter()
                .filter_map(|member| match member {
                    ModuleMember::Variable(declaration) => self.analyze_module_variable(declaration),
                    _ => None,
                })
                .collect(),
            NodeRef::Function(function) => self.analyze_block(&function.body),
            NodeRef::Service(service) => service
                .functions
                .iter()
                .flat_map(|f| self.analyze_block(&f.body))
                .collect(),
            NodeRef::Class(class) => class
                .functions
                .iter()
                .flat_map(|f| self.analyze_block(&f.body))
                .collect(),
            NodeRef::ModuleVariable(declaration) => {
                self.analyze_module_variable(declaration).into_iter().collect()
            }
            NodeRef::Block(block) => self.analyze_block(block),
            NodeRef::Statement(statement) => self.analyze_statement(statement).into_iter().collect(),
        }
    }

    pub fn analyze_block(&self, block: &Block) -> Vec<FlowNode> {
        block
            .statements
            .iter()
            .filter_map(|statement| self.analyze_statement(statement))
            .collect()
    }

    /// Module-level declarations other than connections, listeners and constants.
    fn analyze_module_variable(&self, declaration: &VariableDeclaration) -> Option<FlowNode> {
        if declaration.is_listener()
            || declaration.has_qualifier("const")
            || declaration.has_qualifier("configurable")
        {
            return None;
        }
        let (kind, site) = self.classify_declaration(declaration, None);
        if kind == NodeKind::NewConnection {
            return None;
        }
        self.build(kind, &site)
    }

    pub fn analyze_statement(&self, statement: &Statement) -> Option<FlowNode> {
        let mut site = SourceSite::new(statement.span());
        site.statement = Some(statement);
        let kind = match statement {
            Statement::VariableDeclaration(declaration) => {
                return self.analyze_declaration(declaration, Some(statement));
            }
            Statement::Unsupported(unsupported) => {
                tracing::warn!(
                    construct = %unsupported.construct,
                    position = %unsupported.span.start,
                    "Skipping statement with no flow node"
                );
                return None;
            }
            Statement::Assignment(_) => NodeKind::UpdateData,
            Statement::If(_) => NodeKind::If,
            Statement::While(_) => NodeKind::While,
            Statement::Break(_) => NodeKind::Break,
            Statement::Continue(_) => NodeKind::Continue,
            Statement::Fail(exit) => {
                site.expression = exit.expression.as_ref();
                NodeKind::Fail
            }
            Statement::Panic(exit) => {
                site.expression = exit.expression.as_ref();
                NodeKind::Panic
            }
            Statement::Return(exit) => match exit.expression.as_ref() {
                Some(expression) => {
                    let (inner, checked) = expression.unwrap_check();
                    match self.call_kind(inner) {
                        Some(kind) => {
                            site.expression = Some(inner);
                            site.checked = checked;
                            site.returning = true;
                            kind
                        }
                        None => {
                            site.expression = Some(expression);
                            NodeKind::Return
                        }
                    }
                }
                None => NodeKind::Return,
            },
            Statement::Expression(statement) => {
                let (inner, checked) = statement.expression.unwrap_check();
                match self.call_kind(inner) {
                    Some(kind) => {
                        site.expression = Some(inner);
                        site.checked = checked;
                        kind
                    }
                    None => {
                        site.expression = Some(&statement.expression);
                        NodeKind::ExpressionStatement
                    }
                }
            }
        };
        self.build(kind, &site)
    }

    /// Builds the node of a declaration statement, or of a module-level or field
    /// declaration when `statement` is `None`.
    pub fn analyze_declaration(
        &self,
        declaration: &VariableDeclaration,
        statement: Option<&Statement>,
    ) -> Option<FlowNode> {
        let (kind, site) = self.classify_declaration(declaration, statement);
        self.build(kind, &site)
    }

    fn classify_declaration<'t>(
        &self,
        declaration: &'t VariableDeclaration,
        statement: Option<&'t Statement>,
    ) -> (NodeKind, SourceSite<'t>) {
        let mut site = SourceSite::new(declaration.span);
        site.statement = statement;
        site.declaration = Some(declaration);

        let Some(initializer) = &declaration.initializer else {
            let kind = if self.client_type(&declaration.type_desc).is_some() {
                NodeKind::NewConnection
            } else {
                NodeKind::NewData
            };
            return (kind, site);
        };

        let (inner, checked) = initializer.unwrap_check();
        let kind = match &inner.kind {
            ExpressionKind::New { .. } if self.client_type(&declaration.type_desc).is_some() => {
                NodeKind::NewConnection
            }
            ExpressionKind::FunctionCall {
                prefix: None, name, ..
            } if self.is_data_mapping(name) => NodeKind::DataMapper,
            _ => match self.call_kind(inner) {
                Some(kind) => kind,
                None => {
                    site.expression = Some(initializer);
                    return (NodeKind::NewData, site);
                }
            },
        };
        site.expression = Some(inner);
        site.checked = checked;
        (kind, site)
    }

    fn call_kind(&self, expression: &Expression) -> Option<NodeKind> {
        match expression.kind {
            ExpressionKind::RemoteCall { .. } => Some(NodeKind::ActionCall),
            ExpressionKind::FunctionCall { .. } => Some(NodeKind::FunctionCall),
            _ => None,
        }
    }

    fn build(&self, kind: NodeKind, site: &SourceSite<'_>) -> Option<FlowNode> {
        let result = self
            .builders
            .get(kind)
            .and_then(|builder| builder.build_from_source(self, site));
        match result {
            Ok(node) => Some(node),
            Err(err) => {
                tracing::warn!(
                    kind = %kind,
                    position = %site.span.start,
                    error = %err,
                    "Skipping node that could not be built"
                );
                None
            }
        }
    }

    // --- Queries used by node builders ----------------------------------------

    /// Concrete codedata for a node built at `site`.
    pub fn codedata(&self, kind: NodeKind, site: &SourceSite<'_>) -> Codedata {
        let mut codedata = Codedata::new(kind);
        codedata.line_range = Some(self.document.line_range(&site.span));
        codedata.source_code = Some(self.document.slice(&site.span).to_string());
        codedata
    }

    /// The registry template for `codedata`, if any. Absence is expected for
    /// symbols the registry does not know.
    pub fn template(&self, codedata: &Codedata) -> Option<FlowNode> {
        match self.templates.node_template(codedata) {
            Ok(template) => Some(template),
            Err(err) => {
                tracing::debug!(error = %err, "No template for call site");
                None
            }
        }
    }

    pub fn import(&self, prefix: &str) -> Option<&ImportDeclaration> {
        self.document
            .tree()
            .imports
            .iter()
            .find(|import| import.prefix == prefix)
    }

    /// The client class a type descriptor resolves to.
    pub fn client_type(&self, type_desc: &str) -> Option<ClassSymbol> {
        self.semantic
            .resolve_type(type_desc)
            .ok()
            .and_then(|symbol| symbol.client_class().cloned())
    }

    /// The client class of the connection a remote call is made on.
    pub fn connection_class(&self, client: &str, position: LinePosition) -> Option<ClassSymbol> {
        let name = client.strip_prefix("self.").unwrap_or(client);
        let symbol = self
            .semantic
            .visible_symbols(position)
            .into_iter()
            .rev()
            .find(|symbol| symbol.name == name)?;
        self.client_type(symbol.type_desc.as_deref()?)
    }

    pub fn is_data_mapping(&self, name: &str) -> bool {
        self.data_mappings.iter().any(|mapping| mapping == name)
    }
}
