use crate::analyzer::CodeAnalyzer;
use crate::builder::NodeBuilders;
use crate::error::AnalysisError;
use crate::model::{Diagram, FlowNode, LinePosition, Scope};
use crate::syntax::{
    Document, NodeRef, SemanticModel, Span, Statement, SymbolKind, VariableDeclaration,
    scan_function_names,
};
use crate::template::TemplateRegistry;
use tracing::{debug, instrument};

/// Produces the flow model of a line range of one document.
pub struct ModelGenerator<'a> {
    document: &'a Document,
    semantic: &'a dyn SemanticModel,
    templates: &'a dyn TemplateRegistry,
    builders: &'a NodeBuilders,
    start: LinePosition,
    end: LinePosition,
    data_mappings: Vec<String>,
}

pub struct ModelGeneratorBuilder<'a> {
    document: &'a Document,
    semantic: &'a dyn SemanticModel,
    templates: &'a dyn TemplateRegistry,
    builders: &'a NodeBuilders,
    range: Option<(LinePosition, LinePosition)>,
    data_mappings: Vec<String>,
}

impl<'a> ModelGeneratorBuilder<'a> {
    /// Restricts the model to the innermost construct enclosing `start..end`.
    /// Defaults to the whole document.
    pub fn line_range(mut self, start: LinePosition, end: LinePosition) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Text of the companion document whose functions are data mappings.
    pub fn data_mappings(mut self, text: &str) -> Self {
        self.data_mappings = scan_function_names(text);
        self
    }

    pub fn build(self) -> ModelGenerator<'a> {
        let (start, end) = self
            .range
            .unwrap_or_else(|| (LinePosition::default(), self.document.end_position()));
        ModelGenerator {
            document: self.document,
            semantic: self.semantic,
            templates: self.templates,
            builders: self.builders,
            start,
            end,
            data_mappings: self.data_mappings,
        }
    }
}

impl<'a> ModelGenerator<'a> {
    pub fn builder(
        document: &'a Document,
        semantic: &'a dyn SemanticModel,
        templates: &'a dyn TemplateRegistry,
        builders: &'a NodeBuilders,
    ) -> ModelGeneratorBuilder<'a> {
        ModelGeneratorBuilder {
            document,
            semantic,
            templates,
            builders,
            range: None,
            data_mappings: Vec::new(),
        }
    }

    fn analyzer(&self, scope: Scope) -> CodeAnalyzer<'_> {
        CodeAnalyzer::new(
            self.document,
            self.semantic,
            self.templates,
            self.builders,
            scope,
            &self.data_mappings,
        )
    }

    /// Builds the diagram. Never fails: anything that cannot be modeled is left out.
    #[instrument(skip(self), fields(file = %self.document.file_name(), start = %self.start, end = %self.end))]
    pub fn flow_model(&self) -> Diagram {
        let file_path = self.document.path().to_string_lossy().into_owned();
        let Some(node) = self.document.find_node(self.start, self.end) else {
            let err = AnalysisError::NoEnclosingNode {
                start: self.start.to_string(),
                end: self.end.to_string(),
            };
            debug!(error = %err, "Returning an empty flow model");
            return Diagram::empty(&file_path);
        };

        let connections = self.connections(node.span().start);
        let nodes = self.analyzer(Scope::Local).analyze(node);
        debug!(
            nodes = nodes.len(),
            connections = connections.len(),
            "Generated flow model"
        );
        Diagram::new(&file_path, nodes, connections)
    }

    /// Connection nodes for every client-typed variable visible at `position`.
    fn connections(&self, position: LinePosition) -> Vec<FlowNode> {
        let analyzer = self.analyzer(Scope::Global);
        let mut connections = Vec::new();
        for symbol in self.semantic.visible_symbols(position) {
            let scope = match symbol.kind {
                SymbolKind::ModuleVariable => Scope::Global,
                SymbolKind::ClassField => Scope::Service,
                SymbolKind::LocalVariable => Scope::Local,
                _ => continue,
            };
            let Some(type_desc) = symbol.type_desc.as_deref() else {
                continue;
            };
            match self.semantic.resolve_type(type_desc) {
                Ok(resolved) if resolved.client_class().is_some() => {}
                Ok(_) => continue,
                Err(err) => {
                    debug!(symbol = %symbol.name, error = %err, "Skipping unresolved symbol");
                    continue;
                }
            }
            let Some((declaration, statement)) = self.declaration_at(&symbol.declaration) else {
                continue;
            };
            if let Some(node) = analyzer
                .with_scope(scope)
                .analyze_declaration(declaration, statement)
            {
                connections.push(node);
            }
        }
        connections
    }

    fn declaration_at(&self, span: &Span) -> Option<(&'a VariableDeclaration, Option<&'a Statement>)> {
        let field = |fields: &'a [VariableDeclaration]| {
            fields
                .iter()
                .find(|field| field.span == *span)
                .map(|field| (field, None))
        };
        match self.document.find_node(span.start, span.end)? {
            NodeRef::ModuleVariable(declaration) => Some((declaration, None)),
            NodeRef::Statement(statement @ Statement::VariableDeclaration(declaration)) => {
                Some((declaration, Some(statement)))
            }
            NodeRef::Class(class) => field(&class.fields),
            NodeRef::Service(service) => field(&service.fields),
            _ => None,
        }
    }
}
