use super::tree::*;
use crate::error::AnalysisError;
use crate::model::LinePosition;
use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    ModuleVariable,
    Listener,
    ClassField,
    LocalVariable,
    Parameter,
    Function,
    Class,
    Type,
}

/// A named symbol visible at some position.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub type_desc: Option<String>,
    pub declaration: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Client,
    Isolated,
    Readonly,
    Distinct,
    Service,
}

impl Qualifier {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "client" => Some(Qualifier::Client),
            "isolated" => Some(Qualifier::Isolated),
            "readonly" => Some(Qualifier::Readonly),
            "distinct" => Some(Qualifier::Distinct),
            "service" => Some(Qualifier::Service),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSymbol {
    /// `None` for classes declared in the analyzed document.
    pub org: Option<String>,
    pub module: Option<String>,
    pub name: String,
    pub qualifiers: Vec<Qualifier>,
}

impl ClassSymbol {
    pub fn is_client(&self) -> bool {
        self.qualifiers.contains(&Qualifier::Client)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSymbol {
    Builtin(String),
    Class(ClassSymbol),
    Record(String),
    Other(String),
    /// A named reference to another type descriptor.
    TypeReference {
        name: String,
        descriptor: Box<TypeSymbol>,
    },
}

impl TypeSymbol {
    /// The referenced class when it is a client class.
    pub fn client_class(&self) -> Option<&ClassSymbol> {
        match self {
            TypeSymbol::TypeReference { descriptor, .. } => descriptor.client_class(),
            TypeSymbol::Class(class) if class.is_client() => Some(class),
            _ => None,
        }
    }
}

/// Symbol and type queries over one document.
pub trait SemanticModel {
    /// Symbols in scope at `position`, outermost first.
    fn visible_symbols(&self, position: LinePosition) -> Vec<Symbol>;

    fn resolve_type(&self, type_desc: &str) -> Result<TypeSymbol, AnalysisError>;

    /// Parameter names of a module-level function, in declaration order.
    fn function_parameters(&self, name: &str) -> Option<Vec<String>>;
}

const BUILTIN_TYPES: [&str; 20] = [
    "int", "float", "decimal", "string", "boolean", "byte", "json", "xml", "anydata", "any",
    "error", "map", "table", "stream", "record", "object", "var", "handle", "never", "readonly",
];

/// Classes exported by external modules, keyed by `(org, module, name)`.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    classes: AHashMap<(String, String, String), Vec<Qualifier>>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index of the client classes of the common connector modules.
    pub fn with_defaults() -> Self {
        let mut index = Self::new();
        for (org, module, name) in [
            ("ballerina", "http", "Client"),
            ("ballerina", "websocket", "Client"),
            ("ballerina", "graphql", "Client"),
            ("ballerina", "email", "SmtpClient"),
            ("ballerina", "ftp", "Client"),
            ("ballerinax", "mysql", "Client"),
            ("ballerinax", "postgresql", "Client"),
            ("ballerinax", "redis", "Client"),
            ("ballerinax", "kafka", "Producer"),
        ] {
            index.register(org, module, name, vec![Qualifier::Client, Qualifier::Isolated]);
        }
        index.register("ballerina", "http", "Listener", vec![Qualifier::Isolated]);
        index
    }

    pub fn register(&mut self, org: &str, module: &str, name: &str, qualifiers: Vec<Qualifier>) {
        self.classes.insert(
            (org.to_string(), module.to_string(), name.to_string()),
            qualifiers,
        );
    }

    /// Registers a client class from an `org/module:Name` descriptor.
    /// Returns `false` when the descriptor is malformed.
    pub fn register_client(&mut self, descriptor: &str) -> bool {
        let parsed = descriptor
            .split_once('/')
            .and_then(|(org, rest)| rest.split_once(':').map(|(module, name)| (org, module, name)));
        match parsed {
            Some((org, module, name)) if !org.is_empty() && !module.is_empty() && !name.is_empty() => {
                self.register(org, module, name, vec![Qualifier::Client]);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, org: &str, module: &str, name: &str) -> Option<&[Qualifier]> {
        self.classes
            .get(&(org.to_string(), module.to_string(), name.to_string()))
            .map(Vec::as_slice)
    }
}

/// The [`SemanticModel`] of a parsed document.
pub struct DocumentModel<'a> {
    tree: &'a ModulePart,
    classes: &'a ClassIndex,
}

impl<'a> DocumentModel<'a> {
    pub fn new(tree: &'a ModulePart, classes: &'a ClassIndex) -> Self {
        Self { tree, classes }
    }

    fn function_locals(function: &FunctionDefinition, position: LinePosition, out: &mut Vec<Symbol>) {
        if !function.span.contains(position) {
            return;
        }
        out.extend(function.params.iter().map(|param| Symbol {
            name: param.name.clone(),
            kind: SymbolKind::Parameter,
            type_desc: Some(param.type_desc.clone()),
            declaration: function.span,
        }));
        Self::block_locals(&function.body, position, out);
    }

    fn block_locals(block: &Block, position: LinePosition, out: &mut Vec<Symbol>) {
        for statement in &block.statements {
            let span = statement.span();
            if span.end <= position {
                if let Statement::VariableDeclaration(decl) = statement {
                    out.push(declared_symbol(decl, SymbolKind::LocalVariable));
                }
            } else if span.contains(position) {
                match statement {
                    Statement::If(if_statement) => Self::if_locals(if_statement, position, out),
                    Statement::While(w) if w.body.span.contains(position) => {
                        Self::block_locals(&w.body, position, out)
                    }
                    _ => {}
                }
            }
        }
    }

    fn if_locals(if_statement: &IfStatement, position: LinePosition, out: &mut Vec<Symbol>) {
        if if_statement.then_block.span.contains(position) {
            Self::block_locals(&if_statement.then_block, position, out);
        }
        match &if_statement.else_body {
            Some(ElseBody::Block(block)) if block.span.contains(position) => {
                Self::block_locals(block, position, out)
            }
            Some(ElseBody::If(nested)) => {
                if let Statement::If(nested) = nested.as_ref() {
                    if nested.span.contains(position) {
                        Self::if_locals(nested, position, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn declared_symbol(decl: &VariableDeclaration, kind: SymbolKind) -> Symbol {
    Symbol {
        name: decl.name.clone(),
        kind,
        type_desc: Some(decl.type_desc.clone()),
        declaration: decl.span,
    }
}

impl SemanticModel for DocumentModel<'_> {
    fn visible_symbols(&self, position: LinePosition) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        for member in &self.tree.members {
            match member {
                ModuleMember::Variable(v) => {
                    let kind = if v.is_listener() {
                        SymbolKind::Listener
                    } else {
                        SymbolKind::ModuleVariable
                    };
                    symbols.push(declared_symbol(v, kind));
                }
                ModuleMember::Function(f) => symbols.push(Symbol {
                    name: f.name.clone(),
                    kind: SymbolKind::Function,
                    type_desc: None,
                    declaration: f.span,
                }),
                ModuleMember::Class(c) => symbols.push(Symbol {
                    name: c.name.clone(),
                    kind: SymbolKind::Class,
                    type_desc: None,
                    declaration: c.span,
                }),
                ModuleMember::Type(t) => symbols.push(Symbol {
                    name: t.name.clone(),
                    kind: SymbolKind::Type,
                    type_desc: None,
                    declaration: t.span,
                }),
                ModuleMember::Service(_) => {}
            }
        }

        // Object members come after module symbols so inner names shadow outer ones.
        for member in &self.tree.members {
            let (fields, functions) = match member {
                ModuleMember::Class(c) if c.span.contains(position) => (&c.fields, &c.functions),
                ModuleMember::Service(s) if s.span.contains(position) => {
                    (&s.fields, &s.functions)
                }
                ModuleMember::Function(f) => {
                    Self::function_locals(f, position, &mut symbols);
                    continue;
                }
                _ => continue,
            };
            symbols.extend(
                fields
                    .iter()
                    .map(|field| declared_symbol(field, SymbolKind::ClassField)),
            );
            for function in functions {
                Self::function_locals(function, position, &mut symbols);
            }
        }
        symbols
    }

    fn resolve_type(&self, type_desc: &str) -> Result<TypeSymbol, AnalysisError> {
        let type_desc = type_desc.trim();
        let unresolved = || AnalysisError::UnresolvedSymbol {
            name: type_desc.to_string(),
        };

        if let Some((prefix, name)) = type_desc.split_once(':') {
            let import = self
                .tree
                .imports
                .iter()
                .find(|import| import.prefix == prefix)
                .ok_or_else(unresolved)?;
            let org = import.org.clone().unwrap_or_else(|| "ballerina".to_string());
            let qualifiers = self
                .classes
                .lookup(&org, &import.module, name)
                .ok_or_else(unresolved)?;
            return Ok(TypeSymbol::TypeReference {
                name: type_desc.to_string(),
                descriptor: Box::new(TypeSymbol::Class(ClassSymbol {
                    org: Some(org),
                    module: Some(import.module.clone()),
                    name: name.to_string(),
                    qualifiers: qualifiers.to_vec(),
                })),
            });
        }

        if BUILTIN_TYPES.contains(&type_desc) {
            return Ok(TypeSymbol::Builtin(type_desc.to_string()));
        }

        for member in &self.tree.members {
            match member {
                ModuleMember::Class(class) if class.name == type_desc => {
                    return Ok(TypeSymbol::TypeReference {
                        name: type_desc.to_string(),
                        descriptor: Box::new(TypeSymbol::Class(ClassSymbol {
                            org: None,
                            module: None,
                            name: class.name.clone(),
                            qualifiers: class
                                .qualifiers
                                .iter()
                                .filter_map(|q| Qualifier::parse(q))
                                .collect(),
                        })),
                    });
                }
                ModuleMember::Type(definition) if definition.name == type_desc => {
                    let descriptor = match &definition.descriptor {
                        TypeDescriptor::Record(_) => TypeSymbol::Record(definition.name.clone()),
                        _ => TypeSymbol::Other(definition.name.clone()),
                    };
                    return Ok(TypeSymbol::TypeReference {
                        name: type_desc.to_string(),
                        descriptor: Box::new(descriptor),
                    });
                }
                _ => {}
            }
        }
        Err(unresolved())
    }

    fn function_parameters(&self, name: &str) -> Option<Vec<String>> {
        self.tree.members.iter().find_map(|member| match member {
            ModuleMember::Function(f) if f.name == name => {
                Some(f.params.iter().map(|p| p.name.clone()).collect())
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    const SOURCE: &str = "import ballerina/http;\n\
        final http:Client api = check new (\"http://x\");\n\
        client class Local { }\n\
        function main(int n) {\n\
            int a = 1;\n\
            int b = 2;\n\
        }\n";

    #[test]
    fn resolves_external_and_local_clients() {
        let tree = parse(SOURCE).unwrap();
        let classes = ClassIndex::with_defaults();
        let model = DocumentModel::new(&tree, &classes);

        let http = model.resolve_type("http:Client").unwrap();
        assert_eq!(http.client_class().unwrap().module.as_deref(), Some("http"));
        assert!(model.resolve_type("Local").unwrap().client_class().is_some());
        assert!(model.resolve_type("int").unwrap().client_class().is_none());
        assert!(model.resolve_type("foo:Bar").is_err());
    }

    #[test]
    fn locals_are_visible_after_their_declaration() {
        let tree = parse(SOURCE).unwrap();
        let classes = ClassIndex::with_defaults();
        let model = DocumentModel::new(&tree, &classes);

        // Line 5 holds `int b = 2;`; only `a` is declared before it.
        let names: Vec<String> = model
            .visible_symbols(LinePosition::new(5, 0))
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert!(names.contains(&"api".to_string()));
        assert!(names.contains(&"n".to_string()));
        assert!(names.contains(&"a".to_string()));
        assert!(!names.contains(&"b".to_string()));
    }

    #[test]
    fn registers_client_descriptors() {
        let mut index = ClassIndex::new();
        assert!(index.register_client("acme/crm:Client"));
        assert!(!index.register_client("broken"));
        assert_eq!(index.lookup("acme", "crm", "Client"), Some(&[Qualifier::Client][..]));
    }
}
