use crate::model::{LinePosition, LineRange};

/// Source extent of a syntax node, as positions and byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: LinePosition,
    pub end: LinePosition,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl Span {
    /// The span from the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            start_offset: self.start_offset,
            end_offset: other.end_offset,
        }
    }

    pub fn covers(&self, start_offset: usize, end_offset: usize) -> bool {
        self.start_offset <= start_offset && end_offset <= self.end_offset
    }

    pub fn contains(&self, position: LinePosition) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn line_range(&self, file_name: &str) -> LineRange {
        LineRange::new(file_name, self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModulePart {
    pub imports: Vec<ImportDeclaration>,
    pub members: Vec<ModuleMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDeclaration {
    pub org: Option<String>,
    pub module: String,
    pub prefix: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleMember {
    Function(FunctionDefinition),
    Variable(VariableDeclaration),
    Service(ServiceDeclaration),
    Class(ClassDefinition),
    Type(TypeDefinition),
}

impl ModuleMember {
    pub fn span(&self) -> Span {
        match self {
            ModuleMember::Function(f) => f.span,
            ModuleMember::Variable(v) => v.span,
            ModuleMember::Service(s) => s.span,
            ModuleMember::Class(c) => c.span,
            ModuleMember::Type(t) => t.span,
        }
    }
}

/// A variable declaration at any level: module, object field or local.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub annotations: Vec<String>,
    pub qualifiers: Vec<String>,
    /// Empty for `const NAME = ...` without an explicit type.
    pub type_desc: String,
    pub name: String,
    pub initializer: Option<Expression>,
    pub span: Span,
}

impl VariableDeclaration {
    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.qualifiers.iter().any(|q| q == qualifier)
    }

    pub fn is_final(&self) -> bool {
        self.has_qualifier("final")
    }

    pub fn is_listener(&self) -> bool {
        self.has_qualifier("listener")
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionKind {
    Plain,
    Remote,
    Resource { accessor: String, path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub qualifiers: Vec<String>,
    pub kind: FunctionKind,
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_type: Option<String>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub type_desc: String,
    pub name: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDeclaration {
    pub base_path: String,
    pub listener: String,
    pub fields: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub qualifiers: Vec<String>,
    pub name: String,
    pub fields: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
    pub span: Span,
}

impl ClassDefinition {
    pub fn is_client(&self) -> bool {
        self.qualifiers.iter().any(|q| q == "client")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub is_public: bool,
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Record(RecordType),
    Enum(Vec<String>),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordType {
    pub closed: bool,
    pub fields: Vec<RecordField>,
    pub inclusions: Vec<String>,
    /// The rest descriptor of an open record, e.g. `json...`.
    pub rest: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub type_desc: String,
    pub name: String,
    pub optional: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    Assignment(Assignment),
    If(IfStatement),
    While(WhileStatement),
    Return(ExitStatement),
    Fail(ExitStatement),
    Panic(ExitStatement),
    Break(Span),
    Continue(Span),
    Expression(ExpressionStatement),
    /// A statement form the flow model has no node for (`foreach`, `match`, `lock`
    /// and friends), kept only as its span.
    Unsupported(UnsupportedStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::VariableDeclaration(d) => d.span,
            Statement::Assignment(a) => a.span,
            Statement::If(i) => i.span,
            Statement::While(w) => w.span,
            Statement::Return(e) | Statement::Fail(e) | Statement::Panic(e) => e.span,
            Statement::Break(span) | Statement::Continue(span) => *span,
            Statement::Expression(e) => e.span,
            Statement::Unsupported(u) => u.span,
        }
    }

    /// A short name of the statement form, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::VariableDeclaration(_) => "a variable declaration",
            Statement::Assignment(_) => "an assignment",
            Statement::If(_) => "an if statement",
            Statement::While(_) => "a while statement",
            Statement::Return(_) => "a return statement",
            Statement::Fail(_) => "a fail statement",
            Statement::Panic(_) => "a panic statement",
            Statement::Break(_) => "a break statement",
            Statement::Continue(_) => "a continue statement",
            Statement::Expression(_) => "an expression statement",
            Statement::Unsupported(_) => "an unsupported statement",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedStatement {
    /// The leading keyword, or `block` for a bare `{ ... }`.
    pub construct: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: String,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: Block,
    pub else_body: Option<ElseBody>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBody {
    Block(Block),
    /// An `else if`; the boxed statement is always a [`Statement::If`].
    If(Box<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitStatement {
    pub expression: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expression,
    pub span: Span,
}

/// An expression, kept as source text plus the shape the flow model cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Check {
        panics: bool,
        expression: Box<Expression>,
    },
    New {
        type_desc: Option<String>,
        arguments: Vec<Argument>,
    },
    RemoteCall {
        client: String,
        method: String,
        arguments: Vec<Argument>,
    },
    FunctionCall {
        prefix: Option<String>,
        name: String,
        arguments: Vec<Argument>,
    },
    Name(String),
    Literal,
    Other,
}

impl Expression {
    /// Strips one `check`/`checkpanic` wrapper, reporting whether there was one.
    pub fn unwrap_check(&self) -> (&Expression, bool) {
        match &self.kind {
            ExpressionKind::Check { expression, .. } => (expression, true),
            _ => (self, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expression),
    Named { name: String, value: Expression },
}

impl Argument {
    /// The argument as written, `name = value` for named ones.
    pub fn to_source(&self) -> String {
        match self {
            Argument::Positional(value) => value.text.clone(),
            Argument::Named { name, value } => format!("{} = {}", name, value.text),
        }
    }
}

/// A borrowed reference to any node a range lookup can land on.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'t> {
    Module(&'t ModulePart),
    Function(&'t FunctionDefinition),
    Service(&'t ServiceDeclaration),
    Class(&'t ClassDefinition),
    ModuleVariable(&'t VariableDeclaration),
    Block(&'t Block),
    Statement(&'t Statement),
}

impl<'t> NodeRef<'t> {
    pub fn span(&self) -> Span {
        match self {
            NodeRef::Module(m) => m.span,
            NodeRef::Function(f) => f.span,
            NodeRef::Service(s) => s.span,
            NodeRef::Class(c) => c.span,
            NodeRef::ModuleVariable(v) => v.span,
            NodeRef::Block(b) => b.span,
            NodeRef::Statement(s) => s.span(),
        }
    }

    pub fn children(&self) -> Vec<NodeRef<'t>> {
        match *self {
            NodeRef::Module(module) => module
                .members
                .iter()
                .filter_map(|member| match member {
                    ModuleMember::Function(f) => Some(NodeRef::Function(f)),
                    ModuleMember::Variable(v) => Some(NodeRef::ModuleVariable(v)),
                    ModuleMember::Service(s) => Some(NodeRef::Service(s)),
                    ModuleMember::Class(c) => Some(NodeRef::Class(c)),
                    ModuleMember::Type(_) => None,
                })
                .collect(),
            NodeRef::Function(f) => vec![NodeRef::Block(&f.body)],
            NodeRef::Service(s) => s.functions.iter().map(NodeRef::Function).collect(),
            NodeRef::Class(c) => c.functions.iter().map(NodeRef::Function).collect(),
            NodeRef::ModuleVariable(_) => Vec::new(),
            NodeRef::Block(b) => b.statements.iter().map(NodeRef::Statement).collect(),
            NodeRef::Statement(Statement::If(if_statement)) => {
                let mut children = vec![NodeRef::Block(&if_statement.then_block)];
                match &if_statement.else_body {
                    Some(ElseBody::Block(block)) => children.push(NodeRef::Block(block)),
                    Some(ElseBody::If(statement)) => children.push(NodeRef::Statement(statement)),
                    None => {}
                }
                children
            }
            NodeRef::Statement(Statement::While(w)) => vec![NodeRef::Block(&w.body)],
            NodeRef::Statement(_) => Vec::new(),
        }
    }
}
