use super::lexer::{Token, TokenKind, tokenize};
use super::text::LineIndex;
use super::tree::*;
use crate::error::ParseError;

const MEMBER_QUALIFIERS: [&str; 10] = [
    "public",
    "private",
    "isolated",
    "final",
    "configurable",
    "listener",
    "client",
    "remote",
    "resource",
    "transactional",
];

const UNSUPPORTED_STATEMENTS: [&str; 9] = [
    "foreach",
    "match",
    "do",
    "lock",
    "transaction",
    "retry",
    "fork",
    "worker",
    "rollback",
];

// Words that can never end a type descriptor on the left of a declaration.
const EXPRESSION_WORDS: [&str; 8] = [
    "check",
    "checkpanic",
    "new",
    "start",
    "wait",
    "trap",
    "typeof",
    "from",
];

/// Parses a whole source document into a [`ModulePart`].
pub fn parse(source: &str) -> Result<ModulePart, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).module_part()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token<'s>>,
    pos: usize,
    index: LineIndex,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, tokens: Vec<Token<'s>>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            index: LineIndex::new(source),
        }
    }

    // --- Token cursor -------------------------------------------------------

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token<'s>, ParseError> {
        match self.peek() {
            Some(token) if token.is(text) => {
                let token = *token;
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error_here(&format!("'{}'", text))),
        }
    }

    fn expect_ident(&mut self) -> Result<Token<'s>, ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                let token = *token;
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error_here("an identifier")),
        }
    }

    fn error_here(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                line: token.span.start.line,
                column: token.span.start.offset,
                found: token.text.to_string(),
                expected: expected.to_string(),
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn unsupported(&self, construct: &str) -> ParseError {
        let (line, column) = self
            .peek()
            .map(|t| (t.span.start.line, t.span.start.offset))
            .unwrap_or_default();
        ParseError::UnsupportedSyntax {
            line,
            column,
            construct: construct.to_string(),
        }
    }

    /// The span from token `start` up to the last consumed token.
    fn span_from(&self, start: usize) -> Span {
        let first = self.tokens[start.min(self.tokens.len() - 1)].span;
        let last = self.tokens[self.pos.saturating_sub(1).max(start)].span;
        first.to(last)
    }

    /// Source text covered by tokens `[from, to)`.
    fn text(&self, from: usize, to: usize) -> String {
        if from >= to {
            return String::new();
        }
        let start = self.tokens[from].span.start_offset;
        let end = self.tokens[to - 1].span.end_offset;
        self.source[start..end].to_string()
    }

    /// Finds the first token in `[from, to)` equal to `text` at bracket depth zero.
    /// A closing bracket at depth zero ends the search.
    fn find_at_depth0(&self, from: usize, to: usize, text: &str) -> Option<usize> {
        let mut depth = 0usize;
        for i in from..to.min(self.tokens.len()) {
            let token = &self.tokens[i];
            if depth == 0 && token.is(text) {
                return Some(i);
            }
            if token.is_opener() {
                depth += 1;
            } else if token.is_closer() {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
        }
        None
    }

    fn find_statement_end(&self) -> Result<usize, ParseError> {
        self.find_at_depth0(self.pos, self.tokens.len(), ";")
            .ok_or_else(|| self.error_here("';'"))
    }

    /// Skips a balanced bracket group starting at the current token.
    fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if token.is_opener() {
                depth += 1;
            } else if token.is_closer() {
                depth = depth.saturating_sub(1);
            }
            self.pos += 1;
            if depth == 0 {
                return Ok(());
            }
        }
        Err(self.error_here("a closing bracket"))
    }

    // --- Module level -------------------------------------------------------

    fn module_part(mut self) -> Result<ModulePart, ParseError> {
        let mut imports = Vec::new();
        let mut members = Vec::new();
        while self.peek().is_some() {
            if self.at("import") {
                imports.push(self.import_declaration()?);
            } else if self.eat(";") {
                continue;
            } else {
                members.push(self.module_member()?);
            }
        }
        Ok(ModulePart {
            imports,
            members,
            span: self.index.span(0, self.source.len()),
        })
    }

    fn import_declaration(&mut self) -> Result<ImportDeclaration, ParseError> {
        let start = self.pos;
        self.expect("import")?;
        let first = self.expect_ident()?.text.to_string();
        let (org, mut module) = if self.eat("/") {
            (Some(first), self.expect_ident()?.text.to_string())
        } else {
            (None, first)
        };
        while self.eat(".") {
            module.push('.');
            module.push_str(self.expect_ident()?.text);
        }
        let prefix = if self.eat("as") {
            self.expect_ident()?.text.to_string()
        } else {
            module.rsplit('.').next().unwrap_or(&module).to_string()
        };
        self.expect(";")?;
        Ok(ImportDeclaration {
            org,
            module,
            prefix,
            span: self.span_from(start),
        })
    }

    fn annotations(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        while self.eat("@") {
            let mut name = self.expect_ident()?.text.to_string();
            if self.eat(":") {
                name.push(':');
                name.push_str(self.expect_ident()?.text);
            }
            if self.at("{") {
                self.skip_balanced()?;
            }
            names.push(name);
        }
        Ok(names)
    }

    fn qualifiers(&mut self) -> Vec<String> {
        let mut qualifiers = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Ident && MEMBER_QUALIFIERS.contains(&token.text) {
                qualifiers.push(token.text.to_string());
                self.pos += 1;
            } else {
                break;
            }
        }
        qualifiers
    }

    fn module_member(&mut self) -> Result<ModuleMember, ParseError> {
        let start = self.pos;
        let annotations = self.annotations()?;
        let mut qualifiers = self.qualifiers();
        let Some(token) = self.peek().copied() else {
            return Err(self.error_here("a module member"));
        };
        match token.text {
            "function" => Ok(ModuleMember::Function(
                self.function_definition(start, qualifiers)?,
            )),
            "service" => Ok(ModuleMember::Service(self.service_declaration(start)?)),
            "class" => Ok(ModuleMember::Class(
                self.class_definition(start, qualifiers)?,
            )),
            "type" => Ok(ModuleMember::Type(self.type_definition(start, &qualifiers)?)),
            "enum" => Ok(ModuleMember::Type(self.enum_definition(start, &qualifiers)?)),
            "const" => {
                self.pos += 1;
                qualifiers.push("const".to_string());
                Ok(ModuleMember::Variable(self.variable_declaration(
                    start,
                    annotations,
                    qualifiers,
                )?))
            }
            "annotation" | "xmlns" => Err(self.unsupported(token.text)),
            _ => Ok(ModuleMember::Variable(self.variable_declaration(
                start,
                annotations,
                qualifiers,
            )?)),
        }
    }

    fn function_definition(
        &mut self,
        start: usize,
        qualifiers: Vec<String>,
    ) -> Result<FunctionDefinition, ParseError> {
        self.expect("function")?;
        let has = |q: &str| qualifiers.iter().any(|x| x == q);
        let (kind, name) = if has("resource") {
            let accessor = self.expect_ident()?.text.to_string();
            let open = self
                .find_at_depth0(self.pos, self.tokens.len(), "(")
                .ok_or_else(|| self.error_here("'('"))?;
            let path = self.text(self.pos, open);
            self.pos = open;
            let name = format!("{} {}", accessor, path);
            (FunctionKind::Resource { accessor, path }, name)
        } else {
            let name = self.expect_ident()?.text.to_string();
            let kind = if has("remote") {
                FunctionKind::Remote
            } else {
                FunctionKind::Plain
            };
            (kind, name)
        };

        let params = self.parameters()?;
        let return_type = if self.eat("returns") {
            self.annotations()?;
            let open = self
                .find_at_depth0(self.pos, self.tokens.len(), "{")
                .ok_or_else(|| self.error_here("'{'"))?;
            let text = self.text(self.pos, open);
            self.pos = open;
            Some(text)
        } else {
            None
        };

        if self.at("=") {
            return Err(self.unsupported("external function body"));
        }
        let body = self.block()?;
        Ok(FunctionDefinition {
            qualifiers,
            kind,
            name,
            params,
            return_type,
            body,
            span: self.span_from(start),
        })
    }

    fn parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        self.expect("(")?;
        let close = self
            .find_at_depth0(self.pos, self.tokens.len(), ")")
            .ok_or_else(|| self.error_here("')'"))?;

        let mut params = Vec::new();
        let mut group_start = self.pos;
        while group_start < close {
            let group_end = self
                .find_at_depth0(group_start, close, ",")
                .unwrap_or(close);
            if let Some(param) = self.parameter(group_start, group_end) {
                params.push(param);
            }
            group_start = group_end + 1;
        }
        self.pos = close + 1;
        Ok(params)
    }

    fn parameter(&self, mut from: usize, to: usize) -> Option<Parameter> {
        // Drop leading annotations.
        while from < to && self.tokens[from].is("@") {
            from += 2;
            if from < to && self.tokens[from].is("{") {
                let mut depth = 0usize;
                while from < to {
                    let token = &self.tokens[from];
                    from += 1;
                    if token.is_opener() {
                        depth += 1;
                    } else if token.is_closer() {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                }
            }
        }
        let eq = self.find_at_depth0(from, to, "=");
        let lhs_end = eq.unwrap_or(to);
        if lhs_end <= from {
            return None;
        }
        let name_token = &self.tokens[lhs_end - 1];
        Some(Parameter {
            type_desc: self.text(from, lhs_end - 1),
            name: name_token.text.to_string(),
            default: eq.map(|eq| self.text(eq + 1, to)),
        })
    }

    fn service_declaration(&mut self, start: usize) -> Result<ServiceDeclaration, ParseError> {
        self.expect("service")?;
        let on = self
            .find_at_depth0(self.pos, self.tokens.len(), "on")
            .ok_or_else(|| self.error_here("'on'"))?;
        let base_path = match self.text(self.pos, on) {
            path if path.is_empty() => "/".to_string(),
            path => path,
        };
        self.pos = on + 1;
        let open = self
            .find_at_depth0(self.pos, self.tokens.len(), "{")
            .ok_or_else(|| self.error_here("'{'"))?;
        let listener = self.text(self.pos, open);
        self.pos = open;

        let (fields, functions) = self.object_body()?;
        self.eat(";");
        Ok(ServiceDeclaration {
            base_path,
            listener,
            fields,
            functions,
            span: self.span_from(start),
        })
    }

    fn class_definition(
        &mut self,
        start: usize,
        qualifiers: Vec<String>,
    ) -> Result<ClassDefinition, ParseError> {
        self.expect("class")?;
        let name = self.expect_ident()?.text.to_string();
        let (fields, functions) = self.object_body()?;
        Ok(ClassDefinition {
            qualifiers,
            name,
            fields,
            functions,
            span: self.span_from(start),
        })
    }

    fn object_body(
        &mut self,
    ) -> Result<(Vec<VariableDeclaration>, Vec<FunctionDefinition>), ParseError> {
        self.expect("{")?;
        let mut fields = Vec::new();
        let mut functions = Vec::new();
        while !self.at("}") {
            if self.peek().is_none() {
                return Err(self.error_here("'}'"));
            }
            let start = self.pos;
            let annotations = self.annotations()?;
            let qualifiers = self.qualifiers();
            if self.at("function") {
                functions.push(self.function_definition(start, qualifiers)?);
            } else if self.at("*") {
                // Type inclusion, e.g. `*http:Service;`.
                self.pos = self.find_statement_end()? + 1;
            } else {
                fields.push(self.variable_declaration(start, annotations, qualifiers)?);
            }
        }
        self.expect("}")?;
        Ok((fields, functions))
    }

    fn type_definition(
        &mut self,
        start: usize,
        qualifiers: &[String],
    ) -> Result<TypeDefinition, ParseError> {
        self.expect("type")?;
        let name = self.expect_ident()?.text.to_string();
        let descriptor = if self.at("record") {
            TypeDescriptor::Record(self.record_type()?)
        } else {
            let end = self.find_statement_end()?;
            let text = self.text(self.pos, end);
            self.pos = end;
            TypeDescriptor::Other(text)
        };
        self.expect(";")?;
        Ok(TypeDefinition {
            is_public: qualifiers.iter().any(|q| q == "public"),
            name,
            descriptor,
            span: self.span_from(start),
        })
    }

    fn record_type(&mut self) -> Result<RecordType, ParseError> {
        self.expect("record")?;
        let closed = self.eat("{|");
        let closer = if closed {
            "|}"
        } else {
            self.expect("{")?;
            "}"
        };

        let mut record = RecordType {
            closed,
            ..RecordType::default()
        };
        while !self.at(closer) {
            if self.peek().is_none() {
                return Err(self.error_here(&format!("'{}'", closer)));
            }
            let end = self.find_statement_end()?;
            if self.eat("*") {
                record.inclusions.push(self.text(self.pos, end));
                self.pos = end + 1;
                continue;
            }
            self.annotations()?;
            let from = self.pos;
            let eq = self.find_at_depth0(from, end, "=");
            let mut lhs_end = eq.unwrap_or(end);
            let optional = lhs_end > from && self.tokens[lhs_end - 1].is("?");
            if optional {
                lhs_end -= 1;
            }
            let last = lhs_end.checked_sub(1).map(|i| self.tokens[i]);
            match last {
                Some(token) if token.kind == TokenKind::Ident && lhs_end - 1 > from => {
                    record.fields.push(RecordField {
                        type_desc: self.text(from, lhs_end - 1),
                        name: token.text.to_string(),
                        optional,
                        default: eq.map(|eq| self.text(eq + 1, end)),
                    });
                }
                _ => record.rest = Some(self.text(from, end)),
            }
            self.pos = end + 1;
        }
        self.expect(closer)?;
        Ok(record)
    }

    fn enum_definition(
        &mut self,
        start: usize,
        qualifiers: &[String],
    ) -> Result<TypeDefinition, ParseError> {
        self.expect("enum")?;
        let name = self.expect_ident()?.text.to_string();
        self.expect("{")?;
        let close = self
            .find_at_depth0(self.pos, self.tokens.len(), "}")
            .ok_or_else(|| self.error_here("'}'"))?;
        let mut members = Vec::new();
        let mut member_start = self.pos;
        while member_start < close {
            let end = self.find_at_depth0(member_start, close, ",").unwrap_or(close);
            if end > member_start {
                members.push(self.text(member_start, end));
            }
            member_start = end + 1;
        }
        self.pos = close;
        self.expect("}")?;
        Ok(TypeDefinition {
            is_public: qualifiers.iter().any(|q| q == "public"),
            name,
            descriptor: TypeDescriptor::Enum(members),
            span: self.span_from(start),
        })
    }

    /// Parses `[type] name [= expr];` from the current token. `start` is the first
    /// token of the declaration, annotations and qualifiers included.
    fn variable_declaration(
        &mut self,
        start: usize,
        annotations: Vec<String>,
        qualifiers: Vec<String>,
    ) -> Result<VariableDeclaration, ParseError> {
        let end = self.find_statement_end()?;
        let eq = self.find_at_depth0(self.pos, end, "=");
        let lhs_end = eq.unwrap_or(end);
        if lhs_end <= self.pos || self.tokens[lhs_end - 1].kind != TokenKind::Ident {
            return Err(self.error_here("a variable declaration"));
        }
        let type_desc = self.text(self.pos, lhs_end - 1);
        let name = self.tokens[lhs_end - 1].text.to_string();
        let initializer = match eq {
            Some(eq) => Some(self.expression(eq + 1, end)?),
            None => None,
        };
        self.pos = end + 1;
        Ok(VariableDeclaration {
            annotations,
            qualifiers,
            type_desc,
            name,
            initializer,
            span: self.span_from(start),
        })
    }

    // --- Statements ---------------------------------------------------------

    fn block(&mut self) -> Result<Block, ParseError> {
        let start = self.pos;
        self.expect("{")?;
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.peek().is_none() {
                return Err(self.error_here("'}'"));
            }
            statements.push(self.statement()?);
        }
        self.expect("}")?;
        Ok(Block {
            statements,
            span: self.span_from(start),
        })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.pos;
        let Some(token) = self.peek().copied() else {
            return Err(self.error_here("a statement"));
        };
        if token.kind == TokenKind::Ident && UNSUPPORTED_STATEMENTS.contains(&token.text) {
            return self.unsupported_statement(start, token.text);
        }
        match token.text {
            "if" if token.kind == TokenKind::Ident => Ok(Statement::If(self.if_statement()?)),
            "while" if token.kind == TokenKind::Ident => {
                self.pos += 1;
                let condition = self.condition()?;
                let body = self.block()?;
                Ok(Statement::While(WhileStatement {
                    condition,
                    body,
                    span: self.span_from(start),
                }))
            }
            "return" | "fail" | "panic" if token.kind == TokenKind::Ident => {
                self.pos += 1;
                let end = self.find_statement_end()?;
                let expression = if end > self.pos {
                    Some(self.expression(self.pos, end)?)
                } else {
                    None
                };
                self.pos = end + 1;
                let exit = ExitStatement {
                    expression,
                    span: self.span_from(start),
                };
                match token.text {
                    "return" => Ok(Statement::Return(exit)),
                    "fail" => Ok(Statement::Fail(exit)),
                    _ if exit.expression.is_none() => Err(ParseError::UnexpectedToken {
                        line: token.span.start.line,
                        column: token.span.start.offset,
                        found: ";".to_string(),
                        expected: "a panic expression".to_string(),
                    }),
                    _ => Ok(Statement::Panic(exit)),
                }
            }
            "break" | "continue" if token.kind == TokenKind::Ident => {
                self.pos += 1;
                self.expect(";")?;
                let span = self.span_from(start);
                Ok(if token.text == "break" {
                    Statement::Break(span)
                } else {
                    Statement::Continue(span)
                })
            }
            "{" => self.unsupported_statement(start, "block"),
            "@" | "final" => {
                let annotations = self.annotations()?;
                let mut qualifiers = Vec::new();
                if self.eat("final") {
                    qualifiers.push("final".to_string());
                }
                Ok(Statement::VariableDeclaration(self.variable_declaration(
                    start,
                    annotations,
                    qualifiers,
                )?))
            }
            _ => self.simple_statement(start),
        }
    }

    /// Skips a statement the tree has no shape for. It ends at a `;` or at the
    /// brace closing its last top-level block, unless an `on fail` clause follows.
    fn unsupported_statement(
        &mut self,
        start: usize,
        construct: &str,
    ) -> Result<Statement, ParseError> {
        let mut depth = 0usize;
        loop {
            let Some(token) = self.peek().copied() else {
                return Err(self.error_here("the end of the statement"));
            };
            self.pos += 1;
            if token.is_opener() {
                depth += 1;
            } else if token.is_closer() {
                if depth == 0 {
                    return Err(ParseError::UnexpectedToken {
                        line: token.span.start.line,
                        column: token.span.start.offset,
                        found: token.text.to_string(),
                        expected: "a statement".to_string(),
                    });
                }
                depth -= 1;
                if depth == 0 && token.is("}") && !self.at("on") {
                    break;
                }
            } else if depth == 0 && token.is(";") {
                break;
            }
        }
        Ok(Statement::Unsupported(UnsupportedStatement {
            construct: construct.to_string(),
            span: self.span_from(start),
        }))
    }

    fn condition(&mut self) -> Result<Expression, ParseError> {
        let open = self
            .find_at_depth0(self.pos, self.tokens.len(), "{")
            .ok_or_else(|| self.error_here("'{'"))?;
        let condition = self.expression(self.pos, open)?;
        self.pos = open;
        Ok(condition)
    }

    fn if_statement(&mut self) -> Result<IfStatement, ParseError> {
        let start = self.pos;
        self.expect("if")?;
        let condition = self.condition()?;
        let then_block = self.block()?;
        let else_body = if self.eat("else") {
            if self.at("if") {
                Some(ElseBody::If(Box::new(Statement::If(self.if_statement()?))))
            } else {
                Some(ElseBody::Block(self.block()?))
            }
        } else {
            None
        };
        Ok(IfStatement {
            condition,
            then_block,
            else_body,
            span: self.span_from(start),
        })
    }

    /// Declarations, assignments and expression statements.
    fn simple_statement(&mut self, start: usize) -> Result<Statement, ParseError> {
        let end = self.find_statement_end()?;
        let eq = self.find_at_depth0(self.pos, end, "=");
        let lhs_end = eq.unwrap_or(end);

        if self.looks_like_declaration(self.pos, lhs_end) {
            return Ok(Statement::VariableDeclaration(self.variable_declaration(
                start,
                Vec::new(),
                Vec::new(),
            )?));
        }

        if let Some(eq) = eq {
            if eq == self.pos {
                return Err(self.error_here("an assignment target"));
            }
            let target = self.text(self.pos, eq);
            let value = self.expression(eq + 1, end)?;
            self.pos = end + 1;
            return Ok(Statement::Assignment(Assignment {
                target,
                value,
                span: self.span_from(start),
            }));
        }

        let expression = self.expression(self.pos, end)?;
        self.pos = end + 1;
        Ok(Statement::Expression(ExpressionStatement {
            expression,
            span: self.span_from(start),
        }))
    }

    /// `T name` shapes: the last token is a plain identifier preceded by the end of a
    /// type descriptor.
    fn looks_like_declaration(&self, from: usize, to: usize) -> bool {
        if to < from + 2 {
            return false;
        }
        let first = &self.tokens[from];
        let name = &self.tokens[to - 1];
        let before = &self.tokens[to - 2];
        if first.kind == TokenKind::Ident && EXPRESSION_WORDS.contains(&first.text) {
            return false;
        }
        if name.kind != TokenKind::Ident {
            return false;
        }
        match before.kind {
            TokenKind::Ident => !EXPRESSION_WORDS.contains(&before.text),
            TokenKind::Punct => matches!(before.text, ">" | "]" | "?" | "|}"),
            _ => false,
        }
    }

    // --- Expressions --------------------------------------------------------

    fn expression(&self, from: usize, to: usize) -> Result<Expression, ParseError> {
        if from >= to {
            return Err(match self.tokens.get(from) {
                Some(token) => ParseError::UnexpectedToken {
                    line: token.span.start.line,
                    column: token.span.start.offset,
                    found: token.text.to_string(),
                    expected: "an expression".to_string(),
                },
                None => ParseError::UnexpectedEof {
                    expected: "an expression".to_string(),
                },
            });
        }
        Ok(self.classify(from, to))
    }

    fn classify(&self, from: usize, to: usize) -> Expression {
        let span = self.tokens[from].span.to(self.tokens[to - 1].span);
        let text = self.text(from, to);
        let first = &self.tokens[from];
        let len = to - from;

        let kind = if len > 1 && first.kind == TokenKind::Ident && matches!(first.text, "check" | "checkpanic") {
            ExpressionKind::Check {
                panics: first.text == "checkpanic",
                expression: Box::new(self.classify(from + 1, to)),
            }
        } else if first.is("new") && first.kind == TokenKind::Ident {
            self.new_expression(from + 1, to)
        } else if let Some(call) = self.call_expression(from, to) {
            call
        } else if len == 1 {
            match first.kind {
                TokenKind::Ident if matches!(first.text, "true" | "false" | "null") => {
                    ExpressionKind::Literal
                }
                TokenKind::Ident => ExpressionKind::Name(first.text.to_string()),
                _ => ExpressionKind::Literal,
            }
        } else if len == 2 && first.is("(") && self.tokens[from + 1].is(")") {
            ExpressionKind::Literal
        } else {
            ExpressionKind::Other
        };

        Expression { kind, text, span }
    }

    fn new_expression(&self, from: usize, to: usize) -> ExpressionKind {
        if from >= to {
            return ExpressionKind::New {
                type_desc: None,
                arguments: Vec::new(),
            };
        }
        match self.matching_open(from, to) {
            Some(open) => ExpressionKind::New {
                type_desc: (open > from).then(|| self.text(from, open)),
                arguments: self.arguments(open + 1, to - 1),
            },
            None => ExpressionKind::New {
                type_desc: Some(self.text(from, to)),
                arguments: Vec::new(),
            },
        }
    }

    /// `f(..)`, `m:f(..)` and `a.b->f(..)`.
    fn call_expression(&self, from: usize, to: usize) -> Option<ExpressionKind> {
        let open = self.matching_open(from, to)?;
        if open == from {
            return None;
        }
        let name = &self.tokens[open - 1];
        if name.kind != TokenKind::Ident {
            return None;
        }
        let arguments = self.arguments(open + 1, to - 1);
        let head = open - 1 - from;
        match head {
            0 => Some(ExpressionKind::FunctionCall {
                prefix: None,
                name: name.text.to_string(),
                arguments,
            }),
            2 if self.tokens[from + 1].is(":") && self.tokens[from].kind == TokenKind::Ident => {
                Some(ExpressionKind::FunctionCall {
                    prefix: Some(self.tokens[from].text.to_string()),
                    name: name.text.to_string(),
                    arguments,
                })
            }
            _ if self.tokens[open - 2].is("->") => {
                let client_end = open - 2;
                let is_path = (from..client_end).all(|i| {
                    let token = &self.tokens[i];
                    if (i - from) % 2 == 0 {
                        token.kind == TokenKind::Ident
                    } else {
                        token.is(".")
                    }
                });
                (is_path && (client_end - from) % 2 == 1).then(|| ExpressionKind::RemoteCall {
                    client: self.text(from, client_end),
                    method: name.text.to_string(),
                    arguments,
                })
            }
            _ => None,
        }
    }

    /// When the last token in `[from, to)` is `)`, the index of its matching `(`.
    fn matching_open(&self, from: usize, to: usize) -> Option<usize> {
        if to <= from || !self.tokens[to - 1].is(")") {
            return None;
        }
        let mut depth = 0usize;
        for i in (from..to).rev() {
            let token = &self.tokens[i];
            if token.is_closer() {
                depth += 1;
            } else if token.is_opener() {
                depth -= 1;
                if depth == 0 {
                    return token.is("(").then_some(i);
                }
            }
        }
        None
    }

    fn arguments(&self, from: usize, to: usize) -> Vec<Argument> {
        let mut arguments = Vec::new();
        let mut group_start = from;
        while group_start < to {
            let group_end = self.find_at_depth0(group_start, to, ",").unwrap_or(to);
            if group_end > group_start {
                let named = group_end - group_start > 2
                    && self.tokens[group_start].kind == TokenKind::Ident
                    && self.tokens[group_start + 1].is("=");
                arguments.push(if named {
                    Argument::Named {
                        name: self.tokens[group_start].text.to_string(),
                        value: self.classify(group_start + 2, group_end),
                    }
                } else {
                    Argument::Positional(self.classify(group_start, group_end))
                });
            }
            group_start = group_end + 1;
        }
        arguments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_statement(body: &str) -> Statement {
        let source = format!("function main() {{\n{}\n}}", body);
        let module = parse(&source).unwrap();
        match &module.members[0] {
            ModuleMember::Function(f) => f.body.statements[0].clone(),
            other => panic!("unexpected member {:?}", other),
        }
    }

    #[test]
    fn declaration_with_checked_remote_call() {
        let Statement::VariableDeclaration(decl) =
            first_statement("json res = check self.cl->get(\"/a\", headers = h);")
        else {
            panic!("expected a declaration");
        };
        assert_eq!(decl.type_desc, "json");
        assert_eq!(decl.name, "res");
        let (inner, checked) = decl.initializer.as_ref().unwrap().unwrap_check();
        assert!(checked);
        match &inner.kind {
            ExpressionKind::RemoteCall {
                client,
                method,
                arguments,
            } => {
                assert_eq!(client, "self.cl");
                assert_eq!(method, "get");
                assert_eq!(arguments.len(), 2);
                assert!(matches!(&arguments[1], Argument::Named { name, .. } if name == "headers"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn assignment_versus_declaration() {
        assert!(matches!(first_statement("x = 5;"), Statement::Assignment(_)));
        assert!(matches!(first_statement("a.b = 5;"), Statement::Assignment(_)));
        assert!(matches!(
            first_statement("map<int> m = {};"),
            Statement::VariableDeclaration(_)
        ));
        assert!(matches!(
            first_statement("int? x = ();"),
            Statement::VariableDeclaration(_)
        ));
    }

    #[test]
    fn else_if_chains_nest() {
        let Statement::If(statement) =
            first_statement("if a { } else if b { x = 1; } else { }")
        else {
            panic!("expected if");
        };
        let Some(ElseBody::If(nested)) = &statement.else_body else {
            panic!("expected else-if");
        };
        assert!(matches!(nested.as_ref(), Statement::If(inner) if inner.else_body.is_some()));
    }

    #[test]
    fn module_members_and_imports() {
        let module = parse(
            "import ballerina/http;\nimport ballerinax/mysql.driver as _;\n\
             final http:Client c = check new (\"http://x\");\n\
             service /api on new http:Listener(9090) {\n\
                 resource function get greeting() returns string { return \"hi\"; }\n\
             }\n\
             type Person record {| string name; int age?; |};",
        )
        .unwrap();
        assert_eq!(module.imports.len(), 2);
        assert_eq!(module.imports[0].prefix, "http");
        assert_eq!(module.imports[1].prefix, "_");
        assert_eq!(module.members.len(), 3);
        let ModuleMember::Type(person) = &module.members[2] else {
            panic!("expected a type");
        };
        let TypeDescriptor::Record(record) = &person.descriptor else {
            panic!("expected a record");
        };
        assert!(record.closed);
        assert!(record.fields[1].optional);
    }

    #[test]
    fn unsupported_statements_become_opaque() {
        let module = parse(
            "function main() {\n\
             foreach int i in 0..<3 { if i > 1 { break; } }\n\
             do { x = 1; } on fail error e { log(e); }\n\
             lock { y = 2; }\n\
             int z = 3;\n\
             }",
        )
        .unwrap();
        let ModuleMember::Function(main) = &module.members[0] else {
            panic!("expected a function");
        };
        let statements = &main.body.statements;
        assert_eq!(statements.len(), 4);
        let constructs: Vec<&str> = statements[..3]
            .iter()
            .map(|statement| match statement {
                Statement::Unsupported(u) => u.construct.as_str(),
                other => panic!("expected an opaque statement, got {:?}", other),
            })
            .collect();
        assert_eq!(constructs, vec!["foreach", "do", "lock"]);
        assert_eq!(statements[1].span().start.line, 2);
        assert_eq!(statements[1].span().end.line, 2);
        assert!(matches!(statements[3], Statement::VariableDeclaration(_)));
    }

    #[test]
    fn rejects_unsupported_module_members() {
        let result = parse("xmlns \"http://example.com/ns\" as ns;");
        assert!(matches!(result, Err(ParseError::UnsupportedSyntax { construct, .. }) if construct == "xmlns"));
    }
}
