use super::NodeBuilders;
use crate::error::BuildError;
use crate::model::{FlowNode, LinePosition, NodeKind, Property};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const INDENT: &str = "    ";

/// Keywords and punctuation the token builder knows how to space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    ReturnKeyword,
    CheckKeyword,
    FailKeyword,
    PanicKeyword,
    NewKeyword,
    FinalKeyword,
    IfKeyword,
    ElseKeyword,
    WhileKeyword,
    BreakKeyword,
    ContinueKeyword,
    RightArrowToken,
    ColonToken,
    EqualToken,
    CommaToken,
    OpenParenToken,
    CloseParenToken,
    OpenBraceToken,
    CloseBraceToken,
}

impl SyntaxKind {
    pub fn text(&self) -> &'static str {
        match self {
            SyntaxKind::ReturnKeyword => "return",
            SyntaxKind::CheckKeyword => "check",
            SyntaxKind::FailKeyword => "fail",
            SyntaxKind::PanicKeyword => "panic",
            SyntaxKind::NewKeyword => "new",
            SyntaxKind::FinalKeyword => "final",
            SyntaxKind::IfKeyword => "if",
            SyntaxKind::ElseKeyword => "else",
            SyntaxKind::WhileKeyword => "while",
            SyntaxKind::BreakKeyword => "break",
            SyntaxKind::ContinueKeyword => "continue",
            SyntaxKind::RightArrowToken => "->",
            SyntaxKind::ColonToken => ":",
            SyntaxKind::EqualToken => "=",
            SyntaxKind::CommaToken => ",",
            SyntaxKind::OpenParenToken => "(",
            SyntaxKind::CloseParenToken => ")",
            SyntaxKind::OpenBraceToken => "{",
            SyntaxKind::CloseBraceToken => "}",
        }
    }

    fn is_word(&self) -> bool {
        matches!(
            self,
            SyntaxKind::ReturnKeyword
                | SyntaxKind::CheckKeyword
                | SyntaxKind::FailKeyword
                | SyntaxKind::PanicKeyword
                | SyntaxKind::NewKeyword
                | SyntaxKind::FinalKeyword
                | SyntaxKind::IfKeyword
                | SyntaxKind::ElseKeyword
                | SyntaxKind::WhileKeyword
                | SyntaxKind::BreakKeyword
                | SyntaxKind::ContinueKeyword
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Keyword(SyntaxKind),
    Name(String),
    Expression(String),
    Raw(String),
    Whitespace,
    NewLine,
    EndOfStatement,
}

/// Accumulates tokens and renders them with canonical spacing.
#[derive(Debug, Clone, Default)]
pub struct TokenBuilder {
    tokens: Vec<Token>,
}

impl TokenBuilder {
    pub fn keyword(&mut self, kind: SyntaxKind) -> &mut Self {
        self.tokens.push(Token::Keyword(kind));
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.tokens.push(Token::Name(name.to_string()));
        self
    }

    pub fn expression(&mut self, text: &str) -> &mut Self {
        self.tokens.push(Token::Expression(text.trim().to_string()));
        self
    }

    /// Text emitted verbatim, e.g. an already rendered nested statement.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.tokens.push(Token::Raw(text.to_string()));
        self
    }

    pub fn whitespace(&mut self) -> &mut Self {
        self.tokens.push(Token::Whitespace);
        self
    }

    pub fn new_line(&mut self) -> &mut Self {
        self.tokens.push(Token::NewLine);
        self
    }

    pub fn end_of_statement(&mut self) -> &mut Self {
        self.tokens.push(Token::EndOfStatement);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Keyword(kind) if kind.is_word() => {
                    out.push_str(kind.text());
                    out.push(' ');
                }
                Token::Keyword(SyntaxKind::EqualToken) => {
                    trim_trailing_spaces(&mut out);
                    out.push_str(" = ");
                }
                Token::Keyword(SyntaxKind::CommaToken) => {
                    trim_trailing_spaces(&mut out);
                    out.push_str(", ");
                }
                Token::Keyword(SyntaxKind::OpenBraceToken) => {
                    trim_trailing_spaces(&mut out);
                    out.push_str(" {");
                }
                Token::Keyword(kind @ (SyntaxKind::CloseParenToken | SyntaxKind::OpenParenToken)) => {
                    trim_trailing_spaces(&mut out);
                    out.push_str(kind.text());
                }
                Token::Keyword(kind) => out.push_str(kind.text()),
                Token::Name(text) | Token::Expression(text) | Token::Raw(text) => {
                    out.push_str(text)
                }
                Token::Whitespace => {
                    if !out.is_empty() && !out.ends_with([' ', '\n']) {
                        out.push(' ');
                    }
                }
                Token::NewLine => {
                    trim_trailing_spaces(&mut out);
                    out.push('\n');
                }
                Token::EndOfStatement => {
                    trim_trailing_spaces(&mut out);
                    out.push(';');
                }
            }
        }
        trim_trailing_spaces(&mut out);
        out
    }
}

fn trim_trailing_spaces(out: &mut String) {
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
}

/// A zero-based position range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: LinePosition,
    pub end: LinePosition,
}

impl TextRange {
    pub fn insertion(at: LinePosition) -> Self {
        Self { start: at, end: at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

/// Text edits grouped by the file they apply to.
pub type FileEdits = BTreeMap<String, Vec<TextEdit>>;

/// Where the rendered text of a node goes.
#[derive(Debug, Clone, Copy)]
pub enum EditTarget<'p> {
    /// The file the request was made for.
    Current,
    /// A sibling file of the requesting file, by file name.
    Sibling(&'p str),
}

/// Per-request inputs shared by every source builder of one `to_source` call.
#[derive(Clone, Copy)]
pub struct SourceContext<'a> {
    pub file_path: &'a Path,
    pub builders: &'a NodeBuilders,
    pub connections_file: &'a str,
}

/// Renders one flow node to source text and turns it into text edits.
pub struct SourceBuilder<'a> {
    pub flow_node: &'a FlowNode,
    context: SourceContext<'a>,
    tokens: TokenBuilder,
    edits: FileEdits,
}

impl<'a> SourceBuilder<'a> {
    pub fn new(flow_node: &'a FlowNode, context: SourceContext<'a>) -> Self {
        Self {
            flow_node,
            context,
            tokens: TokenBuilder::default(),
            edits: FileEdits::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.flow_node.kind()
    }

    pub fn context(&self) -> SourceContext<'a> {
        self.context
    }

    pub fn token(&mut self) -> &mut TokenBuilder {
        &mut self.tokens
    }

    /// The non-empty text of a property.
    pub fn text(&self, key: &str) -> Option<String> {
        self.flow_node.properties.text(key)
    }

    pub fn require(&self, key: &str) -> Result<String, BuildError> {
        self.flow_node.properties.require(self.kind(), key)
    }

    /// Emits `[final] <type> <variable> = ` when the node binds a variable.
    /// An absent type renders as `var`.
    pub fn new_variable(&mut self) -> &mut Self {
        if let Some(variable) = self.text(Property::VARIABLE_KEY) {
            let data_type = self
                .text(Property::DATA_TYPE_KEY)
                .unwrap_or_else(|| "var".to_string());
            if self.flow_node.has_flag(crate::model::NodeFlags::FINAL) {
                self.tokens.keyword(SyntaxKind::FinalKeyword);
            }
            self.tokens
                .name(&data_type)
                .whitespace()
                .name(&variable)
                .keyword(SyntaxKind::EqualToken);
        }
        self
    }

    /// Emits the parenthesized argument list: every non-structural, non-empty
    /// property, required ones positionally and optional ones as `key = value`.
    pub fn arguments(&mut self) -> &mut Self {
        self.arguments_excluding(&[])
    }

    pub fn arguments_excluding(&mut self, extra: &[&str]) -> &mut Self {
        let (named, positional): (Vec<&Property>, Vec<&Property>) = self
            .flow_node
            .properties
            .iter()
            .filter(|p| !Property::STRUCTURAL_KEYS.contains(&p.key.as_str()))
            .filter(|p| !extra.contains(&p.key.as_str()))
            .filter(|p| !p.is_empty())
            .partition(|p| p.optional);
        let arguments: Vec<(bool, String, String)> = positional
            .into_iter()
            .chain(named)
            .map(|p| (p.optional, p.key.clone(), p.source_text()))
            .collect();

        self.tokens.keyword(SyntaxKind::OpenParenToken);
        for (index, (optional, key, value)) in arguments.iter().enumerate() {
            if index > 0 {
                self.tokens.keyword(SyntaxKind::CommaToken);
            }
            if *optional {
                self.tokens.name(key).keyword(SyntaxKind::EqualToken);
            }
            self.tokens.expression(value);
        }
        self.tokens.keyword(SyntaxKind::CloseParenToken);
        self
    }

    /// Emits a braced block holding the rendered children, indented one level.
    pub fn body(&mut self, children: &[FlowNode]) -> Result<&mut Self, BuildError> {
        let mut lines = Vec::with_capacity(children.len());
        for child in children {
            lines.push(self.render_child(child)?);
        }
        self.tokens.keyword(SyntaxKind::OpenBraceToken).new_line();
        for text in lines {
            self.tokens.raw(&indent(&text)).new_line();
        }
        self.tokens.keyword(SyntaxKind::CloseBraceToken);
        Ok(self)
    }

    /// Renders a nested node with the builder registered for its kind.
    pub fn render_child(&self, child: &FlowNode) -> Result<String, BuildError> {
        let builder = self.context.builders.get(child.kind())?;
        let mut nested = SourceBuilder::new(child, self.context);
        builder.write_source(&mut nested)?;
        Ok(nested.source())
    }

    /// The text rendered so far.
    pub fn source(&self) -> String {
        self.tokens.render()
    }

    /// Turns the rendered text into an edit against `target`.
    ///
    /// A new node is inserted at its range start; an existing node replaces its
    /// whole range. Without a usable range the text is inserted at the file start.
    pub fn text_edit(&mut self, target: EditTarget<'_>) -> &mut Self {
        let path = self.target_path(target);
        let codedata = &self.flow_node.codedata;
        let line_range = codedata.line_range.as_ref().filter(|range| match target {
            EditTarget::Current => true,
            EditTarget::Sibling(name) => range.file_name == name || range.file_name.ends_with(&format!("/{}", name)),
        });
        let range = match line_range {
            Some(range) if codedata.is_new => TextRange::insertion(range.start_line),
            Some(range) => TextRange {
                start: range.start_line,
                end: range.end_line,
            },
            None => TextRange::insertion(LinePosition::default()),
        };
        let edit = TextEdit {
            range,
            new_text: self.tokens.render(),
        };
        self.edits
            .entry(path.to_string_lossy().into_owned())
            .or_default()
            .push(edit);
        self
    }

    fn target_path(&self, target: EditTarget<'_>) -> PathBuf {
        match target {
            EditTarget::Current => self.context.file_path.to_path_buf(),
            EditTarget::Sibling(name) => self
                .context
                .file_path
                .parent()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|| PathBuf::from(name)),
        }
    }

    pub fn build(self) -> FileEdits {
        self.edits
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_keywords_and_punctuation() {
        let mut tokens = TokenBuilder::default();
        tokens
            .name("json")
            .whitespace()
            .name("res")
            .keyword(SyntaxKind::EqualToken)
            .keyword(SyntaxKind::CheckKeyword)
            .name("c")
            .keyword(SyntaxKind::RightArrowToken)
            .name("get")
            .keyword(SyntaxKind::OpenParenToken)
            .expression("\"/\"")
            .keyword(SyntaxKind::CloseParenToken)
            .end_of_statement();
        assert_eq!(tokens.render(), "json res = check c->get(\"/\");");
    }

    #[test]
    fn keyword_statements_drop_trailing_space() {
        let mut tokens = TokenBuilder::default();
        tokens.keyword(SyntaxKind::FailKeyword).end_of_statement();
        assert_eq!(tokens.render(), "fail;");
    }

    #[test]
    fn indents_every_non_empty_line() {
        assert_eq!(indent("a;\nif x {\n}"), "    a;\n    if x {\n    }");
    }
}
