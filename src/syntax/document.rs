use super::parser::parse;
use super::semantic::{ClassIndex, DocumentModel};
use super::text::LineIndex;
use super::tree::*;
use crate::error::ParseError;
use crate::model::{LinePosition, LineRange};
use std::path::{Path, PathBuf};

/// A parsed source document together with its text and line index.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    text: String,
    index: LineIndex,
    tree: ModulePart,
}

impl Document {
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, ParseError> {
        let text = text.into();
        let tree = parse(&text)?;
        Ok(Self {
            path: path.into(),
            index: LineIndex::new(&text),
            text,
            tree,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name used in line ranges.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &ModulePart {
        &self.tree
    }

    pub fn slice(&self, span: &Span) -> &str {
        &self.text[span.start_offset..span.end_offset]
    }

    /// Byte offset of a position; `None` when the line is past the end of the text.
    pub fn text_position_from(&self, position: LinePosition) -> Option<usize> {
        if position.line as usize == self.index.line_count() && position.offset == 0 {
            return Some(self.text.len());
        }
        self.index.offset(position)
    }

    pub fn end_position(&self) -> LinePosition {
        self.index.end_position()
    }

    pub fn line_range(&self, span: &Span) -> LineRange {
        span.line_range(&self.file_name())
    }

    pub fn semantic_model<'a>(&'a self, classes: &'a ClassIndex) -> DocumentModel<'a> {
        DocumentModel::new(&self.tree, classes)
    }

    /// The innermost node whose span covers `start..end`.
    pub fn find_node(&self, start: LinePosition, end: LinePosition) -> Option<NodeRef<'_>> {
        let start = self.text_position_from(start)?;
        let end = self.text_position_from(end)?;
        if start > end {
            return None;
        }
        let mut node = NodeRef::Module(&self.tree);
        'descend: loop {
            for child in node.children() {
                if child.span().covers(start, end) {
                    node = child;
                    continue 'descend;
                }
            }
            return Some(node);
        }
    }
}

/// Names of the module-level functions declared in `text`.
///
/// Used for the companion data-mapping file, which only needs to be scanned,
/// not fully analyzed.
pub fn scan_function_names(text: &str) -> Vec<String> {
    let tokens = match super::lexer::tokenize(text) {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::warn!(error = %err, "Could not scan data-mapping functions");
            return Vec::new();
        }
    };
    let mut depth = 0usize;
    let mut names = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.is_opener() {
            depth += 1;
        } else if token.is_closer() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is("function") {
            if let Some(name) = tokens.get(i + 1) {
                names.push(name.text.to_string());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "function main() {\n    int a = 1;\n    if a > 0 {\n        a = 2;\n    }\n}\n";

    #[test]
    fn finds_innermost_statement() {
        let doc = Document::parse("main.bal", SOURCE).unwrap();
        let node = doc
            .find_node(LinePosition::new(3, 8), LinePosition::new(3, 14))
            .unwrap();
        assert!(matches!(node, NodeRef::Statement(Statement::Assignment(_))));
    }

    #[test]
    fn whole_function_range_yields_function() {
        let doc = Document::parse("main.bal", SOURCE).unwrap();
        let node = doc
            .find_node(LinePosition::new(0, 0), LinePosition::new(5, 1))
            .unwrap();
        assert!(matches!(node, NodeRef::Function(_)));
    }

    #[test]
    fn out_of_range_positions_have_no_node() {
        let doc = Document::parse("main.bal", SOURCE).unwrap();
        assert!(doc.find_node(LinePosition::new(40, 0), LinePosition::new(41, 0)).is_none());
    }

    #[test]
    fn scans_module_function_names() {
        let names = scan_function_names(
            "function toPerson(json j) returns Person => {};\nfunction mapAll() { function inner() {} }",
        );
        assert_eq!(names, vec!["toPerson", "mapAll"]);
    }
}
