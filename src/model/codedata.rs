use super::NodeKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A zero-based line / column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct LinePosition {
    pub line: u32,
    pub offset: u32,
}

impl LinePosition {
    pub fn new(line: u32, offset: u32) -> Self {
        Self { line, offset }
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.offset)
    }
}

/// A range of lines within a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub file_name: String,
    pub start_line: LinePosition,
    pub end_line: LinePosition,
}

impl LineRange {
    pub fn new(file_name: &str, start_line: LinePosition, end_line: LinePosition) -> Self {
        Self {
            file_name: file_name.to_string(),
            start_line,
            end_line,
        }
    }
}

/// Positional and contextual metadata of a flow node.
///
/// Codedata never owns syntax; it only records where the construct lives (or should be
/// inserted) and which external symbol describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Codedata {
    pub node: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// The import prefix `module` is referenced with in source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub in_display_annotation: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Codedata {
    pub fn new(node: NodeKind) -> Self {
        Self {
            node,
            org: None,
            module: None,
            module_prefix: None,
            object: None,
            symbol: None,
            parent_symbol: None,
            line_range: None,
            source_code: None,
            is_new: false,
            in_display_annotation: false,
        }
    }

    /// Codedata of an externally defined symbol, e.g. `ballerina/http:Client.get`.
    pub fn external(
        node: NodeKind,
        org: &str,
        module: &str,
        object: Option<&str>,
        symbol: &str,
    ) -> Self {
        Self {
            org: Some(org.to_string()),
            module: Some(module.to_string()),
            object: object.map(str::to_string),
            symbol: Some(symbol.to_string()),
            ..Self::new(node)
        }
    }

    /// The prefix a reference to `module` is written with: the import prefix read
    /// from source, else the last segment of the module name.
    pub fn qualifier(&self) -> Option<&str> {
        self.module_prefix.as_deref().or_else(|| {
            self.module
                .as_deref()
                .map(|module| module.rsplit('.').next().unwrap_or(module))
        })
    }

    /// A human readable descriptor, used in logs and registry errors.
    pub fn descriptor(&self) -> String {
        let mut descriptor = String::new();
        if let Some(org) = &self.org {
            descriptor.push_str(org);
            descriptor.push('/');
        }
        if let Some(module) = &self.module {
            descriptor.push_str(module);
            descriptor.push(':');
        }
        if let Some(object) = &self.object {
            descriptor.push_str(object);
            descriptor.push('.');
        }
        descriptor.push_str(self.symbol.as_deref().unwrap_or("?"));
        format!("{} {}", self.node, descriptor)
    }
}
