use crate::model::NodeKind;
use thiserror::Error;

/// Errors raised by a node builder while constructing a flow node or its source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Node of kind '{kind}' requires the '{key}' property, but it is missing")]
    MissingRequiredProperty { kind: NodeKind, key: String },

    #[error("Invalid scope '{value}' (expected 'Local' or 'Global')")]
    InvalidScope { value: String },

    #[error("Property '{key}' holds '{value}', which is not a valid {expected}")]
    InvalidPropertyValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Node of kind '{kind}' requires codedata field '{field}'")]
    MissingCodedata { kind: NodeKind, field: String },

    #[error("No node builder is registered for kind '{0}'")]
    UnsupportedKind(NodeKind),

    #[error("A '{kind}' node cannot be built from {found}")]
    UnexpectedConstruct { kind: NodeKind, found: String },

    #[error(transparent)]
    TemplateUnavailable(#[from] TemplateError),
}

/// Errors raised by a template registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("No template is available for '{descriptor}'")]
    TemplateUnavailable { descriptor: String },

    #[error("Invalid template catalog: {0}")]
    InvalidCatalog(String),
}

/// Discovery-time failures. These never abort a model generation request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Symbol '{name}' could not be resolved to a concrete type")]
    UnresolvedSymbol { name: String },

    #[error("No syntax node encloses the range {start}..{end}")]
    NoEnclosingNode { start: String, end: String },
}

/// Errors produced while tokenizing or parsing a source document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token '{found}' at {line}:{column}, expected {expected}")]
    UnexpectedToken {
        line: u32,
        column: u32,
        found: String,
        expected: String,
    },

    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Unterminated string literal starting at {line}:{column}")]
    UnterminatedString { line: u32, column: u32 },

    #[error("Unexpected character '{found}' at {line}:{column}")]
    UnexpectedCharacter { line: u32, column: u32, found: char },

    #[error("Unsupported syntax '{construct}' at {line}:{column}")]
    UnsupportedSyntax {
        line: u32,
        column: u32,
        construct: String,
    },
}

/// Errors that can occur while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by the request surface to its caller.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document '{0}' was not found in the workspace")]
    DocumentNotFound(String),

    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}
