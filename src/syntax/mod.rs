//! A reference source analyzer: tokenizer, parser, syntax tree and semantic model
//! for the Ballerina subset the flow model covers.
//!
//! Statements outside that subset (`foreach`, `match`, `lock` and friends) are kept
//! as opaque [`Statement::Unsupported`] spans. Module-level constructs outside it are
//! rejected with [`ParseError::UnsupportedSyntax`](crate::error::ParseError).

pub mod document;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod text;
pub mod tree;

pub use document::{Document, scan_function_names};
pub use parser::parse;
pub use semantic::{ClassIndex, ClassSymbol, DocumentModel, Qualifier, SemanticModel, Symbol, SymbolKind, TypeSymbol};
pub use tree::*;
