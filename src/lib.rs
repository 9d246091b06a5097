//! # flowmodel - Flow Model Generation for Ballerina Sources
//!
//! **flowmodel** turns a range of Ballerina source into a *flow model*: an ordered,
//! language-agnostic graph of typed nodes a diagram editor can display and edit.
//! Edited nodes are turned back into text edits, so changes made in the diagram land
//! in the source as ordinary, valid statements.
//!
//! ## Core Workflow
//!
//! 1.  **Parse**: `Document::parse` tokenizes and parses a file into an immutable
//!     syntax tree. `Document::semantic_model` answers symbol and type questions about it.
//! 2.  **Generate**: `ModelGenerator` locates the construct enclosing a line range,
//!     discovers the client connections visible there and hands every statement to the
//!     `CodeAnalyzer`, which produces `FlowNode`s through the registered `NodeBuilder`s.
//! 3.  **Edit**: a node template comes from `NodeBuilders::node_template`, backed by a
//!     `TemplateRegistry` such as the bundled `TemplateCatalog`.
//! 4.  **Write back**: `NodeBuilders::to_source` renders a node into `FileEdits`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowmodel::prelude::*;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = r#"
//! import ballerina/http;
//!
//! function main() returns error? {
//!     http:Client cl = check new ("http://localhost:9090");
//!     json res = check cl->get("/status");
//! }
//! "#;
//! let document = Document::parse("main.bal", source)?;
//! let classes = ClassIndex::with_defaults();
//! let semantic = document.semantic_model(&classes);
//! let templates = TemplateCatalog::bundled()?;
//! let builders = NodeBuilders::new();
//!
//! let diagram = ModelGenerator::builder(&document, &semantic, &templates, &builders)
//!     .line_range(LinePosition::new(3, 0), LinePosition::new(6, 1))
//!     .build()
//!     .flow_model();
//! println!("{}", diagram.outline());
//!
//! let edits = builders.to_source(&diagram.nodes[1], document.path(), "connections.bal")?;
//! println!("{}", serde_json::to_string_pretty(&edits)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Request Surface
//!
//! `service::FlowModelService` bundles configuration, the template cache and a
//! `Workspace` behind the request/response types an editor integration speaks.

pub mod analyzer;
pub mod builder;
pub mod config;
pub mod error;
pub mod generator;
pub mod model;
pub mod prelude;
pub mod service;
pub mod syntax;
pub mod template;
pub mod types;
