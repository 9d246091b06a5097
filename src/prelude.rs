//! Prelude module for convenient imports
//!
//! Re-exports the types needed to generate a flow model and write nodes back to
//! source.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowmodel::prelude::*;
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FlowModelService::new(Config::default(), FileSystemWorkspace)?;
//! let response = service.get_types(&FilePathRequest {
//!     file_path: "types.bal".into(),
//! })?;
//! println!("{} types", response.types.len());
//! # Ok(())
//! # }
//! ```

// Generation
pub use crate::analyzer::CodeAnalyzer;
pub use crate::generator::ModelGenerator;

// Model
pub use crate::model::{
    Branch, Codedata, Diagram, FlowNode, LinePosition, LineRange, Metadata, NodeFlags, NodeKind,
    Properties, Property, Scope, ValueType,
};

// Source analysis
pub use crate::syntax::{ClassIndex, Document, DocumentModel, SemanticModel};

// Templates and builders
pub use crate::builder::{FileEdits, NodeBuilder, NodeBuilders, TextEdit};
pub use crate::template::{CachedRegistry, TemplateCatalog, TemplateRegistry};

// Types
pub use crate::types::{TypeData, TypeKind, TypeMember};

// Request surface
pub use crate::config::Config;
pub use crate::service::{
    FilePathRequest, FileSystemWorkspace, FlowModelRequest, FlowModelService, InMemoryWorkspace,
    NodeTemplateRequest, SourceRequest, TypeRequest, TypeUpdateRequest, Workspace,
};

// Error types
pub use crate::error::{AnalysisError, BuildError, ConfigError, ParseError, ServiceError, TemplateError};
