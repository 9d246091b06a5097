//! Node templates of externally defined symbols (connectors, library functions).
//!
//! A registry answers "what does a fresh node for `org/module:Object.symbol` look
//! like": its metadata, its argument properties with defaults, and its flags.

mod cache;
mod catalog;

pub use cache::CachedRegistry;
pub use catalog::TemplateCatalog;

use crate::error::TemplateError;
use crate::model::{Codedata, FlowNode, NodeKind};

/// Source of node templates. Implementations must be safe to share across
/// concurrent requests.
pub trait TemplateRegistry: Send + Sync {
    fn node_template(&self, codedata: &Codedata) -> Result<FlowNode, TemplateError>;
}

/// The identity of a template: node kind plus the symbol coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub node: NodeKind,
    pub org: Option<String>,
    pub module: Option<String>,
    pub object: Option<String>,
    pub symbol: Option<String>,
}

impl From<&Codedata> for TemplateKey {
    fn from(codedata: &Codedata) -> Self {
        Self {
            node: codedata.node,
            org: codedata.org.clone(),
            module: codedata.module.clone(),
            object: codedata.object.clone(),
            symbol: codedata.symbol.clone(),
        }
    }
}

/// A registry that knows no templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRegistry;

impl TemplateRegistry for EmptyRegistry {
    fn node_template(&self, codedata: &Codedata) -> Result<FlowNode, TemplateError> {
        Err(TemplateError::TemplateUnavailable {
            descriptor: codedata.descriptor(),
        })
    }
}
