use super::{TemplateKey, TemplateRegistry};
use crate::error::TemplateError;
use crate::model::{Codedata, FlowNode};
use ahash::AHashMap;
use std::path::Path;

const BUNDLED_TEMPLATES: &str = include_str!("../../resources/central/templates.json");

/// An in-memory template registry loaded from a JSON array of flow nodes.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: AHashMap<TemplateKey, FlowNode>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = FlowNode>) -> Self {
        let mut catalog = Self::new();
        for node in nodes {
            catalog.insert(node);
        }
        catalog
    }

    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let nodes: Vec<FlowNode> =
            serde_json::from_str(json).map_err(|e| TemplateError::InvalidCatalog(e.to_string()))?;
        Ok(Self::from_nodes(nodes))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TemplateError::InvalidCatalog(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// The catalog shipped with the crate: HTTP client operations and a few
    /// standard library functions.
    pub fn bundled() -> Result<Self, TemplateError> {
        Self::from_json(BUNDLED_TEMPLATES)
    }

    /// Adds a template keyed by its own codedata, replacing any previous one.
    pub fn insert(&mut self, mut node: FlowNode) {
        node.codedata.node = node.kind();
        let key = TemplateKey::from(&node.codedata);
        self.templates.insert(key, node);
    }

    /// Merges `other` into `self`; templates in `other` win.
    pub fn extend(&mut self, other: TemplateCatalog) {
        self.templates.extend(other.templates);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateRegistry for TemplateCatalog {
    fn node_template(&self, codedata: &Codedata) -> Result<FlowNode, TemplateError> {
        self.templates
            .get(&TemplateKey::from(codedata))
            .cloned()
            .ok_or_else(|| TemplateError::TemplateUnavailable {
                descriptor: codedata.descriptor(),
            })
    }
}
