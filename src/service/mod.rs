//! The request surface: one [`FlowModelService`] answers every request type.
//!
//! Requests are independent and synchronous. The only shared mutable state is the
//! template cache, so a single service can be used from many threads at once.

mod workspace;

pub use workspace::{FileSystemWorkspace, InMemoryWorkspace, Workspace};

use crate::builder::{FileEdits, NodeBuilders};
use crate::config::Config;
use crate::error::{BuildError, ServiceError};
use crate::generator::ModelGenerator;
use crate::model::{Codedata, Diagram, FlowNode, LinePosition};
use crate::syntax::{ClassIndex, Document};
use crate::template::{CachedRegistry, TemplateCatalog, TemplateRegistry};
use crate::types::{self, TypeData};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowModelRequest {
    pub file_path: PathBuf,
    pub start_line: LinePosition,
    pub end_line: LinePosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_mapping_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowModelResponse {
    pub flow_model: Diagram,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTemplateRequest {
    pub codedata: Codedata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplateResponse {
    pub flow_node: FlowNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRequest {
    pub file_path: PathBuf,
    pub flow_node: FlowNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub text_edits: FileEdits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePathRequest {
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeListResponse {
    pub types: Vec<TypeData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRequest {
    pub file_path: PathBuf,
    pub position: LinePosition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeResponse {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_data: Option<TypeData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeUpdateRequest {
    pub file_path: PathBuf,
    #[serde(rename = "type")]
    pub type_data: TypeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeUpdateResponse {
    pub name: String,
    pub text_edits: FileEdits,
}

pub struct FlowModelService {
    config: Config,
    templates: Arc<dyn TemplateRegistry>,
    builders: NodeBuilders,
    classes: ClassIndex,
    workspace: Box<dyn Workspace>,
}

impl FlowModelService {
    /// Creates a service over `workspace`, loading the configured template catalog
    /// (or the bundled one) behind a read-through cache.
    pub fn new(config: Config, workspace: impl Workspace + 'static) -> Result<Self, ServiceError> {
        let catalog = match &config.templates {
            Some(path) => TemplateCatalog::from_file(path)?,
            None => TemplateCatalog::bundled()?,
        };
        info!(templates = catalog.len(), "Loaded template catalog");

        let mut classes = ClassIndex::with_defaults();
        for descriptor in &config.client_classes {
            if !classes.register_client(descriptor) {
                warn!(descriptor = %descriptor, "Ignoring malformed client class (expected org/module:Class)");
            }
        }

        Ok(Self {
            config,
            templates: Arc::new(CachedRegistry::new(catalog)),
            builders: NodeBuilders::new(),
            classes,
            workspace: Box::new(workspace),
        })
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateRegistry>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_builders(mut self, builders: NodeBuilders) -> Self {
        self.builders = builders;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn document(&self, path: &Path) -> Result<Option<Document>, ServiceError> {
        let Some(text) = self.workspace.read(path) else {
            return Ok(None);
        };
        Document::parse(path, text)
            .map(Some)
            .map_err(|source| ServiceError::Parse {
                path: path.display().to_string(),
                source,
            })
    }

    fn require_document(&self, path: &Path) -> Result<Document, ServiceError> {
        self.document(path)?
            .ok_or_else(|| ServiceError::DocumentNotFound(path.display().to_string()))
    }

    #[instrument(skip(self, request), fields(file = %request.file_path.display()))]
    pub fn get_flow_model(&self, request: &FlowModelRequest) -> Result<FlowModelResponse, ServiceError> {
        let document = self.require_document(&request.file_path)?;
        let companion = request.data_mapping_file.clone().unwrap_or_else(|| {
            request
                .file_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&self.config.data_mappings_file)
        });
        let data_mappings = self.workspace.read(&companion).unwrap_or_default();

        let semantic = document.semantic_model(&self.classes);
        let flow_model = ModelGenerator::builder(
            &document,
            &semantic,
            self.templates.as_ref(),
            &self.builders,
        )
        .line_range(request.start_line, request.end_line)
        .data_mappings(&data_mappings)
        .build()
        .flow_model();
        Ok(FlowModelResponse { flow_model })
    }

    /// The template of a node. Registry failures degrade to a node carrying only
    /// the constant data of its kind.
    #[instrument(skip(self, request), fields(kind = %request.codedata.node))]
    pub fn get_node_template(
        &self,
        request: &NodeTemplateRequest,
    ) -> Result<NodeTemplateResponse, ServiceError> {
        let codedata = &request.codedata;
        let flow_node = match self.builders.node_template(codedata, self.templates.as_ref()) {
            Ok(node) => node,
            Err(BuildError::TemplateUnavailable(err)) => {
                warn!(error = %err, "Falling back to a constant-data template");
                self.builders.const_node(codedata)?
            }
            Err(err) => return Err(err.into()),
        };
        Ok(NodeTemplateResponse { flow_node })
    }

    #[instrument(skip(self, request), fields(file = %request.file_path.display(), kind = %request.flow_node.kind()))]
    pub fn to_source(&self, request: &SourceRequest) -> Result<SourceResponse, ServiceError> {
        let text_edits = self.builders.to_source(
            &request.flow_node,
            &request.file_path,
            &self.config.connections_file,
        )?;
        Ok(SourceResponse { text_edits })
    }

    pub fn get_types(&self, request: &FilePathRequest) -> Result<TypeListResponse, ServiceError> {
        let Some(document) = self.document(&request.file_path)? else {
            return Ok(TypeListResponse::default());
        };
        Ok(TypeListResponse {
            types: types::get_types(&document),
        })
    }

    pub fn get_type(&self, request: &TypeRequest) -> Result<TypeResponse, ServiceError> {
        let Some(document) = self.document(&request.file_path)? else {
            return Ok(TypeResponse::default());
        };
        Ok(TypeResponse {
            type_data: types::get_type(&document, request.position),
        })
    }

    #[instrument(skip(self, request), fields(file = %request.file_path.display(), name = %request.type_data.name))]
    pub fn update_type(&self, request: &TypeUpdateRequest) -> Result<TypeUpdateResponse, ServiceError> {
        let document = self.require_document(&request.file_path)?;
        Ok(TypeUpdateResponse {
            name: request.type_data.name.clone(),
            text_edits: types::update_type(&request.file_path, &document, &request.type_data),
        })
    }
}
