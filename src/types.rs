//! Lists, reads and rewrites the type definitions of a document.

use crate::builder::{FileEdits, TextEdit, TextRange};
use crate::model::{LinePosition, LineRange, Metadata};
use crate::syntax::{Document, ModuleMember, RecordType, TypeDefinition, TypeDescriptor};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Record,
    Enum,
    Other,
}

/// A field of a record, or a member of an enum (which has no type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMember {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_desc: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl TypeMember {
    pub fn new(name: &str, type_desc: &str) -> Self {
        Self {
            name: name.to_string(),
            type_desc: type_desc.to_string(),
            optional: false,
            default_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeData {
    pub name: String,
    #[serde(default = "editable_by_default")]
    pub editable: bool,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
    pub type_kind: TypeKind,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub allow_additional_fields: bool,
    #[serde(default)]
    pub members: Vec<TypeMember>,
    /// Type references included with `*T;`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_type: Option<String>,
    /// The descriptor text of a non-record type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
}

fn editable_by_default() -> bool {
    true
}

impl TypeData {
    pub fn record(name: &str, members: Vec<TypeMember>) -> Self {
        Self {
            name: name.to_string(),
            editable: true,
            metadata: Metadata::new(name, ""),
            line_range: None,
            type_kind: TypeKind::Record,
            is_public: false,
            allow_additional_fields: false,
            members,
            includes: Vec::new(),
            rest_type: None,
            descriptor: None,
        }
    }

    fn from_definition(document: &Document, definition: &TypeDefinition) -> Self {
        let mut data = TypeData::record(&definition.name, Vec::new());
        data.is_public = definition.is_public;
        data.line_range = Some(document.line_range(&definition.span));
        match &definition.descriptor {
            TypeDescriptor::Record(record) => {
                data.allow_additional_fields = !record.closed;
                data.members = record_members(record);
                data.includes = record.inclusions.clone();
                data.rest_type = record.rest.clone();
            }
            TypeDescriptor::Enum(members) => {
                data.type_kind = TypeKind::Enum;
                data.members = members.iter().map(|m| TypeMember::new(m, "")).collect();
            }
            TypeDescriptor::Other(descriptor) => {
                data.type_kind = TypeKind::Other;
                data.descriptor = Some(descriptor.clone());
            }
        }
        data
    }

    /// The source text of the definition.
    pub fn to_source(&self) -> String {
        let visibility = if self.is_public { "public " } else { "" };
        match self.type_kind {
            TypeKind::Record => {
                let (open, close) = if self.allow_additional_fields {
                    ("{", "}")
                } else {
                    ("{|", "|}")
                };
                let fields = self
                    .includes
                    .iter()
                    .map(|include| format!("*{include};"))
                    .chain(self.members.iter().map(render_field))
                    .chain(self.rest_type.iter().map(|rest| format!("{rest}...;")))
                    .join(" ");
                if fields.is_empty() {
                    format!("{visibility}type {} record {open}{close};", self.name)
                } else {
                    format!("{visibility}type {} record {open} {fields} {close};", self.name)
                }
            }
            TypeKind::Enum => format!(
                "{visibility}enum {} {{ {} }}",
                self.name,
                self.members.iter().map(|m| m.name.as_str()).join(", ")
            ),
            TypeKind::Other => format!(
                "{visibility}type {} {};",
                self.name,
                self.descriptor.as_deref().unwrap_or("anydata")
            ),
        }
    }
}

fn record_members(record: &RecordType) -> Vec<TypeMember> {
    record
        .fields
        .iter()
        .map(|field| TypeMember {
            name: field.name.clone(),
            type_desc: field.type_desc.clone(),
            optional: field.optional,
            default_value: field.default.clone(),
        })
        .collect()
}

fn render_field(member: &TypeMember) -> String {
    let marker = if member.optional { "?" } else { "" };
    match &member.default_value {
        Some(default) => format!("{} {}{marker} = {default};", member.type_desc, member.name),
        None => format!("{} {}{marker};", member.type_desc, member.name),
    }
}

fn definitions(document: &Document) -> impl Iterator<Item = &TypeDefinition> {
    document.tree().members.iter().filter_map(|member| match member {
        ModuleMember::Type(definition) => Some(definition),
        _ => None,
    })
}

/// Every type definition of the document, in declaration order.
pub fn get_types(document: &Document) -> Vec<TypeData> {
    definitions(document)
        .map(|definition| TypeData::from_definition(document, definition))
        .collect()
}

/// The type definition containing `position`.
pub fn get_type(document: &Document, position: LinePosition) -> Option<TypeData> {
    definitions(document)
        .find(|definition| definition.span.contains(position))
        .map(|definition| TypeData::from_definition(document, definition))
}

/// Replaces the definition named `type_data.name`, or appends a new one.
pub fn update_type(file_path: &Path, document: &Document, type_data: &TypeData) -> FileEdits {
    let text = type_data.to_source();
    let edit = match definitions(document).find(|definition| definition.name == type_data.name) {
        Some(definition) => {
            let range = document.line_range(&definition.span);
            TextEdit {
                range: TextRange {
                    start: range.start_line,
                    end: range.end_line,
                },
                new_text: text,
            }
        }
        None => {
            let separator = if document.text().is_empty() || document.text().ends_with('\n') {
                ""
            } else {
                "\n"
            };
            TextEdit {
                range: TextRange::insertion(document.end_position()),
                new_text: format!("{separator}\n{text}\n"),
            }
        }
    };
    tracing::debug!(name = %type_data.name, file = %file_path.display(), "Updating type definition");
    FileEdits::from([(file_path.to_string_lossy().into_owned(), vec![edit])])
}
