//! End-to-end tests of the request surface over in-memory and on-disk workspaces.
mod common;
use common::*;
use flowmodel::prelude::*;
use flowmodel::service::{TypeResponse, TypeUpdateResponse};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

const TYPES_SOURCE: &str = r#"type Person record {|
    string name;
    int age?;
|};

public type Id string;

type Open record {
    string kind = "x";
};
"#;

fn service_with(workspace: InMemoryWorkspace) -> FlowModelService {
    FlowModelService::new(Config::default(), workspace).expect("service should start")
}

fn model_request(path: &str, start: LinePosition, end: LinePosition) -> FlowModelRequest {
    FlowModelRequest {
        file_path: PathBuf::from(path),
        start_line: start,
        end_line: end,
        data_mapping_file: None,
    }
}

#[test]
fn test_flow_model_over_in_memory_workspace() {
    let service = service_with(InMemoryWorkspace::new().with_document(MAIN_FILE, MODULE_SOURCE));
    let document = document(MODULE_SOURCE);
    let response = service
        .get_flow_model(&model_request(MAIN_FILE, LinePosition::new(0, 0), document.end_position()))
        .unwrap();

    let model = response.flow_model;
    assert_eq!(model.connections.len(), 1);
    assert_eq!(model.connections[0].variable_name(), "cl");
    assert_eq!(model.nodes.len(), 1);
    assert_eq!(model.nodes[0].kind(), NodeKind::NewData);

    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["filePath"], MAIN_FILE);
    assert_eq!(json["connections"][0]["codedata"]["node"], "NEW_CONNECTION");
}

#[test]
fn test_missing_documents() {
    let service = service_with(InMemoryWorkspace::new());
    let missing = "/project/missing.bal";

    let err = service
        .get_flow_model(&model_request(missing, LinePosition::new(0, 0), LinePosition::new(1, 0)))
        .unwrap_err();
    assert!(matches!(err, ServiceError::DocumentNotFound(ref path) if path == missing));

    let types = service
        .get_types(&FilePathRequest {
            file_path: missing.into(),
        })
        .unwrap();
    assert!(types.types.is_empty());

    let found: TypeResponse = service
        .get_type(&TypeRequest {
            file_path: missing.into(),
            position: LinePosition::new(0, 0),
        })
        .unwrap();
    assert!(found.type_data.is_none());

    let err = service
        .update_type(&TypeUpdateRequest {
            file_path: missing.into(),
            type_data: TypeData::record("Person", Vec::new()),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::DocumentNotFound(_)));
}

#[test]
fn test_unsupported_statement_in_sibling_function_keeps_the_model() {
    let source = "function other() {\n    foreach int i in 0..<3 {\n        count += i;\n    }\n}\n\nfunction main() {\n    int x = 5;\n}\n";
    let service = service_with(InMemoryWorkspace::new().with_document(MAIN_FILE, source));
    let (start, end) = range_of(source, "function main() {\n    int x = 5;\n}");
    let model = service
        .get_flow_model(&model_request(MAIN_FILE, start, end))
        .unwrap()
        .flow_model;
    assert_eq!(model.nodes.len(), 1);
    assert_eq!(model.nodes[0].kind(), NodeKind::NewData);

    // The function holding the loop still yields a model, without a node for it.
    let (start, end) = range_of(source, "function other()");
    let model = service
        .get_flow_model(&model_request(MAIN_FILE, start, end))
        .unwrap()
        .flow_model;
    assert!(model.nodes.is_empty());
}

#[test]
fn test_unparsable_document_surfaces_parse_error() {
    let source = "xmlns \"http://example.com/ns\" as ns;\n\nfunction main() {\n}\n";
    let service = service_with(InMemoryWorkspace::new().with_document(MAIN_FILE, source));
    let err = service
        .get_flow_model(&model_request(MAIN_FILE, LinePosition::new(0, 0), LinePosition::new(3, 1)))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Parse {
            source: ParseError::UnsupportedSyntax { .. },
            ..
        }
    ));
}

#[test]
fn test_unknown_template_degrades_to_constant_data() {
    let service = service_with(InMemoryWorkspace::new());
    let codedata = Codedata::external(NodeKind::ActionCall, "acme", "billing", Some("Client"), "charge");
    let response = service
        .get_node_template(&NodeTemplateRequest { codedata })
        .unwrap();

    let node = response.flow_node;
    assert_eq!(node.kind(), NodeKind::ActionCall);
    assert_eq!(node.metadata.label, "Action Call");
    assert!(node.properties.is_empty());
    assert_eq!(node.codedata.symbol.as_deref(), Some("charge"));
}

#[test]
fn test_to_source_places_global_connections_in_configured_file() {
    let config = Config::from_toml_str("connections_file = \"clients.bal\"").unwrap();
    let service = FlowModelService::new(config, InMemoryWorkspace::new()).unwrap();
    let codedata = Codedata::external(NodeKind::NewConnection, "ballerina", "http", Some("Client"), "init");
    let mut flow_node = service
        .get_node_template(&NodeTemplateRequest { codedata })
        .unwrap()
        .flow_node;
    flow_node.properties.get_mut("url").unwrap().value = "\"http://example.com\"".into();

    let response = service
        .to_source(&SourceRequest {
            file_path: MAIN_FILE.into(),
            flow_node,
        })
        .unwrap();
    let files: Vec<&String> = response.text_edits.keys().collect();
    assert_eq!(files, vec!["/project/clients.bal"]);
}

#[test]
fn test_to_source_reports_builder_errors() {
    let service = service_with(InMemoryWorkspace::new());
    let mut flow_node = template(&Codedata::new(NodeKind::UpdateData));
    flow_node.properties.remove("expression");
    let err = service
        .to_source(&SourceRequest {
            file_path: MAIN_FILE.into(),
            flow_node,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Build(BuildError::MissingRequiredProperty { kind: NodeKind::UpdateData, .. })
    ));
}

#[test]
fn test_companion_data_mapping_file_is_discovered() {
    let source = "function convert(Input input) returns Output {\n    Output out = transform(input);\n}\n";
    let mappings = "function transform(Input input) returns Output => {};\n";
    let workspace = InMemoryWorkspace::new()
        .with_document(MAIN_FILE, source)
        .with_document("/project/data_mappings.bal", mappings);
    let service = service_with(workspace);

    let response = service
        .get_flow_model(&model_request(MAIN_FILE, LinePosition::new(0, 0), LinePosition::new(2, 1)))
        .unwrap();
    assert_eq!(response.flow_model.nodes[0].kind(), NodeKind::DataMapper);

    // An explicit companion that does not exist is not an error.
    let mut request = model_request(MAIN_FILE, LinePosition::new(0, 0), LinePosition::new(2, 1));
    request.data_mapping_file = Some("/project/elsewhere.bal".into());
    let response = service.get_flow_model(&request).unwrap();
    assert_eq!(response.flow_model.nodes[0].kind(), NodeKind::FunctionCall);
}

#[test]
fn test_configured_client_classes_become_connections() {
    let source = "import acme/billing;\n\nbilling:Client payments = check new (\"http://pay\");\n";
    let config = Config::from_toml_str("client_classes = [\"acme/billing:Client\"]").unwrap();
    let service = FlowModelService::new(
        config,
        InMemoryWorkspace::new().with_document(MAIN_FILE, source),
    )
    .unwrap();

    let response = service
        .get_flow_model(&model_request(MAIN_FILE, LinePosition::new(0, 0), LinePosition::new(3, 0)))
        .unwrap();
    let connections = response.flow_model.connections;
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].codedata.org.as_deref(), Some("acme"));
    // No template is known, so the argument keeps a positional key.
    assert_eq!(connections[0].properties.text("arg0").as_deref(), Some("\"http://pay\""));
}

#[test]
fn test_concurrent_requests_share_one_cached_registry() {
    let cache = Arc::new(CachedRegistry::new(TemplateCatalog::bundled().unwrap()));
    let service = service_with(InMemoryWorkspace::new().with_document(MAIN_FILE, FUNCTION_SOURCE))
        .with_templates(cache.clone());
    let codedata = Codedata::external(NodeKind::FunctionCall, "ballerina", "io", None, "println");

    let results: Vec<(usize, String)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let model = service
                        .get_flow_model(&model_request(
                            MAIN_FILE,
                            LinePosition::new(0, 0),
                            LinePosition::new(19, 0),
                        ))
                        .unwrap()
                        .flow_model;
                    let template = service
                        .get_node_template(&NodeTemplateRequest {
                            codedata: codedata.clone(),
                        })
                        .unwrap()
                        .flow_node;
                    (model.connections.len(), template.metadata.label)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|result| result == &results[0]));
    assert_eq!(results[0].1, "println");
    assert!(!cache.is_empty());

    cache.invalidate();
    assert!(cache.is_empty());
}

#[test]
fn test_types_are_listed_read_and_updated() {
    let path = "/project/types.bal";
    let service = service_with(InMemoryWorkspace::new().with_document(path, TYPES_SOURCE));

    let types = service
        .get_types(&FilePathRequest {
            file_path: path.into(),
        })
        .unwrap()
        .types;
    let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Person", "Id", "Open"]);
    assert_eq!(types[0].type_kind, TypeKind::Record);
    assert!(!types[0].allow_additional_fields);
    assert!(types[0].members[1].optional);
    assert_eq!(types[1].type_kind, TypeKind::Other);
    assert!(types[1].is_public);
    assert_eq!(types[1].descriptor.as_deref(), Some("string"));
    assert!(types[2].allow_additional_fields);
    assert_eq!(types[2].members[0].default_value.as_deref(), Some("\"x\""));

    let found = service
        .get_type(&TypeRequest {
            file_path: path.into(),
            position: LinePosition::new(5, 10),
        })
        .unwrap()
        .type_data
        .expect("position 5:10 lies in `Id`");
    assert_eq!(found.name, "Id");

    // Replacing an existing definition rewrites its whole range.
    let mut person = types[0].clone();
    person.members.push(TypeMember::new("email", "string"));
    let response: TypeUpdateResponse = service
        .update_type(&TypeUpdateRequest {
            file_path: path.into(),
            type_data: person,
        })
        .unwrap();
    assert_eq!(response.name, "Person");
    let edit = &response.text_edits[path][0];
    assert_eq!(edit.range.start, LinePosition::new(0, 0));
    assert_eq!(edit.range.end, LinePosition::new(3, 3));
    assert_eq!(
        edit.new_text,
        "type Person record {| string name; int age?; string email; |};"
    );

    // A new name is appended at the end of the file.
    let address = TypeData::record("Address", vec![TypeMember::new("city", "string")]);
    let response = service
        .update_type(&TypeUpdateRequest {
            file_path: path.into(),
            type_data: address,
        })
        .unwrap();
    let edit = &response.text_edits[path][0];
    assert_eq!(edit.range.start, LinePosition::new(10, 0));
    assert_eq!(edit.range.start, edit.range.end);
    assert_eq!(edit.new_text, "\ntype Address record {| string city; |};\n");
}

#[test]
fn test_file_system_workspace_with_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("flowmodel.toml");
    std::fs::write(
        &config_path,
        "data_mappings_file = \"mappings.bal\"\nlog_filter = \"flowmodel=debug\"\n",
    )
    .unwrap();
    let source_path = dir.path().join("types.bal");
    std::fs::write(&source_path, TYPES_SOURCE).unwrap();

    let config = Config::from_file(&config_path).unwrap();
    assert_eq!(config.data_mappings_file, "mappings.bal");
    assert_eq!(config.connections_file, "connections.bal");

    let service = FlowModelService::new(config, FileSystemWorkspace).unwrap();
    let types = service
        .get_types(&FilePathRequest {
            file_path: source_path.clone(),
        })
        .unwrap()
        .types;
    assert_eq!(types.len(), 3);
    assert_eq!(
        types[0].line_range.as_ref().map(|range| range.file_name.as_str()),
        Some("types.bal")
    );

    let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_request_json_shapes() {
    let request: FlowModelRequest = serde_json::from_str(
        r#"{
            "filePath": "/project/main.bal",
            "startLine": { "line": 0, "offset": 0 },
            "endLine": { "line": 4, "offset": 0 }
        }"#,
    )
    .unwrap();
    assert_eq!(request.end_line, LinePosition::new(4, 0));
    assert!(request.data_mapping_file.is_none());

    let update: TypeUpdateRequest = serde_json::from_str(
        r#"{
            "filePath": "/project/types.bal",
            "type": { "name": "Tag", "typeKind": "OTHER", "descriptor": "string" }
        }"#,
    )
    .unwrap();
    assert_eq!(update.type_data.to_source(), "type Tag string;");
    assert!(update.type_data.editable);
}
