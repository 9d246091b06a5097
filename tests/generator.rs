//! Tests for flow-model generation over parsed documents.
mod common;
use common::*;
use flowmodel::analyzer::{CodeAnalyzer, SourceSite};
use flowmodel::builder::{NodeBuilder, SourceBuilder, TemplateContext};
use flowmodel::prelude::*;
use pretty_assertions::assert_eq;

fn kinds(nodes: &[FlowNode]) -> Vec<NodeKind> {
    nodes.iter().map(FlowNode::kind).collect()
}

fn text(node: &FlowNode, key: &str) -> Option<String> {
    node.properties.text(key)
}

fn main_function_range() -> (LinePosition, LinePosition) {
    let (start, _) = range_of(FUNCTION_SOURCE, "function main");
    let (_, end) = range_of(FUNCTION_SOURCE, "    return;\n}");
    (start, end)
}

#[test]
fn test_module_range_separates_data_from_connections() {
    let document = document(MODULE_SOURCE);
    let diagram = generate_all(&document);

    assert_eq!(diagram.file_path, MAIN_FILE);
    assert_eq!(kinds(&diagram.connections), vec![NodeKind::NewConnection]);
    assert_eq!(kinds(&diagram.nodes), vec![NodeKind::NewData]);

    let connection = &diagram.connections[0];
    assert_eq!(connection.variable_name(), "cl");
    assert_eq!(text(connection, "scope").as_deref(), Some("Global"));
    assert_eq!(text(connection, "url").as_deref(), Some("\"http://localhost:9090\""));
    assert_eq!(connection.codedata.module.as_deref(), Some("http"));
    assert!(connection.has_flag(NodeFlags::CHECKED));

    let data = &diagram.nodes[0];
    assert_eq!(data.variable_name(), "x");
    assert_eq!(text(data, "type").as_deref(), Some("int"));
    assert_eq!(text(data, "expression").as_deref(), Some("5"));
    assert_eq!(data.id.as_deref(), Some("2:0"));
}

#[test]
fn test_function_body_nodes_are_in_program_order() {
    let document = document(FUNCTION_SOURCE);
    let (start, end) = main_function_range();
    let diagram = generate(&document, start, end);

    assert_eq!(
        kinds(&diagram.nodes),
        vec![
            NodeKind::NewConnection,
            NodeKind::ActionCall,
            NodeKind::NewData,
            NodeKind::While,
            NodeKind::If,
            NodeKind::Return,
        ]
    );
    assert_eq!(kinds(&diagram.connections), vec![NodeKind::NewConnection]);
    assert_eq!(diagram.connections[0].variable_name(), "weather");
    assert!(diagram.connections[0].has_flag(NodeFlags::FINAL));

    let while_node = &diagram.nodes[3];
    let body = while_node.branch(Branch::BODY_LABEL).expect("while has a body");
    assert_eq!(kinds(&body.children), vec![NodeKind::UpdateData]);

    let if_node = &diagram.nodes[4];
    assert_eq!(text(if_node, "condition").as_deref(), Some("count > 2"));
    let then_branch = if_node.branch(Branch::THEN_LABEL).expect("if has a then branch");
    let else_branch = if_node.branch(Branch::ELSE_LABEL).expect("if has an else branch");
    assert_eq!(kinds(&then_branch.children), vec![NodeKind::FunctionCall]);
    assert_eq!(kinds(&else_branch.children), vec![NodeKind::Fail]);

    let log_call = &then_branch.children[0];
    assert_eq!(log_call.codedata.org.as_deref(), Some("ballerina"));
    assert_eq!(log_call.codedata.module.as_deref(), Some("log"));
    assert_eq!(text(log_call, "msg").as_deref(), Some("\"done\""));
}

#[test]
fn test_concrete_nodes_round_trip_to_their_source() {
    let document = document(FUNCTION_SOURCE);
    let (start, end) = main_function_range();
    let diagram = generate(&document, start, end);

    for node in diagram.nodes.iter().skip(1) {
        let original = node
            .codedata
            .source_code
            .as_deref()
            .expect("concrete nodes carry their source");
        assert_eq!(normalize(&render(node)), normalize(original), "{}", node.kind());
    }

    // Connections are always rendered with an explicit class in `new`.
    assert_eq!(
        render(&diagram.nodes[0]),
        "http:Client local = check new http:Client(\"http://localhost:8080\");"
    );
}

/// Generates `ROUND_TRIP_SOURCE` between `from` and the end of the function body
/// ending with `last`.
fn round_trip_nodes(from: &str, last: &str) -> Vec<FlowNode> {
    let document = document(ROUND_TRIP_SOURCE);
    let (start, _) = range_of(ROUND_TRIP_SOURCE, from);
    let (_, end) = range_of(ROUND_TRIP_SOURCE, last);
    generate_with_mappings(&document, start, end, ROUND_TRIP_MAPPINGS).nodes
}

fn collect_kinds(nodes: &[FlowNode], into: &mut Vec<NodeKind>) {
    for node in nodes {
        into.push(node.kind());
        for branch in &node.branches {
            collect_kinds(&branch.children, into);
        }
    }
}

#[test]
fn test_every_node_kind_round_trips_to_its_source() {
    let mut nodes = round_trip_nodes("function compute", "return n * scale;\n}");
    nodes.extend(round_trip_nodes(
        "function main",
        "return check api->get(\"/done\");\n}",
    ));

    let mut seen = Vec::new();
    collect_kinds(&nodes, &mut seen);
    for kind in [
        NodeKind::ActionCall,
        NodeKind::FunctionCall,
        NodeKind::DataMapper,
        NodeKind::NewData,
        NodeKind::UpdateData,
        NodeKind::If,
        NodeKind::While,
        NodeKind::Break,
        NodeKind::Continue,
        NodeKind::Return,
        NodeKind::Fail,
        NodeKind::Panic,
        NodeKind::ExpressionStatement,
    ] {
        assert!(seen.contains(&kind), "no {} node was generated", kind);
    }

    for node in &nodes {
        let original = node
            .codedata
            .source_code
            .as_deref()
            .expect("concrete nodes carry their source");
        assert_eq!(normalize(&render(node)), normalize(original), "{}", node.kind());
    }
}

#[test]
fn test_aliased_import_prefix_is_rendered() {
    let nodes = round_trip_nodes("function main", "return check api->get(\"/done\");\n}");
    let log_call = nodes
        .iter()
        .find(|node| node.codedata.symbol.as_deref() == Some("printInfo"))
        .expect("the log call is a node");

    assert_eq!(log_call.kind(), NodeKind::FunctionCall);
    assert_eq!(log_call.codedata.org.as_deref(), Some("ballerina"));
    assert_eq!(log_call.codedata.module.as_deref(), Some("log"));
    assert_eq!(log_call.codedata.module_prefix.as_deref(), Some("l"));
    assert_eq!(render(log_call), "l:printInfo(\"started\");");

    // Without a source prefix the module name qualifies the call.
    let mut unprefixed = log_call.clone();
    unprefixed.codedata.module_prefix = None;
    assert_eq!(render(&unprefixed), "log:printInfo(\"started\");");
}

#[test]
fn test_named_arguments_are_rendered_by_name() {
    let nodes = round_trip_nodes("function main", "return check api->get(\"/done\");\n}");

    let mapper = nodes
        .iter()
        .find(|node| node.kind() == NodeKind::DataMapper)
        .expect("transform is a data mapping");
    assert_eq!(text(mapper, "inputs").as_deref(), Some("total, extra = greeting"));
    assert_eq!(render(mapper), "Output mapped = transform(total, extra = greeting);");

    let call = nodes
        .iter()
        .find(|node| node.codedata.symbol.as_deref() == Some("compute"))
        .expect("compute is a function call");
    assert_eq!(text(call, "n").as_deref(), Some("2"));
    assert_eq!(text(call, "scale").as_deref(), Some("3"));
    assert_eq!(render(call), "int scaled = compute(2, scale = 3);");

    let action = nodes
        .iter()
        .find(|node| node.kind() == NodeKind::ActionCall && !node.returning())
        .expect("the first get is an action call");
    assert_eq!(
        render(action),
        "json payload = check api->get(\"/items\", headers = {\"x-id\": \"1\"});"
    );
}

#[test]
fn test_documented_function_is_generated() {
    let source = "# Entry point.\n# + return - nothing\nfunction main() {\n    int x = 5;\n}\n";
    let (start, end) = range_of(source, "function main() {\n    int x = 5;\n}");
    let diagram = generate(&document(source), start, end);

    assert_eq!(kinds(&diagram.nodes), vec![NodeKind::NewData]);
    assert_eq!(diagram.nodes[0].id.as_deref(), Some("3:4"));
}

#[test]
fn test_action_call_resolves_connection_and_template() {
    let document = document(FUNCTION_SOURCE);
    let (start, end) = main_function_range();
    let diagram = generate(&document, start, end);
    let action = &diagram.nodes[1];

    assert_eq!(action.codedata.object.as_deref(), Some("Client"));
    assert_eq!(action.codedata.symbol.as_deref(), Some("get"));
    assert_eq!(action.codedata.parent_symbol.as_deref(), Some("weather"));
    assert_eq!(text(action, "connection").as_deref(), Some("weather"));
    assert_eq!(text(action, "path").as_deref(), Some("\"/forecast\""));
    assert_eq!(action.variable_name(), "forecast");
    assert!(action.has_flag(NodeFlags::CHECKED));
    assert!(!action.is_template());
}

#[test]
fn test_statement_range_sees_local_and_module_connections() {
    let document = document(FUNCTION_SOURCE);
    let (start, end) = range_of(FUNCTION_SOURCE, "json forecast = check weather->get(\"/forecast\");");
    let diagram = generate(&document, start, end);

    assert_eq!(kinds(&diagram.nodes), vec![NodeKind::ActionCall]);
    let names: Vec<String> = diagram.connections.iter().map(FlowNode::variable_name).collect();
    assert_eq!(names, vec!["local", "weather"]);
    assert_eq!(text(&diagram.connections[0], "scope").as_deref(), Some("Local"));
    assert_eq!(text(&diagram.connections[1], "scope").as_deref(), Some("Global"));
}

#[test]
fn test_connections_are_sorted_case_sensitively() {
    let source = r#"import ballerina/http;

http:Client zeta = check new ("http://z");
http:Client Alpha = check new ("http://a");
http:Client beta = check new ("http://b");
"#;
    let diagram = generate_all(&document(source));
    let names: Vec<String> = diagram.connections.iter().map(FlowNode::variable_name).collect();
    assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    assert!(diagram.nodes.is_empty());
}

#[test]
fn test_service_fields_are_service_scoped_connections() {
    let source = r#"import ballerina/http;

service /orders on new http:Listener(9090) {
    final http:Client store = check new ("http://store");

    resource function get items() returns json|error {
        json items = check self.store->get("/items");
        return items;
    }
}
"#;
    let document = document(source);
    let (start, _) = range_of(source, "resource function");
    let (_, end) = range_of(source, "return items;\n    }");
    let diagram = generate(&document, start, end);

    assert_eq!(kinds(&diagram.connections), vec![NodeKind::NewConnection]);
    assert_eq!(text(&diagram.connections[0], "scope").as_deref(), Some("Service"));
    assert_eq!(kinds(&diagram.nodes), vec![NodeKind::ActionCall, NodeKind::Return]);
    assert_eq!(diagram.nodes[0].codedata.module.as_deref(), Some("http"));
    assert_eq!(
        render(&diagram.nodes[0]),
        "json items = check self.store->get(\"/items\");"
    );
}

#[test]
fn test_returning_calls_keep_their_call_kind() {
    let source = r#"import ballerina/http;

final http:Client api = check new ("http://api");

function compute(int n) returns int {
    return n;
}

function fetch() returns json|error {
    return api->get("/x");
}

function twice() returns int {
    return compute(2);
}
"#;
    let document = document(source);

    let (start, end) = range_of(source, "return api->get(\"/x\");");
    let diagram = generate(&document, start, end);
    let action = &diagram.nodes[0];
    assert_eq!(action.kind(), NodeKind::ActionCall);
    assert!(action.returning());
    assert!(!action.has_flag(NodeFlags::CHECKED));
    assert!(action.property("variable").is_none());
    assert_eq!(render(action), "return api->get(\"/x\");");

    let (start, end) = range_of(source, "return compute(2);");
    let diagram = generate(&document, start, end);
    let call = &diagram.nodes[0];
    assert_eq!(call.kind(), NodeKind::FunctionCall);
    assert!(call.returning());
    assert_eq!(text(call, "n").as_deref(), Some("2"));
    assert_eq!(render(call), "return compute(2);");

    let (start, end) = range_of(source, "return n;");
    let diagram = generate(&document, start, end);
    assert_eq!(kinds(&diagram.nodes), vec![NodeKind::Return]);
}

#[test]
fn test_data_mapping_calls_become_data_mappers() {
    let source = r#"function convert(Input input, Extra extra) returns Output {
    Output out = transform(input, extra);
    Output other = normalize(input);
}
"#;
    let mappings = "function transform(Input i, Extra e) returns Output => {};\n";
    let document = document(source);
    let (start, _) = range_of(source, "function convert");
    let end = range_of(source, "normalize(input);\n}").1;
    let diagram = generate_with_mappings(&document, start, end, mappings);

    assert_eq!(
        kinds(&diagram.nodes),
        vec![NodeKind::DataMapper, NodeKind::FunctionCall]
    );
    let mapper = &diagram.nodes[0];
    assert!(mapper.has_flag(NodeFlags::IS_DATA_MAPPED));
    assert_eq!(text(mapper, "functionName").as_deref(), Some("transform"));
    assert_eq!(text(mapper, "inputs").as_deref(), Some("input, extra"));
    assert_eq!(render(mapper), "Output out = transform(input, extra);");
}

#[test]
fn test_range_outside_document_yields_empty_diagram() {
    let document = document(MODULE_SOURCE);
    let diagram = generate(&document, LinePosition::new(40, 0), LinePosition::new(41, 0));
    assert!(diagram.is_empty());
    assert_eq!(diagram.file_path, MAIN_FILE);
}

#[test]
fn test_unknown_client_types_are_not_connections() {
    let source = r#"import acme/billing;

billing:Client payments = check new ("http://pay");
int retries = 3;
"#;
    let diagram = generate_all(&document(source));
    assert!(diagram.connections.is_empty());
    // Without a client class the declaration is plain data.
    assert_eq!(kinds(&diagram.nodes), vec![NodeKind::NewData, NodeKind::NewData]);
}

/// A builder that refuses every `BREAK` so sibling handling can be observed.
struct RejectingBreak;

impl NodeBuilder for RejectingBreak {
    fn kind(&self) -> NodeKind {
        NodeKind::Break
    }

    fn set_const_data(&self, node: &mut FlowNode) {
        node.metadata = Metadata::new("Break", "");
    }

    fn set_template_data(&self, context: &TemplateContext<'_>) -> Result<FlowNode, BuildError> {
        Ok(self.template_node(context.codedata))
    }

    fn build_from_source(
        &self,
        _analyzer: &CodeAnalyzer<'_>,
        site: &SourceSite<'_>,
    ) -> Result<FlowNode, BuildError> {
        Err(site.unexpected(self.kind()))
    }

    fn write_source(&self, _source: &mut SourceBuilder<'_>) -> Result<(), BuildError> {
        Ok(())
    }
}

#[test]
fn test_failed_node_is_skipped_without_losing_siblings() {
    let source = r#"function run() {
    int i = 0;
    while true {
        i = i + 1;
        break;
    }
    i = 0;
}
"#;
    let document = document(source);
    let classes = ClassIndex::with_defaults();
    let semantic = document.semantic_model(&classes);
    let templates = TemplateCatalog::bundled().unwrap();
    let builders = NodeBuilders::new().with_builder(Box::new(RejectingBreak));
    let (start, _) = range_of(source, "function run");
    let (_, end) = range_of(source, "i = 0;\n}");

    let diagram = ModelGenerator::builder(&document, &semantic, &templates, &builders)
        .line_range(start, end)
        .build()
        .flow_model();

    assert_eq!(
        kinds(&diagram.nodes),
        vec![NodeKind::NewData, NodeKind::While, NodeKind::UpdateData]
    );
    let body = diagram.nodes[1].branch(Branch::BODY_LABEL).unwrap();
    assert_eq!(kinds(&body.children), vec![NodeKind::UpdateData]);
}

#[test]
fn test_outline_lists_nodes_and_branches() {
    let document = document(FUNCTION_SOURCE);
    let (start, end) = main_function_range();
    let outline = generate(&document, start, end).outline().to_string();
    assert!(outline.starts_with(MAIN_FILE));
    assert!(outline.contains("├── connections"));
    assert!(outline.contains("[Then]"));
    assert!(outline.contains("(FAIL)"));
}
