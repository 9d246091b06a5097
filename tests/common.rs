//! Common test utilities for parsing sources and generating flow models.
use flowmodel::prelude::*;
use std::path::Path;

pub const MAIN_FILE: &str = "/project/main.bal";

/// Module-level data and one HTTP connection.
#[allow(dead_code)]
pub const MODULE_SOURCE: &str = r#"import ballerina/http;

int x = 5;
http:Client cl = check new ("http://localhost:9090");
"#;

/// A function body exercising most statement kinds.
#[allow(dead_code)]
pub const FUNCTION_SOURCE: &str = r#"import ballerina/http;
import ballerina/log;

final http:Client weather = check new ("http://weather.io");

function main() returns error? {
    http:Client local = check new ("http://localhost:8080");
    json forecast = check weather->get("/forecast");
    int count = 0;
    while count < 3 {
        count = count + 1;
    }
    if count > 2 {
        log:printInfo("done");
    } else {
        fail error("too few");
    }
    return;
}
"#;

/// Every node kind a function body can produce, written the way the renderer
/// spaces it so the rendered text can be compared after whitespace collapsing.
#[allow(dead_code)]
pub const ROUND_TRIP_SOURCE: &str = r#"import ballerina/http;
import ballerina/log as l;

final http:Client api = check new ("http://api.example.com");

# Scales a value.
#
# + n - the value
# + scale - the factor
# + return - the scaled value
function compute(int n, int scale = 1) returns int {
    return n * scale;
}

# Entry point.
function main() returns error? {
    int total;
    string greeting = "héllo wörld";
    json payload = check api->get("/items", headers = {"x-id": "1"});
    Output mapped = transform(total, extra = greeting);
    int scaled = compute(2, scale = 3);
    l:printInfo("started");
    total = scaled + 1;
    while total < 10 {
        total = total + 1;
        if total == 5 {
            continue;
        }
        if total > 8 {
            break;
        }
    }
    if total > 100 {
        fail error("too large");
    } else if total < 0 {
        panic error("negative");
    } else {
        greeting.toString();
    }
    return check api->get("/done");
}
"#;

/// The data-mapping functions `ROUND_TRIP_SOURCE` calls.
#[allow(dead_code)]
pub const ROUND_TRIP_MAPPINGS: &str =
    "function transform(int total, string extra = \"\") returns Output => {};\n";

/// Parses `source` as the main file of the test project.
#[allow(dead_code)]
pub fn document(source: &str) -> Document {
    Document::parse(MAIN_FILE, source).expect("test source should parse")
}

/// The flow model of `start..end` with the bundled templates.
#[allow(dead_code)]
pub fn generate(document: &Document, start: LinePosition, end: LinePosition) -> Diagram {
    generate_with_mappings(document, start, end, "")
}

#[allow(dead_code)]
pub fn generate_with_mappings(
    document: &Document,
    start: LinePosition,
    end: LinePosition,
    data_mappings: &str,
) -> Diagram {
    let classes = ClassIndex::with_defaults();
    let semantic = document.semantic_model(&classes);
    let templates = TemplateCatalog::bundled().expect("bundled catalog should load");
    let builders = NodeBuilders::new();
    ModelGenerator::builder(document, &semantic, &templates, &builders)
        .line_range(start, end)
        .data_mappings(data_mappings)
        .build()
        .flow_model()
}

/// The flow model of the whole document.
#[allow(dead_code)]
pub fn generate_all(document: &Document) -> Diagram {
    generate(document, LinePosition::new(0, 0), document.end_position())
}

/// Renders `node` and returns the new text of every edit, joined by newlines.
#[allow(dead_code)]
pub fn render(node: &FlowNode) -> String {
    let edits = NodeBuilders::new()
        .to_source(node, Path::new(MAIN_FILE), "connections.bal")
        .expect("node should render");
    edits
        .values()
        .flatten()
        .map(|edit| edit.new_text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A template node for `codedata`, resolved against the bundled catalog.
#[allow(dead_code)]
pub fn template(codedata: &Codedata) -> FlowNode {
    let templates = TemplateCatalog::bundled().expect("bundled catalog should load");
    NodeBuilders::new()
        .node_template(codedata, &templates)
        .expect("template should build")
}

/// The zero-based range of the first occurrence of `needle` in `source`.
#[allow(dead_code)]
pub fn range_of(source: &str, needle: &str) -> (LinePosition, LinePosition) {
    let start = source.find(needle).expect("needle should occur in the source");
    (position_at(source, start), position_at(source, start + needle.len()))
}

fn position_at(source: &str, offset: usize) -> LinePosition {
    let before = &source[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
    let column = before[line_start..].chars().count();
    LinePosition::new(line as u32, column as u32)
}

/// Collapses runs of whitespace so renderings can be compared to hand-written source.
#[allow(dead_code)]
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
