use clap::{Parser, Subcommand, ValueEnum};
use flowmodel::prelude::*;
use flowmodel::service::{TypeResponse, TypeUpdateResponse};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Generates flow models from Ballerina sources and writes edited nodes back
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a flowmodel.toml configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// How results are printed
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    /// Box-drawing outline of a flow model; other results fall back to JSON
    Outline,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the flow model of a range of a source file
    Model {
        file: PathBuf,
        /// Start of the range, as line:offset (zero-based)
        #[arg(long, value_parser = parse_position)]
        start: Option<LinePosition>,
        /// End of the range, as line:offset (zero-based)
        #[arg(long, value_parser = parse_position)]
        end: Option<LinePosition>,
        /// Companion file declaring data-mapping functions
        #[arg(long)]
        data_mappings: Option<PathBuf>,
    },
    /// Print the template of a node described by a codedata JSON file
    Template { codedata: PathBuf },
    /// Print the text edits for a flow node JSON file
    Source { file: PathBuf, node: PathBuf },
    /// List the type definitions of a source file
    Types { file: PathBuf },
    /// Print the type definition containing a position
    Type {
        file: PathBuf,
        #[arg(value_parser = parse_position)]
        position: LinePosition,
    },
    /// Print the edits that add or replace a type described by a JSON file
    UpdateType { file: PathBuf, type_data: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => Config::default(),
    };
    init_tracing(&config.log_filter);

    let started = Instant::now();
    let service = FlowModelService::new(config, FileSystemWorkspace)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start service: {}", e)));

    match cli.command {
        Command::Model {
            file,
            start,
            end,
            data_mappings,
        } => {
            let (start, end) = match (start, end) {
                (Some(start), Some(end)) => (start, end),
                (None, None) => whole_file(&file),
                _ => exit_with_error("--start and --end must be given together"),
            };
            let response = service
                .get_flow_model(&FlowModelRequest {
                    file_path: file,
                    start_line: start,
                    end_line: end,
                    data_mapping_file: data_mappings,
                })
                .unwrap_or_else(|e| exit_with_error(&format!("Model generation failed: {}", e)));
            match cli.format {
                OutputFormat::Outline => print!("{}", response.flow_model.outline()),
                OutputFormat::Json => print_json(&response),
            }
        }
        Command::Template { codedata } => {
            let codedata: Codedata = read_json(&codedata);
            let response = service
                .get_node_template(&NodeTemplateRequest { codedata })
                .unwrap_or_else(|e| exit_with_error(&format!("Template lookup failed: {}", e)));
            print_json(&response);
        }
        Command::Source { file, node } => {
            let flow_node: FlowNode = read_json(&node);
            let response = service
                .to_source(&SourceRequest {
                    file_path: file,
                    flow_node,
                })
                .unwrap_or_else(|e| exit_with_error(&format!("Source generation failed: {}", e)));
            print_json(&response);
        }
        Command::Types { file } => {
            let response = service
                .get_types(&FilePathRequest { file_path: file })
                .unwrap_or_else(|e| exit_with_error(&format!("Could not list types: {}", e)));
            print_json(&response);
        }
        Command::Type { file, position } => {
            let response: TypeResponse = service
                .get_type(&TypeRequest {
                    file_path: file,
                    position,
                })
                .unwrap_or_else(|e| exit_with_error(&format!("Could not read type: {}", e)));
            print_json(&response);
        }
        Command::UpdateType { file, type_data } => {
            let type_data: TypeData = read_json(&type_data);
            let response: TypeUpdateResponse = service
                .update_type(&TypeUpdateRequest {
                    file_path: file,
                    type_data,
                })
                .unwrap_or_else(|e| exit_with_error(&format!("Type update failed: {}", e)));
            print_json(&response);
        }
    }

    tracing::debug!(elapsed = ?started.elapsed(), "Request finished");
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_position(text: &str) -> Result<LinePosition, String> {
    let (line, offset) = text
        .split_once(':')
        .ok_or_else(|| format!("expected line:offset, got '{}'", text))?;
    let line = line
        .trim()
        .parse()
        .map_err(|e| format!("invalid line '{}': {}", line, e))?;
    let offset = offset
        .trim()
        .parse()
        .map_err(|e| format!("invalid offset '{}': {}", offset, e))?;
    Ok(LinePosition::new(line, offset))
}

fn whole_file(file: &PathBuf) -> (LinePosition, LinePosition) {
    let text = fs::read_to_string(file)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", file.display(), e)));
    let lines = text.split('\n').collect::<Vec<_>>();
    let last = lines.len().saturating_sub(1);
    let end = LinePosition::new(last as u32, lines[last].len() as u32);
    (LinePosition::default(), end)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> T {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", path.display(), e)));
    serde_json::from_str(&text)
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid JSON in '{}': {}", path.display(), e)))
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with_error(&format!("Failed to serialize result: {}", e)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
