use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::time::Instant;
use tunegraph::catalog::ModelCatalog;
use tunegraph::graph::CanvasExport;
use tunegraph::prelude::*;

/// Validate, edit and compile fine-tuning pipeline graphs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to an engine config JSON file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Path to a model catalog JSON file, replacing the built-in catalog
    #[arg(long, global = true)]
    catalog: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the dataset -> model -> training topology of a graph
    Validate {
        /// Path to the graph JSON file
        graph_path: String,
        /// Read the file as a canvas export instead of a canonical graph
        #[arg(long)]
        canvas: bool,
    },
    /// Compile a graph into the training service's job description
    Compile {
        graph_path: String,
        #[arg(long)]
        canvas: bool,
        #[arg(long)]
        training_id: String,
        #[arg(long)]
        project_name: String,
        /// Overrides the configured createdBy value
        #[arg(long)]
        created_by: Option<String>,
        /// Write the job JSON here instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Apply a turn of tool invocations to a graph
    Apply {
        graph_path: String,
        /// JSON array of invocations, or an object with `invocations` and `createdNodeIds`
        invocations_path: String,
        #[arg(long)]
        canvas: bool,
        /// Roll the whole turn back if any invocation fails
        #[arg(long)]
        atomic: bool,
        /// Write the edited graph here instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Resolve a free-text model name against the catalog
    ResolveModel {
        /// e.g. "the smaller llama"
        name: String,
    },
}

// --- Turn File Formats ---

#[derive(Deserialize)]
#[serde(untagged)]
enum TurnFile {
    Invocations(Vec<RawToolInvocation>),
    Turn {
        invocations: Vec<RawToolInvocation>,
        #[serde(default, rename = "createdNodeIds")]
        created_node_ids: Vec<NodeId>,
    },
}

impl TurnFile {
    fn into_parts(self) -> (Vec<RawToolInvocation>, Vec<NodeId>) {
        match self {
            TurnFile::Invocations(invocations) => (invocations, Vec::new()),
            TurnFile::Turn {
                invocations,
                created_node_ids,
            } => (invocations, created_node_ids),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => EngineConfig::default(),
    };
    let catalog = match &cli.catalog {
        Some(path) => ModelCatalog::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load catalog: {}", e))),
        None => ModelCatalog::default(),
    };

    match cli.command {
        Command::Validate { graph_path, canvas } => run_validate(&graph_path, canvas),
        Command::Compile {
            graph_path,
            canvas,
            training_id,
            project_name,
            created_by,
            out,
        } => {
            let created_by = created_by.unwrap_or_else(|| config.created_by.clone());
            let context = JobContext::new(training_id, project_name, created_by);
            run_compile(&graph_path, canvas, context, &config, out.as_deref());
        }
        Command::Apply {
            graph_path,
            invocations_path,
            canvas,
            atomic,
            out,
        } => run_apply(
            &graph_path,
            &invocations_path,
            canvas,
            atomic,
            catalog,
            config,
            out.as_deref(),
        ),
        Command::ResolveModel { name } => run_resolve(&name, &catalog),
    }
}

fn load_graph(path: &str, canvas: bool) -> GraphState {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read graph file '{}': {}", path, e)));
    let loaded = if canvas {
        CanvasExport::from_json(&json).and_then(IntoGraph::into_graph)
    } else {
        GraphState::from_json(&json)
    };
    loaded.unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph: {}", e)))
}

fn run_validate(graph_path: &str, canvas: bool) {
    let graph = load_graph(graph_path, canvas);
    let report = validate_topology(&graph);

    if report.is_valid {
        println!("Graph is valid.");
        println!(
            "  -> Training: {}",
            report.training_node_id.as_deref().unwrap_or("-")
        );
        println!(
            "  -> Model: {}",
            report.model_node_id.as_deref().unwrap_or("-")
        );
        println!("  -> Datasets: {}", report.dataset_node_ids.join(", "));
    } else {
        println!("Graph is invalid:");
        for message in report.messages() {
            println!("  -> {}", message);
        }
        std::process::exit(2);
    }
}

fn run_compile(
    graph_path: &str,
    canvas: bool,
    context: JobContext,
    config: &EngineConfig,
    out: Option<&str>,
) {
    let graph = load_graph(graph_path, canvas);
    let compile_start = Instant::now();
    let job = Compiler::builder(&graph, context)
        .with_config(config)
        .build()
        .compile()
        .unwrap_or_else(|failure| {
            let details = failure
                .messages()
                .iter()
                .map(|m| format!("\n  -> {}", m))
                .collect::<String>();
            exit_with_error(&format!("Compilation failed:{}", details))
        });
    let compile_duration = compile_start.elapsed();

    for warning in &job.warnings {
        eprintln!("Warning: {}", warning);
    }
    let json = job
        .to_json_pretty()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize job: {}", e)));
    write_output(out, &json);
    eprintln!(
        "Compiled {} nodes and {} edges in {:?}",
        job.output.node_schema.nodes.len(),
        job.output.node_schema.edges.len(),
        compile_duration
    );
}

fn run_apply(
    graph_path: &str,
    invocations_path: &str,
    canvas: bool,
    atomic: bool,
    catalog: ModelCatalog,
    config: EngineConfig,
    out: Option<&str>,
) {
    let graph = load_graph(graph_path, canvas);
    let turn_json = fs::read_to_string(invocations_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read invocations file '{}': {}",
            invocations_path, e
        ))
    });
    let turn: TurnFile = serde_json::from_str(&turn_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse invocations: {}", e)));
    let (invocations, created_node_ids) = turn.into_parts();

    let store = GraphStore::from_state(graph)
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid graph: {}", e)));
    let shared = SharedGraph::new(store, catalog, config);
    let report = if atomic {
        shared.run_turn_atomic(&invocations, created_node_ids)
    } else {
        shared.run_turn(&invocations, created_node_ids)
    };

    for (index, reply) in report.replies.iter().enumerate() {
        let status = if reply.success { "ok" } else { "failed" };
        eprintln!("#{} [{}] {}", index + 1, status, reply.message);
    }
    eprintln!(
        "{}/{} invocations applied; created nodes: [{}]",
        report.processed_count,
        invocations.len(),
        report.updated_created_node_ids.join(", ")
    );

    let json = shared
        .state()
        .to_json_pretty()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize graph: {}", e)));
    write_output(out, &json);
    if !report.success {
        std::process::exit(2);
    }
}

fn run_resolve(name: &str, catalog: &ModelCatalog) {
    match catalog.resolve(name) {
        Ok(entry) => {
            println!("{}", entry.id);
            println!(
                "  -> {} ({}, {}B parameters)",
                entry.display_name, entry.provider, entry.parameter_count
            );
        }
        Err(e) => exit_with_error(&e.to_string()),
    }
}

fn write_output(out: Option<&str>, content: &str) {
    match out {
        Some(path) => fs::write(path, content)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", path, e))),
        None => println!("{}", content),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
