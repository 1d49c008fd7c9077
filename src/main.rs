use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use faultgraph_rs::compiler::{Compiler, CompilerConfig};
use faultgraph_rs::engine::InferenceEngine;
use faultgraph_rs::graph::{NodeTable, Registry};
use faultgraph_rs::loader::GraphLoader;
use faultgraph_rs::operators::{
    register_builtins, register_diagnosis_operators, OperatorRegistry,
};

use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a flow chart into a node table and an expression map
    Flow {
        /// Path to the flow chart (flow.json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory, defaults to the flow chart's directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile a node table and expression map into graph files
    Compile {
        /// Path to the keyed node table (node.json)
        #[arg(short, long)]
        nodes: PathBuf,

        /// Path to the expression map (compute.json)
        #[arg(short, long)]
        expressions: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// First virtual-group id
        #[arg(long, default_value_t = 10001)]
        virtual_start: u64,

        /// First operator id
        #[arg(long, default_value_t = 20001)]
        operator_start: u64,
    },
    /// Run one diagnosis over a graph definition
    Diagnose {
        /// Path to the graph definition
        #[arg(short, long)]
        graph: PathBuf,

        /// Fixed data-source values, `{ name: value }`
        #[arg(short, long)]
        values: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let loader = GraphLoader::new();

    match args.command {
        Commands::Flow { input, output } => {
            let (nodes, expressions) = loader
                .load_flow(&input)
                .with_context(|| format!("loading flow from {}", input.display()))?;

            let output = output
                .or_else(|| input.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            fs::create_dir_all(&output)?;

            let node_file = output.join("node.json");
            let compute_file = output.join("compute.json");
            let node_count = nodes.len();
            fs::write(
                &node_file,
                serde_json::to_string_pretty(&NodeTable(nodes))?,
            )?;
            fs::write(&compute_file, serde_json::to_string_pretty(&expressions)?)?;

            println!("Nodes written to {}", node_file.display());
            println!("Expressions written to {}", compute_file.display());
            println!(
                "Nodes: {}, expressions: {}",
                node_count,
                expressions.len()
            );
        }
        Commands::Compile {
            nodes,
            expressions,
            output,
            virtual_start,
            operator_start,
        } => {
            let config = CompilerConfig {
                virtual_id_start: virtual_start,
                operator_id_start: operator_start,
                ..CompilerConfig::default()
            };
            config.validate()?;

            let node_table = loader
                .load_node_table(&nodes)
                .with_context(|| format!("loading nodes from {}", nodes.display()))?;
            let expressions = loader
                .load_expressions(&expressions)
                .with_context(|| format!("loading expressions from {}", expressions.display()))?;

            let mut registry = Registry::with_config(&config);
            for node in node_table {
                registry.register(node);
            }

            let failures = Compiler::new(&mut registry).compile_all(&expressions);
            for (target, e) in &failures {
                log::warn!("Skipped expression for {}: {}", target, e);
            }

            fs::create_dir_all(&output)?;
            let graph_file = output.join("graph_data.json");
            let mapping_file = output.join("graph_mapping.json");
            fs::write(
                &graph_file,
                serde_json::to_string_pretty(&registry.to_definition())?,
            )?;
            fs::write(
                &mapping_file,
                serde_json::to_string_pretty(&registry.mapping())?,
            )?;

            let stats = registry.stats();
            println!("Graph written to {}", graph_file.display());
            println!("Mapping written to {}", mapping_file.display());
            println!(
                "Nodes: {}, edges: {}, virtual nodes: {}, operator nodes: {}, failed expressions: {}",
                stats.total_nodes,
                stats.total_edges,
                stats.virtual_nodes,
                stats.operator_nodes,
                failures.len()
            );
        }
        Commands::Diagnose { graph, values } => {
            let definition = loader
                .load_definition(&graph)
                .with_context(|| format!("loading graph from {}", graph.display()))?;

            let mut registry = Registry::from_definition(&definition);
            let failures = Compiler::new(&mut registry).compile_all(&definition.expressions);
            for (target, e) in &failures {
                log::warn!("Skipped expression for {}: {}", target, e);
            }

            let mut operators = OperatorRegistry::new();
            register_builtins(&mut operators);
            register_diagnosis_operators(&mut operators);
            if let Some(path) = values {
                let fixed = loader
                    .load_values(&path)
                    .with_context(|| format!("loading values from {}", path.display()))?;
                for (name, value) in fixed {
                    log::info!("Using fixed value for {}: {}", name, value);
                    operators.register_fixed_value(name, value);
                }
            }

            let engine = InferenceEngine::new(&registry, &operators);
            let result = engine.run();

            println!("{}", serde_json::to_string_pretty(&result)?);
            print!("{}", result.summary(&registry));
        }
    }

    Ok(())
}
