use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use structeasy::{
    datatypes::{ElementMap, NodeMap},
    error::{Result, StructeasyError},
    input::load_material_test,
    mesher::{import_geofile, ImportBackend, ImportOptions, GMSH_ENV},
    post_processor::{plot_model, PlotOptions},
    solver::{
        create_nodes, material_tester, start_model, Domain, ModelDimension, TclScriptEngine,
    },
};

/// Structural models from gmsh geometry
#[derive(Parser)]
#[command(name = "structeasy")]
#[command(about = "Import, inspect and export line-element structural models", long_about = None)]
#[command(version)]
struct Cli {
    /// How geometry files are read: auto, native or gmsh
    #[arg(long, global = true, default_value = "auto")]
    backend: ImportBackend,

    /// The gmsh executable
    #[arg(long, global = true, env = GMSH_ENV, default_value = "gmsh")]
    gmsh: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a geometry and print a summary of the model
    Import {
        geometry: PathBuf,
    },

    /// Show the model in an interactive 3D scene
    Plot {
        geometry: PathBuf,

        /// Label nodes and elements with their ids
        #[arg(long)]
        numbers: bool,

        /// Add physical tags to the labels
        #[arg(long)]
        tags: bool,

        /// One color per physical tag
        #[arg(long)]
        color_by_tag: bool,

        /// Save the scene to this html file
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,

        #[arg(long)]
        legend: bool,

        /// Do not open the browser
        #[arg(long)]
        no_show: bool,

        /// Program used to open the scene instead of the system default
        #[arg(long, value_name = "PROGRAM")]
        browser: Option<PathBuf>,
    },

    /// Write the nodes of a geometry as an OpenSees Tcl script
    ExportTcl {
        geometry: PathBuf,

        /// Model space, "2d" or "3d"
        #[arg(long, default_value = "3d")]
        dim: ModelDimension,

        /// Output script, stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a strain driven uniaxial material test from a json input file
    MaterialTest {
        input: PathBuf,

        /// Where to write the stress-strain chart (svg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("structeasy: {err}");
        std::process::exit(1)
    }
}

fn run(cli: Cli) -> Result<()> {
    let import_options = ImportOptions {
        backend: cli.backend,
        gmsh_executable: cli.gmsh,
    };

    match cli.command {
        Commands::Import { geometry } => {
            let (nodes, elements) = import_geofile(&geometry, &import_options)?;
            print_summary(&nodes, &elements);
            Ok(())
        }
        Commands::Plot {
            geometry,
            numbers,
            tags,
            color_by_tag,
            save,
            legend,
            no_show,
            browser,
        } => {
            let (nodes, elements) = import_geofile(&geometry, &import_options)?;
            let mut options = PlotOptions {
                show_numbers: numbers,
                show_tags: tags,
                color_by_tag,
                show_legend: legend,
                show: !no_show,
                browser,
                ..PlotOptions::default()
            };
            if let Some(filename) = save {
                options.save_html = true;
                options.filename = filename;
            }
            plot_model(&nodes, &elements, &options)?;
            Ok(())
        }
        Commands::ExportTcl {
            geometry,
            dim,
            output,
        } => {
            let (nodes, _) = import_geofile(&geometry, &import_options)?;
            let out: Box<dyn Write> = match &output {
                Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };
            export_tcl(out, &geometry, dim, &nodes)
        }
        Commands::MaterialTest { input, output } => {
            let test = load_material_test(&input)?;

            let mut domain = Domain::new();
            for (tag, material) in test.materials {
                domain.add_uniaxial_material(tag, material)?;
            }

            let mut options = test.options;
            options.output = output;

            let curve = material_tester(&mut domain, test.mat_tag, &test.strain, &options)
                .ok_or_else(|| {
                    StructeasyError::Solver(format!("material test of {} failed", test.mat_tag))
                })?;
            println!(
                "{}: {} steps, peak stress {}",
                curve.plot_title(),
                curve.strain.len(),
                curve.peak_stress()
            );
            Ok(())
        }
    }
}

fn export_tcl(
    out: Box<dyn Write>,
    geometry: &Path,
    dim: ModelDimension,
    nodes: &NodeMap,
) -> Result<()> {
    let mut engine = TclScriptEngine::new(out);
    engine.comment(&format!("nodes of {}", geometry.display()))?;
    start_model(&mut engine, &dim.to_string())?;
    create_nodes(&mut engine, nodes)?;
    engine.into_inner().flush()?;
    Ok(())
}

fn print_summary(nodes: &NodeMap, elements: &ElementMap) {
    println!("{} nodes, {} elements", nodes.len(), elements.len());

    let mut by_tag: BTreeMap<i32, (usize, usize, f64)> = BTreeMap::new();
    for node in nodes.values() {
        by_tag.entry(node.tag).or_default().0 += 1;
    }
    for element in elements.values() {
        let entry = by_tag.entry(element.tag).or_default();
        entry.1 += 1;
        entry.2 += element.length().unwrap_or(0.0);
    }

    println!("{:>6} {:>8} {:>10} {:>14}", "tag", "nodes", "elements", "total length");
    for (tag, (node_count, element_count, length)) in by_tag {
        println!("{tag:>6} {node_count:>8} {element_count:>10} {length:>14.4}");
    }
}
