use clap::{Parser, Subcommand};
use mapwright_assets::TextureCollection;
use mapwright_command::{CommandProcessor, SetEntityDefinitionFileCommand};
use mapwright_common::{EditorConfig, MAX_PATCH_SUBDIVISIONS};
use mapwright_model::{
    BezierPatch, DocumentEvent, EntityDefinitionFileSpec, MapDocument, PatchNode, PatchPoint,
};
use mapwright_tools::MapInspector;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mapwright-cli", about = "CLI tool for map documents")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Editor config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective configuration
    Info,
    /// Write an empty map document
    New {
        /// Output path
        map: PathBuf,
    },
    /// Print a summary of a map document
    Inspect {
        map: PathBuf,
    },
    /// Set the entity definition file of a map
    SetDefs {
        map: PathBuf,
        /// e.g. "builtin:Quake.fgd" or "external:/path/to/defs.fgd"
        spec: String,
        /// Undo the change again before saving
        #[arg(long)]
        undo: bool,
    },
    /// Tessellate a flat Bezier patch and print the grid size
    PatchGrid {
        /// Control point rows (odd, at least 3)
        #[arg(long, default_value = "3")]
        rows: usize,
        /// Control point columns (odd, at least 3)
        #[arg(long, default_value = "3")]
        cols: usize,
        /// Subdivisions per surface; defaults to the configured value
        #[arg(long)]
        subdivisions: Option<usize>,
    },
    /// List the textures of a texture manifest
    Textures {
        manifest: PathBuf,
    },
}

/// The `--subdivisions` override, or the configured value.
fn patch_subdivisions(requested: Option<usize>, config: &EditorConfig) -> anyhow::Result<usize> {
    let subdivisions = requested.unwrap_or(config.patch_subdivisions);
    anyhow::ensure!(
        subdivisions <= MAX_PATCH_SUBDIVISIONS,
        "--subdivisions must be at most {MAX_PATCH_SUBDIVISIONS}, got {subdivisions}"
    );
    Ok(subdivisions)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("mapwright-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("{}", serde_yaml::to_string(&config)?.trim_end());
        }
        Commands::New { map } => {
            let document = MapDocument::new();
            document.save(&map)?;
            tracing::info!(path = %map.display(), "new document written");
            println!("Wrote {}", map.display());
            println!("{}", MapInspector::summary(&document));
        }
        Commands::Inspect { map } => {
            let document = MapDocument::load(&map)?;
            println!("{}", MapInspector::summary(&document));
            for id in MapInspector::list_entities(&document) {
                if let Some(info) = MapInspector::inspect_entity(&document, id) {
                    println!("  {info}");
                }
            }
        }
        Commands::SetDefs { map, spec, undo } => {
            let mut document = MapDocument::load(&map)?;
            let observed = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&observed);
            document.add_observer(Box::new(move |event: &DocumentEvent| {
                sink.borrow_mut().push(event.clone());
            }));

            let mut processor = CommandProcessor::from_config(&config);
            let spec = EntityDefinitionFileSpec::parse(&spec);
            let before = document.entity_definition_file();
            processor.submit(&mut document, Box::new(SetEntityDefinitionFileCommand::new(spec)))?;
            println!("Entity definitions: '{before}' -> '{}'", document.entity_definition_file());
            if undo {
                processor.undo(&mut document)?;
                println!("Undone: '{}'", document.entity_definition_file());
            }
            if processor.is_modified() {
                document.save(&map)?;
                tracing::info!(path = %map.display(), "document saved");
            } else {
                tracing::info!(path = %map.display(), "document unchanged, not saved");
            }

            for event in observed.borrow().iter() {
                println!("  notified: {event:?}");
            }
        }
        Commands::PatchGrid {
            rows,
            cols,
            subdivisions,
        } => {
            let subdivisions = patch_subdivisions(subdivisions, &config)?;
            let points = (0..rows * cols)
                .map(|i| {
                    let (r, c) = (i / cols, i % cols);
                    PatchPoint::new(
                        c as f32,
                        (rows - 1 - r) as f32,
                        0.0,
                        c as f32 / (cols - 1) as f32,
                        r as f32 / (rows - 1) as f32,
                    )
                })
                .collect();
            let patch = BezierPatch::new(rows, cols, points, "__TB_empty")?;
            let node = PatchNode::with_subdivisions(patch, subdivisions);
            let grid = node.grid();
            println!(
                "Patch {rows}x{cols}: grid {}x{} points, {}x{} quads",
                grid.point_row_count,
                grid.point_column_count,
                grid.quad_row_count(),
                grid.quad_column_count()
            );
            if let Some((min, max)) = grid.bounds() {
                println!("Bounds: {min} .. {max}");
            }
        }
        Commands::Textures { manifest } => {
            let collection = TextureCollection::load_manifest(&manifest)?;
            println!(
                "{}: {} textures",
                collection.path().display(),
                collection.len()
            );
            for (id, texture) in collection.textures() {
                println!(
                    "  {:016x} {} {}x{} {:?}",
                    id.0,
                    texture.name(),
                    texture.width(),
                    texture.height(),
                    texture.texture_type()
                );
            }
        }
    }

    Ok(())
}
