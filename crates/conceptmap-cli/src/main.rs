//! Conceptmap CLI - build knowledge maps from study text

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use conceptmap_core::concept::{
    ConceptMap, ConceptMapBuilder, Entity, EntityExtractor, Flashcard, SourceDocument,
    combined_text,
};
use conceptmap_core::config::Config;
use conceptmap_core::llm::LlmClient;
use conceptmap_core::tagging::HeuristicTagger;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "conceptmap")]
#[command(author, version, about = "Build knowledge maps from study text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a concept map from one or more text files
    Generate {
        /// Source text files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Map title (defaults to the first file name)
        #[arg(short, long)]
        title: Option<String>,
        /// JSON file with flashcards to link: [{"id", "front", "back"}]
        #[arg(long)]
        flashcards: Option<PathBuf>,
        /// Canvas width
        #[arg(long)]
        width: Option<f64>,
        /// Canvas height
        #[arg(long)]
        height: Option<f64>,
        /// Layout iterations
        #[arg(long)]
        iterations: Option<usize>,
        /// Layout seed for reproducible positions
        #[arg(long)]
        seed: Option<u64>,
        /// Write the map to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the concepts that would become nodes (no LLM calls)
    Entities {
        /// Source text files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

/// Layout overrides given on the command line
#[derive(Debug, Default, Clone, Copy)]
struct LayoutOverrides {
    width: Option<f64>,
    height: Option<f64>,
    iterations: Option<usize>,
    seed: Option<u64>,
}

impl LayoutOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(width) = self.width {
            config.layout.width = width;
        }
        if let Some(height) = self.height {
            config.layout.height = height;
        }
        if let Some(iterations) = self.iterations {
            config.layout.iterations = iterations;
        }
        if self.seed.is_some() {
            config.layout.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up CONCEPTMAP_API_KEY / OPENROUTER_API_KEY from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.quiet { "conceptmap=warn" } else { "conceptmap=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.parse()?),
        )
        .init();

    match cli.command {
        Commands::Generate {
            files,
            title,
            flashcards,
            width,
            height,
            iterations,
            seed,
            output,
        } => {
            let overrides = LayoutOverrides {
                width,
                height,
                iterations,
                seed,
            };
            cmd_generate(
                &files,
                title.as_deref(),
                flashcards.as_deref(),
                overrides,
                output.as_deref(),
                cli.format,
                cli.quiet,
            )
            .await
        }

        Commands::Entities { files } => cmd_entities(&files, cli.format),

        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

async fn cmd_generate(
    files: &[PathBuf],
    title: Option<&str>,
    flashcards: Option<&Path>,
    overrides: LayoutOverrides,
    output: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    overrides.apply(&mut config);
    config.validate()?;

    let documents = load_documents(files)?;
    let cards = match flashcards {
        Some(path) => load_flashcards(path)?,
        None => Vec::new(),
    };

    let api_key = config.llm.resolved_api_key()?.ok_or_else(|| {
        anyhow!("No API key configured. Set CONCEPTMAP_API_KEY or OPENROUTER_API_KEY.")
    })?;
    let client = LlmClient::new(config.llm.clone(), api_key).map_err(report)?;

    let builder =
        ConceptMapBuilder::from_config(&config, Arc::new(HeuristicTagger::new()), Arc::new(client));

    let title = title
        .map(str::to_string)
        .or_else(|| documents.first().map(|d| d.title.clone()))
        .unwrap_or_else(|| "Concept map".to_string());

    info!(files = documents.len(), flashcards = cards.len(), "Starting generation");

    let map = builder
        .generate_concept_map(&title, &documents, &cards)
        .await
        .map_err(report)?;

    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&map).context("Failed to serialize concept map")?
        }
        OutputFormat::Text => render_map(&map),
    };

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            if !quiet {
                println!(
                    "Wrote {} concepts and {} links to {}",
                    map.nodes.len(),
                    map.edges.len(),
                    path.display()
                );
            }
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn cmd_entities(files: &[PathBuf], format: OutputFormat) -> anyhow::Result<()> {
    let documents = load_documents(files)?;
    let extractor = EntityExtractor::new(Arc::new(HeuristicTagger::new()));
    let entities = extractor
        .extract(&combined_text(&documents))
        .map_err(report)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&entities).context("Failed to serialize entities")?
        ),
        OutputFormat::Text => println!("{}", render_entities(&entities)),
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Read each file as a document; ids come from file stems and are made unique
fn load_documents(files: &[PathBuf]) -> anyhow::Result<Vec<SourceDocument>> {
    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(files.len());

    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file: {}", path.display()))?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let id = unique_id(&stem, &mut seen);

        debug!(id = %id, path = %path.display(), chars = text.len(), "Loaded document");
        documents.push(SourceDocument::new(id, title, text));
    }

    Ok(documents)
}

fn unique_id(stem: &str, seen: &mut HashSet<String>) -> String {
    let mut id = stem.to_string();
    let mut n = 2;
    while !seen.insert(id.clone()) {
        id = format!("{}-{}", stem, n);
        n += 1;
    }
    id
}

fn load_flashcards(path: &Path) -> anyhow::Result<Vec<Flashcard>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read flashcards file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse flashcards file: {}", path.display()))
}

/// Attach the error code and hint to a core error
fn report(err: conceptmap_core::Error) -> anyhow::Error {
    let message = format!("[{}] {}", err.code(), err);
    match err.suggestion() {
        Some(hint) => anyhow!("{}\nHint: {}", message, hint),
        None => anyhow!(message),
    }
}

fn render_map(map: &ConceptMap) -> String {
    if map.is_empty() {
        return format!("{}: no recurring concepts found.", map.title);
    }

    let mut out = format!(
        "{} ({} concepts, {} links)\n\nConcepts:\n",
        map.title,
        map.nodes.len(),
        map.edges.len()
    );
    for (rank, node) in map.nodes.iter().enumerate() {
        let (x, y) = node.position();
        out.push_str(&format!(
            "  {:>2}. {} [{}] importance {:.2} at ({:.0}, {:.0})\n      {}\n",
            rank + 1,
            node.name(),
            node.entity_type,
            node.importance,
            x,
            y,
            node.definition()
        ));
    }

    if !map.edges.is_empty() {
        out.push_str("\nLinks:\n");
        for edge in &map.edges {
            let name = |id: &str| map.node(id).map(|n| n.name().to_string()).unwrap_or_default();
            out.push_str(&format!(
                "  {} --{} ({:.2})--> {}\n",
                name(&edge.source_node_id),
                edge.relationship_type,
                edge.strength,
                name(&edge.target_node_id)
            ));
        }
    }

    out.trim_end().to_string()
}

fn render_entities(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return "No recurring concepts found.".to_string();
    }
    entities
        .iter()
        .map(|e| format!("{}\t{}\t{}", e.name, e.entity_type, e.frequency))
        .collect::<Vec<_>>()
        .join("\n")
}
