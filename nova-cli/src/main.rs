use clap::{Parser, Subcommand};
use nova_doc::chunk::{ChunkConfig, ChunkExtractor};
use nova_doc::render::RenderConfig;
use nova_doc::{Document, IdGenerator, read_document, render_document, write_document};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates a new document with a title heading
    New {
        title: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Checks that a file is a valid Nova document
    Validate { file: PathBuf },
    /// Re-emits a document as canonical pretty JSON
    Fmt {
        file: PathBuf,
        /// Rewrite the file in place
        #[arg(long)]
        write: bool,
    },
    /// Lists the retrieval chunks of a document
    Chunks {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Prints the render projection as JSON
    Render { file: PathBuf },
}

#[derive(Serialize)]
struct ChunkReport<'a> {
    chunks: &'a [nova_doc::Chunk],
    stats: nova_doc::ChunkStats,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::New { title, output } => new_command(title, output.as_deref()),
        Commands::Validate { file } => validate_command(file),
        Commands::Fmt { file, write } => fmt_command(file, *write),
        Commands::Chunks { file, json } => chunks_command(file, *json),
        Commands::Render { file } => render_command(file),
    }
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {err}");
    process::exit(1);
}

fn load(file: &Path) -> Document {
    tracing::debug!(file = %file.display(), "loading document");
    read_document(file).unwrap_or_else(|err| fail(err))
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(encoded) => println!("{encoded}"),
        Err(err) => fail(err),
    }
}

fn new_command(title: &str, output: Option<&Path>) {
    let document = Document::new_template(title, &mut IdGenerator::default());
    match output {
        Some(path) => {
            if let Err(err) = write_document(path, &document) {
                fail(err);
            }
            println!("Created {}", path.display());
        }
        None => println!("{}", document.to_json_pretty()),
    }
}

fn validate_command(file: &Path) {
    let document = load(file);
    let unknown: Vec<&str> = document
        .walk_blocks()
        .filter(|block| block.kind().is_none())
        .map(|block| block.tag())
        .collect();
    for tag in &unknown {
        println!("Unknown block type: {tag}");
    }
    println!(
        "Valid: {} ({} blocks)",
        document.metadata.title,
        document.walk_blocks().count()
    );
}

fn fmt_command(file: &Path, write: bool) {
    let document = load(file);
    if write {
        if let Err(err) = write_document(file, &document) {
            fail(err);
        }
        println!("Formatted {}", file.display());
    } else {
        println!("{}", document.to_json_pretty());
    }
}

fn chunks_command(file: &Path, json: bool) {
    let document = load(file);
    let extractor = ChunkExtractor::with_config(ChunkConfig::default());
    let extraction = extractor.extract(&document);
    let stats = extraction.stats();

    if json {
        print_json(&ChunkReport {
            chunks: &extraction.chunks,
            stats,
        });
        return;
    }

    for (index, chunk) in extraction.chunks.iter().enumerate() {
        println!(
            "Chunk {} [{}] {} tokens",
            index + 1,
            chunk.label,
            chunk.tokens
        );
        println!("  {}", chunk.preview(extractor.config().preview_len));
    }
    println!(
        "{} chunks, {} tokens, {} avg tokens/chunk",
        stats.count, stats.total_tokens, stats.average_tokens
    );
}

fn render_command(file: &Path) {
    let document = load(file);
    let rendered = render_document(&document, &RenderConfig::for_document(&document));
    print_json(&rendered);
}
