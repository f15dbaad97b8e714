use career_docs_core::{
    extract_text_or_message, ingest_folders, CharacterNgramEmbedder, CorrectionTable, Embedder,
    GeminiEmbedder, IngestionOptions, LocalVectorStore, Retriever, VectorStoreBuilder,
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_INDEX_DIR, GEMINI_EMBEDDING_MODEL,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "career-docs", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the persisted vector index.
    #[arg(long, env = "CAREER_DOCS_INDEX_DIR", default_value = DEFAULT_INDEX_DIR)]
    index_dir: PathBuf,

    /// Embedding backend.
    #[arg(long, value_enum, default_value_t = EmbedderKind::Gemini)]
    embedder: EmbedderKind,

    /// Google API key for the remote embedding service.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,

    /// Remote embedding model name.
    #[arg(long, default_value = GEMINI_EMBEDDING_MODEL)]
    embedding_model: String,

    /// JSON object of extra `misspelling -> correction` entries.
    #[arg(long)]
    corrections: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Gemini,
    Ngram,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk and embed the career documents, then save the index.
    Build {
        /// Folder to ingest; repeat for several. Defaults to the career document folders.
        #[arg(long = "folder")]
        folders: Vec<PathBuf>,
        /// Target chunk size in characters.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Characters shared by consecutive chunks.
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        chunk_overlap: usize,
        /// Only read files directly inside each folder.
        #[arg(long, default_value_t = false)]
        no_recursive: bool,
    },
    /// Retrieve the chunks closest to a question.
    Search {
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "4")]
        top_k: usize,
    },
    /// Print the text of an uploaded resume, or the reason it could not be read.
    Extract {
        #[arg(long)]
        path: PathBuf,
    },
    /// Apply typo corrections to a chat message.
    Normalize {
        #[arg(long)]
        text: String,
    },
}

const BASE_FOLDER: &str = "carrer_docs";
const DEFAULT_FOLDERS: [&str; 3] = ["Roadmap", "Resume", "Courses"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "career-docs boot"
    );

    let corrections = load_corrections(cli.corrections.as_deref())?;

    match cli.command {
        Command::Build {
            ref folders,
            chunk_size,
            chunk_overlap,
            no_recursive,
        } => {
            let folders = if folders.is_empty() {
                DEFAULT_FOLDERS
                    .iter()
                    .map(|name| Path::new(BASE_FOLDER).join(name))
                    .collect()
            } else {
                folders.clone()
            };
            let options = IngestionOptions {
                chunk_size,
                chunk_overlap,
                recursive: !no_recursive,
            };

            match cli.embedder {
                EmbedderKind::Gemini => {
                    let embedder = gemini_embedder(&cli)?;
                    build_index(&folders, &options, embedder, &cli.index_dir).await?;
                }
                EmbedderKind::Ngram => {
                    build_index(
                        &folders,
                        &options,
                        CharacterNgramEmbedder::default(),
                        &cli.index_dir,
                    )
                    .await?;
                }
            }
        }
        Command::Search { ref query, top_k } => {
            let store = LocalVectorStore::load(&cli.index_dir).await?;
            match cli.embedder {
                EmbedderKind::Gemini => {
                    let embedder = gemini_embedder(&cli)?;
                    search_index(&store, embedder, &corrections, query, top_k).await?;
                }
                EmbedderKind::Ngram => {
                    search_index(
                        &store,
                        CharacterNgramEmbedder::default(),
                        &corrections,
                        query,
                        top_k,
                    )
                    .await?;
                }
            }
        }
        Command::Extract { ref path } => {
            println!("{}", extract_text_or_message(path));
        }
        Command::Normalize { ref text } => {
            println!("{}", corrections.normalize(text));
        }
    }

    Ok(())
}

fn load_corrections(path: Option<&Path>) -> anyhow::Result<CorrectionTable> {
    let defaults = CorrectionTable::default();
    match path {
        Some(path) => {
            let extra = CorrectionTable::from_json_file(path)?;
            info!(path = %path.display(), entries = extra.len(), "loaded extra corrections");
            Ok(defaults.merged_with(&extra))
        }
        None => Ok(defaults),
    }
}

fn gemini_embedder(cli: &Cli) -> anyhow::Result<GeminiEmbedder> {
    let embedder = match &cli.google_api_key {
        Some(key) => GeminiEmbedder::new(key.as_str(), cli.embedding_model.as_str())?,
        None => GeminiEmbedder::from_env(cli.embedding_model.as_str())?,
    };
    info!(model = %cli.embedding_model, "google api key loaded");
    Ok(embedder)
}

async fn build_index<E: Embedder>(
    folders: &[PathBuf],
    options: &IngestionOptions,
    embedder: E,
    index_dir: &Path,
) -> anyhow::Result<()> {
    info!(folders = folders.len(), "loading and chunking documents");
    let report = ingest_folders(folders, options)?;

    if !report.skipped_files.is_empty() {
        warn!(skipped_files = report.skipped_files.len(), "some documents were skipped");
        for skipped in &report.skipped_files {
            warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
        }
    }
    if !report.ignored_files.is_empty() {
        info!(ignored_files = report.ignored_files.len(), "ignored unsupported files");
    }

    let processed = report.processed_files.len();
    let chunks = report.into_embeddable()?;
    info!(files = processed, chunk_count = chunks.len(), "documents chunked");

    let store = VectorStoreBuilder::new(embedder).build(&chunks).await?;
    let written = store.save(index_dir).await?;

    println!(
        "{} chunks from {} documents saved to {} at {}",
        store.len(),
        processed,
        written.display(),
        store.built_at().to_rfc3339()
    );
    Ok(())
}

async fn search_index<E: Embedder>(
    store: &LocalVectorStore,
    embedder: E,
    corrections: &CorrectionTable,
    query: &str,
    top_k: usize,
) -> anyhow::Result<()> {
    let retriever = Retriever::new(embedder, corrections);
    let retrieval = retriever.search(store, query, top_k).await?;

    println!("query: {}", retrieval.query);
    if retrieval.hits.is_empty() {
        println!("no matching chunks");
    }
    for hit in retrieval.hits {
        println!(
            "score={:.4} source={} chunk={}",
            hit.score, hit.chunk.source_path, hit.chunk.chunk_index
        );
        println!("{}\n", hit.chunk.content.trim());
    }
    Ok(())
}
