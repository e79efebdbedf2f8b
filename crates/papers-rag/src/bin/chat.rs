//! Terminal question answering over a paper corpus
//!
//! Run with: cargo run -p papers-rag -- --corpus papers.txt

use anyhow::Context;
use clap::Parser;
use papers_rag::{Answer, RagConfig, RagPipeline};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "papers-rag", version, about = "Ask questions about a corpus of papers")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Corpus file, directory or URL (overrides the configuration)
    #[arg(long)]
    corpus: Option<String>,

    /// Number of chunks given to the model as context
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Answer a single question and exit
    #[arg(short, long)]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papers_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => RagConfig::default(),
    };
    if let Some(corpus) = args.corpus {
        config.corpus.source = corpus;
    }
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Corpus: {}", config.corpus.source);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let pipeline = RagPipeline::initialize(config)
        .await
        .context("failed to initialize the pipeline")?;

    match args.question {
        Some(question) => {
            let answer = pipeline.ask(&question).await?;
            print_answer(&answer);
        }
        None => interactive(&pipeline).await?,
    }

    pipeline.shutdown();
    Ok(())
}

async fn interactive(pipeline: &RagPipeline) -> anyhow::Result<()> {
    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                        Papers RAG                         ║
║          Ask questions, type 'exit' to finish             ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        // A failed question is reported and the loop continues
        match pipeline.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => eprintln!("error: {}", e),
        }
    }

    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.format_with_sources());
}
