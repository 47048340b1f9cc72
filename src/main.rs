use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use product_rag::core;
use product_rag::core::config::{AppPaths, ConfigService, RagSettings};
use product_rag::embedding::EmbeddingClient;
use product_rag::llm::OpenAiProvider;
use product_rag::pipeline::IndexPipeline;
use product_rag::server;
use product_rag::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "product-rag",
    about = "Semantic search and recommendations over scraped product data"
)]
struct Cli {
    /// Path to config.yml; overrides discovery.
    #[arg(long, global = true, env = "PRODUCT_RAG_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the index from the scraped JSONL files.
    Build,
    /// Run one query against the persisted index.
    Query {
        text: String,
        #[arg(long)]
        top_k: Option<usize>,
        /// Skip the chat-model recommendation.
        #[arg(long)]
        no_recommend: bool,
    },
    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);
    let config = ConfigService::new(paths.clone()).with_config_path(cli.config.clone());

    match cli.command {
        Command::Build => build(&config).await,
        Command::Query {
            text,
            top_k,
            no_recommend,
        } => query(config, &text, top_k, !no_recommend).await,
        Command::Serve { port } => serve(config, port).await,
    }
}

async fn build(config: &ConfigService) -> anyhow::Result<()> {
    let raw = config.load_config().context("Failed to load configuration")?;
    let settings = RagSettings::from_config(&raw);

    let provider = OpenAiProvider::new(
        &settings.embedding.base_url,
        settings.api_key.as_deref(),
        settings.embedding.timeout,
    )?;
    let embedder = EmbeddingClient::new(Arc::new(provider), &settings.embedding);
    let pipeline = IndexPipeline::from_settings(config.paths(), &settings, embedder);

    let report = pipeline.run().await.context("Index build failed")?;
    tracing::info!(
        "Indexed {} products (dimension {})",
        report.vectors_indexed,
        report.dimension
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn query(
    config: ConfigService,
    text: &str,
    top_k: Option<usize>,
    recommend: bool,
) -> anyhow::Result<()> {
    let state = AppState::initialize(config)?;
    let engine = state.engine()?;
    let limits = &state.settings.query;
    let top_k = top_k.unwrap_or(limits.top_k).clamp(1, limits.max_top_k);

    let results = engine.search(text, top_k).await?;

    println!("Top matches:\n");
    for hit in &results {
        let product = &hit.product;
        println!(
            "{}. {}  -  {}\n   {}\n   Rating: {}\n",
            hit.rank,
            product.title,
            product.price.as_deref().unwrap_or("n/a"),
            product.url,
            product.rating.as_deref().unwrap_or("n/a")
        );
    }

    if recommend {
        let products: Vec<_> = results.into_iter().map(|hit| hit.product).collect();
        let recommendation = state.advisor.recommend(text, &products).await;
        println!("Recommendation:\n\n{}", recommendation.text);
    }
    Ok(())
}

async fn serve(config: ConfigService, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::initialize(config)?;

    let port = port.unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("PRODUCT_RAG_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
