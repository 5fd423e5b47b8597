//! ragbot CLI entry point
//!
//! - `ragbot` / `ragbot serve` - HTTP server (default)
//! - `ragbot ingest` - rebuild the collection from a source document
//! - `ragbot ask <question>` - one-shot grounded answer
//! - `ragbot translate <text>` - translation with an example sentence
//! - `ragbot report <notes>` - weekly report from work notes
//! - `ragbot config` - show or validate the effective configuration

use anyhow::Context;
use ragbot::{
    api::create_router,
    cli::{output::Output, Cli, Commands},
    db::{VectorIndexClient, VectorStoreProvider},
    llm::{ReportGenerator, Translator},
    rag::{
        embeddings::EmbeddingProvider,
        ingest::IngestionPipeline,
        service::{REPORT_TEMPERATURE, TRANSLATE_TEMPERATURE},
    },
    AppError, AppState, Config, Provider, RagRuntime,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Err(e) = run(cli, &output).await {
        match e.downcast_ref::<AppError>() {
            Some(app) if app.hint().is_some() => output.failure(app),
            _ => output.error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let mut config = load_config(&cli.config)?;
    init_tracing(&config, cli.verbose, cli.json_logs);

    match cli.command {
        None => serve(config, output).await,
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config, output).await
        }
        Some(Commands::Ingest {
            source,
            collection,
            chunk_size,
            chunk_overlap,
        }) => {
            if let Some(size) = chunk_size {
                config.ingest.chunk_size = size;
            }
            if let Some(overlap) = chunk_overlap {
                config.ingest.chunk_overlap = overlap;
            }
            if let Some(collection) = collection {
                config.index.collection = collection;
            }
            let source = source.unwrap_or_else(|| PathBuf::from(&config.ingest.source_file));
            ingest(config, &source, output).await
        }
        Some(Commands::Ask { question }) => ask(config, &question, output).await,
        Some(Commands::Translate { text, target_lang }) => {
            translate(config, &text, &target_lang, output).await
        }
        Some(Commands::Report { notes, file }) => {
            let notes = match (notes, file) {
                (_, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read notes from {}", path.display()))?,
                (Some(notes), None) => notes,
                (None, None) => String::new(),
            };
            report(config, &notes, output).await
        }
        Some(Commands::Config { validate }) => show_config(&config, validate, output),
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn init_tracing(config: &Config, verbose: bool, json: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn serve(config: Config, output: &Output) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let runtime = Arc::new(RagRuntime::new(config.clone())?);
    let state = AppState::new(config.clone(), runtime.clone());
    let app = create_router().with_state(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.banner();
    output.info(&format!("Listening on http://{}", addr));
    info!(
        addr = %addr,
        collection = %config.index.collection,
        embedding = %config.embedding.provider,
        llm = %config.llm.provider,
        "Server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    runtime.shutdown();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Ingestion needs no chat model, so it builds its clients without a
/// [`RagRuntime`].
async fn ingest(config: Config, source: &Path, output: &Output) -> anyhow::Result<()> {
    config.validate()?;
    let timeout = config.request_timeout();
    let embedder = EmbeddingProvider::from_config(&config.embedding)?.create_client(timeout)?;
    let store = VectorStoreProvider::from_config(&config.index)?.create_store(timeout)?;

    output.info(&format!(
        "Ingesting {} into '{}' (chunk_size={}, chunk_overlap={}, embeddings={}/{})",
        source.display(),
        config.index.collection,
        config.ingest.chunk_size,
        config.ingest.chunk_overlap,
        embedder.provider_name(),
        embedder.model_name(),
    ));

    let pipeline = IngestionPipeline::new(
        embedder,
        VectorIndexClient::new(store),
        config.index.url.clone(),
    );
    let report = pipeline
        .run(
            source,
            config.ingest.chunk_size,
            config.ingest.chunk_overlap,
            &config.index.collection,
        )
        .await?;

    output.ingest_report(&report);
    Ok(())
}

async fn ask(config: Config, question: &str, output: &Output) -> anyhow::Result<()> {
    let runtime = RagRuntime::new(Arc::new(config))?;
    let response = runtime.ask(question).await?;
    output.answer(&response);
    runtime.shutdown();
    Ok(())
}

/// Translation and reports talk to the chat model only; no index or
/// embedding provider is built.
async fn translate(
    config: Config,
    text: &str,
    target_lang: &str,
    output: &Output,
) -> anyhow::Result<()> {
    config.validate()?;
    let llm = Provider::from_config(&config)?
        .create_client(config.request_timeout(), TRANSLATE_TEMPERATURE)?;
    let translation = Translator::new(llm).translate(text, target_lang).await?;
    output.translation(&translation);
    Ok(())
}

async fn report(config: Config, notes: &str, output: &Output) -> anyhow::Result<()> {
    config.validate()?;
    let llm = Provider::from_config(&config)?
        .create_client(config.request_timeout(), REPORT_TEMPERATURE)?;
    let report = ReportGenerator::new(llm).generate(notes).await?;
    output.report(&report);
    Ok(())
}

fn show_config(config: &Config, validate_only: bool, output: &Output) -> anyhow::Result<()> {
    let checked = config
        .validate()
        .and_then(|_| EmbeddingProvider::from_config(&config.embedding).map(|_| ()))
        .and_then(|_| VectorStoreProvider::from_config(&config.index).map(|_| ()))
        .and_then(|_| Provider::from_config(config).map(|_| ()));

    if validate_only {
        checked?;
        output.success("Configuration is valid");
        return Ok(());
    }

    output.config(&config.redacted());
    match checked {
        Ok(()) => output.success("Configuration is valid"),
        Err(e) => output.warning(&e.to_string()),
    }
    Ok(())
}
