use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dossier::application::ports::{BlobStore, CompletionOptions, LlmClient, TaskDispatcher};
use dossier::application::services::{
    CategorizerService, ChannelTaskDispatcher, PersonaBuilderService, PipelineProcessors,
    PipelineWorker, StageRouter, TextNormalizer,
};
use dossier::infrastructure::llm::{OpenAiClient, RateLimitedLlmClient};
use dossier::infrastructure::observability::{TracingConfig, init_tracing};
use dossier::infrastructure::storage::{BlobStoreFactory, NotifyingBlobStore};
use dossier::infrastructure::text_processing::{
    CompositeFileLoader, OverlappingWindowSplitter, PdfOxideExtractor,
};
use dossier::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("loading configuration")?;
    settings.validate().context("validating configuration")?;

    init_tracing(&TracingConfig::new(
        environment.as_str(),
        settings.logging.json,
    ));

    let pipeline = &settings.pipeline;
    let queue_capacity = pipeline.queue_capacity.max(1);

    let base_store = BlobStoreFactory::create(&settings.storage)?;
    let (event_tx, event_rx) = mpsc::channel(queue_capacity);
    let notify_stages = pipeline.notify_stages()?;
    let store: Arc<dyn BlobStore> = if notify_stages.is_empty() {
        base_store
    } else {
        tracing::info!(stages = ?notify_stages, "Storage notifications enabled");
        Arc::new(NotifyingBlobStore::new(
            base_store,
            settings.storage.bucket_name(),
            notify_stages,
            event_tx,
        ))
    };

    let chat_client: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_settings(&settings.llm)?);
    let llm = RateLimitedLlmClient::wrap(chat_client, settings.llm.rate_limit);

    let (dispatcher, task_rx) = ChannelTaskDispatcher::channel(queue_capacity);
    let dispatcher: Arc<dyn TaskDispatcher> = Arc::new(dispatcher);

    let splitter = Arc::new(OverlappingWindowSplitter::new(
        pipeline.chunk_size,
        pipeline.chunk_overlap,
    )?);
    let file_loader = Arc::new(CompositeFileLoader::standard(Arc::new(
        PdfOxideExtractor::new(),
    )));

    let mut normalizer = TextNormalizer::new(
        Arc::clone(&store),
        file_loader,
        splitter,
        Arc::clone(&dispatcher),
    );
    if !pipeline.normalizer_handoff {
        normalizer = normalizer.without_handoff();
    }

    let categorizer = Arc::new(
        CategorizerService::new(Arc::clone(&store), Arc::clone(&llm))
            .with_input_limit(pipeline.categorizer_input_limit)
            .with_options(CompletionOptions {
                temperature: settings.llm.temperature,
                max_tokens: settings.llm.max_tokens,
                json_mode: true,
            }),
    );
    let persona_builder = Arc::new(PersonaBuilderService::new(Arc::clone(&store), llm));
    let stage_router = Arc::new(StageRouter::new(dispatcher, pipeline.router_limits()));

    let processors = PipelineProcessors {
        normalizer: Arc::new(normalizer),
        categorizer: Arc::clone(&categorizer),
        persona_builder: Arc::clone(&persona_builder),
    };

    tracing::info!("Spawning pipeline tasks...");
    tokio::spawn(PipelineWorker::new(task_rx, processors, pipeline.max_concurrent_tasks).run());
    tokio::spawn(Arc::clone(&stage_router).run(event_rx));

    let state = AppState {
        store,
        categorizer,
        persona_builder,
        stage_router,
        max_upload_bytes: usize::try_from(pipeline.raw_max_bytes).unwrap_or(usize::MAX),
    };
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = %environment, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
