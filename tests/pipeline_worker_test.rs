mod helpers;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use dossier::application::ports::{
    BlobStore, DispatchError, FileLoaderError, LlmClientError, PdfExtractor, PdfPage,
    TaskDispatcher, TextSplitter,
};
use dossier::application::services::{
    CategorizerService, ChannelTaskDispatcher, PersonaBuilderService, PipelineProcessors,
    PipelineWorker, RouterLimits, StageRouter, TextNormalizer,
};
use dossier::domain::{PersonasDocument, PipelineTask, Stage, StorageKey};
use dossier::infrastructure::storage::{NotifyingBlobStore, ObjectBlobStore};
use dossier::infrastructure::text_processing::{CompositeFileLoader, OverlappingWindowSplitter};

use helpers::{ScriptedLlm, USER, get_json, memory_store, put_text};

struct NoPdf;

impl PdfExtractor for NoPdf {
    fn extract(&self, _data: &[u8]) -> Result<Vec<PdfPage>, FileLoaderError> {
        Err(FileLoaderError::ExtractionFailed("not under test".into()))
    }
}

#[test]
fn given_full_queue_when_dispatching_then_queue_full() {
    let (dispatcher, _receiver) = ChannelTaskDispatcher::channel(1);
    let task = PipelineTask::Normalize(StorageKey::new(USER, Stage::Raw, "a.txt"));

    dispatcher.dispatch(task.clone()).unwrap();

    assert!(matches!(dispatcher.dispatch(task), Err(DispatchError::QueueFull)));
}

#[test]
fn given_dropped_receiver_when_dispatching_then_closed() {
    let (dispatcher, receiver) = ChannelTaskDispatcher::channel(4);
    drop(receiver);

    let result = dispatcher.dispatch(PipelineTask::Categorize(StorageKey::new(
        USER,
        Stage::Normalized,
        "a.txt",
    )));

    assert!(matches!(result, Err(DispatchError::Closed)));
}

#[tokio::test]
async fn given_raw_upload_when_pipeline_runs_then_personas_are_built_end_to_end() {
    let (event_tx, event_rx) = mpsc::channel(16);
    let store: Arc<dyn BlobStore> = Arc::new(NotifyingBlobStore::new(
        Arc::new(ObjectBlobStore::in_memory()),
        "memory",
        vec![Stage::Raw, Stage::Categorized],
        event_tx,
    ));
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(r#"{"categories": {"professional": {"relevance": 8, "summary": "CV"}}, "extractedProfile": {"professional": {"skills": ["Rust"]}}}"#.to_string()),
        Ok(r#"{"summary": "Systems engineer", "completeness": 30}"#.to_string()),
    ]));

    let (dispatcher, task_rx) = ChannelTaskDispatcher::channel(16);
    let dispatcher = Arc::new(dispatcher);
    let processors = PipelineProcessors {
        normalizer: Arc::new(TextNormalizer::new(
            store.clone(),
            Arc::new(CompositeFileLoader::standard(Arc::new(NoPdf))),
            Arc::new(OverlappingWindowSplitter::new(1_000, 100).unwrap()),
            dispatcher.clone(),
        )),
        categorizer: Arc::new(CategorizerService::new(store.clone(), llm.clone())),
        persona_builder: Arc::new(PersonaBuilderService::new(store.clone(), llm.clone())),
    };
    let router = Arc::new(StageRouter::new(dispatcher, RouterLimits::default()));

    tokio::spawn(PipelineWorker::new(task_rx, processors, 2).run());
    tokio::spawn(router.run(event_rx));

    store
        .put(
            &format!("{USER}/raw/cv.txt"),
            Bytes::from_static(b"Ten years of Rust systems work."),
            "text/plain",
        )
        .await
        .unwrap();

    let personas_key = StorageKey::personas(USER).to_string();
    let mut document = None;
    for _ in 0..200 {
        if let Ok(bytes) = store.get(&personas_key).await {
            document = Some(serde_json::from_slice::<PersonasDocument>(&bytes).unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let document = document.expect("personas should be written");
    let persona = document.get("professional").unwrap();
    assert_eq!(persona.summary, "Systems engineer");
    assert_eq!(persona.sources, vec!["cv.txt"]);
    assert!(store.get(&format!("{USER}/normalized/cv.txt")).await.is_ok());
    assert_eq!(llm.calls(), 2);
}

fn skill_replies(count: usize) -> Vec<Result<String, LlmClientError>> {
    (0..count)
        .map(|i| {
            Ok(format!(
                r#"{{"categories": {{"professional": {{"relevance": 6}}}}, "extractedProfile": {{"professional": {{"skills": ["skill{i}"]}}}}}}"#
            ))
        })
        .collect()
}

fn processors(
    store: &Arc<dyn BlobStore>,
    llm: Arc<ScriptedLlm>,
    dispatcher: Arc<ChannelTaskDispatcher>,
    window: (usize, usize),
) -> PipelineProcessors {
    PipelineProcessors {
        normalizer: Arc::new(TextNormalizer::new(
            store.clone(),
            Arc::new(CompositeFileLoader::standard(Arc::new(NoPdf))),
            Arc::new(OverlappingWindowSplitter::new(window.0, window.1).unwrap()),
            dispatcher,
        )),
        categorizer: Arc::new(CategorizerService::new(store.clone(), llm.clone())),
        persona_builder: Arc::new(PersonaBuilderService::new(store.clone(), llm)),
    }
}

async fn wait_for_files(store: &Arc<dyn BlobStore>, expected: usize) -> serde_json::Value {
    let key = StorageKey::master_profile(USER).to_string();
    for _ in 0..500 {
        if store.get(&key).await.is_ok() {
            let profile = get_json(store, &key).await;
            if profile["fileCount"].as_u64() == Some(expected as u64) {
                return profile;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    get_json(store, &key).await
}

fn skills(profile: &serde_json::Value) -> Vec<String> {
    let mut skills: Vec<String> = profile["profile"]["professional"]["skills"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    skills.sort();
    skills
}

#[tokio::test]
async fn given_chunked_upload_and_slow_model_when_worker_runs_then_every_chunk_reaches_master_profile() {
    let store = memory_store();
    let source = StorageKey::new(USER, Stage::Raw, "history.txt");
    let text: String = (0..100).map(|i| format!("entry{i:02}\n")).collect();
    put_text(&store, &source.to_string(), &text).await;
    let chunks = OverlappingWindowSplitter::new(100, 10)
        .unwrap()
        .split(&text)
        .unwrap()
        .len();
    assert!(chunks > 4);

    let llm = Arc::new(
        ScriptedLlm::new(skill_replies(chunks)).with_delay(Duration::from_millis(20)),
    );
    let (dispatcher, task_rx) = ChannelTaskDispatcher::channel(2);
    let dispatcher = Arc::new(dispatcher);
    let processors = processors(&store, llm.clone(), dispatcher.clone(), (100, 10));
    tokio::spawn(PipelineWorker::new(task_rx, processors, 4).run());

    dispatcher.dispatch(PipelineTask::Normalize(source)).unwrap();

    let profile = wait_for_files(&store, chunks).await;
    assert_eq!(profile["sourceFiles"].as_array().unwrap().len(), chunks);
    let mut expected: Vec<String> = (0..chunks).map(|i| format!("skill{i}")).collect();
    expected.sort();
    assert_eq!(skills(&profile), expected);
    assert_eq!(llm.calls(), chunks);
}

#[tokio::test]
async fn given_parallel_categorize_tasks_for_one_user_when_worker_runs_then_no_merge_is_lost() {
    let store = memory_store();
    let files = 6;
    for i in 0..files {
        put_text(
            &store,
            &StorageKey::new(USER, Stage::Normalized, format!("note{i}.txt")).to_string(),
            "Shipped another release.",
        )
        .await;
    }
    let llm = Arc::new(
        ScriptedLlm::new(skill_replies(files)).with_delay(Duration::from_millis(20)),
    );
    let (dispatcher, task_rx) = ChannelTaskDispatcher::channel(16);
    let dispatcher = Arc::new(dispatcher);
    let processors = processors(&store, llm, dispatcher.clone(), (1_000, 100));
    tokio::spawn(PipelineWorker::new(task_rx, processors, 4).run());

    for i in 0..files {
        dispatcher
            .dispatch(PipelineTask::Categorize(StorageKey::new(
                USER,
                Stage::Normalized,
                format!("note{i}.txt"),
            )))
            .unwrap();
    }

    let profile = wait_for_files(&store, files).await;
    assert_eq!(profile["sourceFiles"].as_array().unwrap().len(), files);
    assert_eq!(skills(&profile).len(), files);
}
