mod helpers;

use std::sync::Arc;

use dossier::application::ports::{
    BlobStore, FileLoaderError, PdfExtractor, PdfPage, TextFragment,
};
use dossier::application::services::{ChannelTaskDispatcher, NormalizeError, TextNormalizer};
use dossier::domain::{PipelineTask, Stage, StorageKey};
use dossier::infrastructure::text_processing::{CompositeFileLoader, OverlappingWindowSplitter};

use helpers::{RecordingDispatcher, USER, memory_store, put_text};

struct FakePdfExtractor {
    pages: Vec<PdfPage>,
}

impl PdfExtractor for FakePdfExtractor {
    fn extract(&self, _data: &[u8]) -> Result<Vec<PdfPage>, FileLoaderError> {
        Ok(self.pages.clone())
    }
}

fn fragment(x: f32, y: f32, text: &str) -> TextFragment {
    TextFragment {
        x,
        y,
        text: text.to_string(),
    }
}

fn normalizer(
    store: Arc<dyn BlobStore>,
    dispatcher: Arc<RecordingDispatcher>,
    pages: Vec<PdfPage>,
    window: (usize, usize),
) -> TextNormalizer {
    let loader = CompositeFileLoader::standard(Arc::new(FakePdfExtractor { pages }));
    let splitter = OverlappingWindowSplitter::new(window.0, window.1).unwrap();
    TextNormalizer::new(store, Arc::new(loader), Arc::new(splitter), dispatcher)
}

async fn read(store: &Arc<dyn BlobStore>, key: &StorageKey) -> String {
    let bytes = store.get(&key.to_string()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn raw(path: &str) -> StorageKey {
    StorageKey::new(USER, Stage::Raw, path)
}

#[tokio::test]
async fn given_small_text_file_when_normalizing_then_copied_through_and_handed_off() {
    let store = memory_store();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let source = raw("notes.md");
    put_text(&store, &source.to_string(), "# Notes\nBought a bike.").await;

    let report = normalizer(store.clone(), dispatcher.clone(), vec![], (100, 10))
        .normalize(&source, None)
        .await
        .unwrap();

    let expected = StorageKey::new(USER, Stage::Normalized, "notes.md");
    assert_eq!(report.written, vec![expected.clone()]);
    assert_eq!(read(&store, &expected).await, "# Notes\nBought a bike.");
    assert_eq!(
        dispatcher.tasks(),
        vec![PipelineTask::CategorizeSeries {
            source,
            keys: vec![expected],
        }]
    );
}

#[tokio::test]
async fn given_text_above_window_when_normalizing_then_overlapping_chunks_rebuild_original() {
    let store = memory_store();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let source = raw("log.txt");
    let original = "é0123456789abcdefghijklmnopqrstuvwxyz~end";
    put_text(&store, &source.to_string(), original).await;
    let (size, overlap) = (10, 3);

    let report = normalizer(store.clone(), dispatcher.clone(), vec![], (size, overlap))
        .normalize(&source, None)
        .await
        .unwrap();

    assert!(report.written.len() > 1);
    assert_eq!(report.written[0].relative_path(), "log_chunk_001.txt");

    let mut rebuilt = String::new();
    for (index, key) in report.written.iter().enumerate() {
        let chunk = read(&store, key).await;
        assert!(chunk.chars().count() <= size);
        if index == 0 {
            rebuilt.push_str(&chunk);
        } else {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
    }
    assert_eq!(rebuilt, original);
    assert_eq!(report.dispatched, report.written);
}

#[tokio::test]
async fn given_pdf_fragments_out_of_order_when_normalizing_then_reading_order_and_form_fields() {
    let store = memory_store();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let source = raw("forms/intake.pdf");
    put_text(&store, &source.to_string(), "%PDF-1.7 fake").await;
    let pages = vec![
        PdfPage {
            number: 2,
            fragments: vec![fragment(10.0, 10.0, "Second page.")],
        },
        PdfPage {
            number: 1,
            fragments: vec![
                fragment(10.0, 40.0, "Email: ada@example.com"),
                fragment(60.0, 10.5, "Lovelace"),
                fragment(10.0, 10.0, "Name: Ada"),
            ],
        },
    ];

    let report = normalizer(store.clone(), dispatcher, pages, (10_000, 100))
        .normalize(&source, Some("application/pdf"))
        .await
        .unwrap();

    let output = StorageKey::new(USER, Stage::Normalized, "forms/intake.txt");
    assert_eq!(report.written, vec![output.clone()]);

    let text = read(&store, &output).await;
    assert!(text.starts_with("Form fields:\n"));
    assert!(text.contains("- Name: Ada Lovelace"));
    assert!(text.contains("- Email: ada@example.com"));
    let body = text.split_once("\n\n").map(|(_, b)| b).unwrap_or_default();
    assert!(body.find("Name: Ada Lovelace").unwrap() < body.find("Second page.").unwrap());
}

#[tokio::test]
async fn given_unsupported_extension_when_normalizing_then_extraction_error() {
    let store = memory_store();
    let source = raw("song.mp3");
    put_text(&store, &source.to_string(), "ID3").await;

    let result = normalizer(store, Arc::new(RecordingDispatcher::default()), vec![], (100, 10))
        .normalize(&source, None)
        .await;

    assert!(matches!(
        result,
        Err(NormalizeError::Extraction(FileLoaderError::UnsupportedContentType(_)))
    ));
}

#[tokio::test]
async fn given_non_raw_key_when_normalizing_then_wrong_stage() {
    let result = normalizer(memory_store(), Arc::new(RecordingDispatcher::default()), vec![], (100, 10))
        .normalize(&StorageKey::new(USER, Stage::Normalized, "a.txt"), None)
        .await;

    assert!(matches!(result, Err(NormalizeError::WrongStage(_))));
}

#[tokio::test]
async fn given_sibling_with_shared_prefix_when_handing_off_then_only_own_outputs_dispatched() {
    let store = memory_store();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    put_text(&store, &format!("{USER}/normalized/a_b.txt"), "other file").await;
    let source = raw("a.txt");
    put_text(&store, &source.to_string(), "mine").await;

    normalizer(store, dispatcher.clone(), vec![], (100, 10))
        .normalize(&source, None)
        .await
        .unwrap();

    let dispatched: Vec<String> = dispatcher
        .tasks()
        .iter()
        .flat_map(|task| match task {
            PipelineTask::CategorizeSeries { keys, .. } => keys.clone(),
            other => vec![other.key().clone()],
        })
        .map(|key| key.relative_path().to_string())
        .collect();
    assert_eq!(dispatched, vec!["a.txt"]);
}

#[tokio::test]
async fn given_full_queue_when_handing_off_then_failures_reported_not_raised() {
    let store = memory_store();
    let source = raw("a.txt");
    put_text(&store, &source.to_string(), "content").await;

    let report = normalizer(store, Arc::new(RecordingDispatcher::refusing()), vec![], (100, 10))
        .normalize(&source, None)
        .await
        .unwrap();

    assert!(report.dispatched.is_empty());
    assert_eq!(report.dispatch_failures.len(), 1);
}

#[tokio::test]
async fn given_handoff_disabled_when_normalizing_then_nothing_dispatched() {
    let store = memory_store();
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let source = raw("a.txt");
    put_text(&store, &source.to_string(), "content").await;

    let report = normalizer(store, dispatcher.clone(), vec![], (100, 10))
        .without_handoff()
        .normalize(&source, None)
        .await
        .unwrap();

    assert_eq!(report.written.len(), 1);
    assert!(dispatcher.tasks().is_empty());
}

#[tokio::test]
async fn given_more_chunks_than_queue_slots_when_handing_off_then_every_chunk_is_queued_in_order() {
    let store = memory_store();
    let (dispatcher, mut receiver) = ChannelTaskDispatcher::channel(2);
    let source = raw("export.txt");
    let original: String = (0..120).map(|i| format!("line {i:03}\n")).collect();
    put_text(&store, &source.to_string(), &original).await;

    let loader = CompositeFileLoader::standard(Arc::new(FakePdfExtractor { pages: vec![] }));
    let splitter = OverlappingWindowSplitter::new(100, 10).unwrap();
    let report = TextNormalizer::new(
        store,
        Arc::new(loader),
        Arc::new(splitter),
        Arc::new(dispatcher),
    )
    .normalize(&source, None)
    .await
    .unwrap();

    assert!(report.written.len() > 2);
    assert!(report.dispatch_failures.is_empty());
    assert_eq!(report.dispatched, report.written);

    let Ok(PipelineTask::CategorizeSeries { source: queued_source, keys }) = receiver.try_recv()
    else {
        panic!("expected one series task");
    };
    assert_eq!(queued_source, source);
    assert_eq!(keys, report.written);
    assert!(receiver.try_recv().is_err());
}
