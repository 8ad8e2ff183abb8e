mod blob_store;
mod file_loader;
mod llm_client;
mod pdf_extractor;
mod task_dispatcher;
mod text_splitter;

pub use blob_store::{BlobStore, BlobStoreError, ObjectInfo};
pub use file_loader::{FileLoader, FileLoaderError};
pub use llm_client::{CompletionOptions, LlmClient, LlmClientError};
pub use pdf_extractor::{PdfExtractor, PdfPage, TextFragment};
pub use task_dispatcher::{DispatchError, TaskDispatcher};
pub use text_splitter::{TextSplitter, TextSplitterError};
