mod categorize;
mod error;
mod events;
mod health;
mod personas;
mod principal;
mod reprocess;
mod upload;

pub use categorize::{CategorizeResponse, FileRequest, categorize_handler};
pub use error::{ApiError, ErrorBody};
pub use events::{EventBatch, EventBatchResponse, RecordOutcome, events_handler};
pub use health::health_handler;
pub use personas::{PersonasResponse, personas_handler};
pub use principal::{Principal, USER_EMAIL_HEADER};
pub use reprocess::reprocess_handler;
pub use upload::{UploadResponse, upload_handler};
