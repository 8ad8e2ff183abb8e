use std::sync::Arc;

use crate::application::ports::BlobStore;
use crate::application::services::{CategorizerService, PersonaBuilderService, StageRouter};

/// Shared handles for HTTP handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BlobStore>,
    pub categorizer: Arc<CategorizerService>,
    pub persona_builder: Arc<PersonaBuilderService>,
    pub stage_router: Arc<StageRouter>,
    pub max_upload_bytes: usize,
}
