mod categorizer;
pub mod json_recovery;
mod persona_builder;
mod pipeline_worker;
pub mod prompts;
mod stage_router;
mod text_normalizer;
mod user_locks;

pub use categorizer::{
    BacklogReport, CategorizeError, CategorizeOutcome, CategorizerService,
    DEFAULT_INPUT_LIMIT_BYTES, truncate_to_boundary,
};
pub use json_recovery::{ParseOutcome, parse_model_json};
pub use persona_builder::{
    CategoryFailure, PersonaBuildError, PersonaBuildReport, PersonaBuilderService,
};
pub use pipeline_worker::{
    ChannelTaskDispatcher, PipelineProcessors, PipelineTaskError, PipelineWorker,
};
pub use stage_router::{
    DEFAULT_NORMALIZED_MAX_BYTES, DEFAULT_RAW_MAX_BYTES, RouteDecision, RouteOutcome, RouteStatus,
    RouterLimits, SkipReason, StageRouter,
};
pub use text_normalizer::{NormalizeError, NormalizeReport, TextNormalizer};
pub use user_locks::UserLocks;
