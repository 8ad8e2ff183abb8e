mod category_result;
mod chunk;
mod document;
mod master_profile;
mod persona;
mod pipeline_task;
mod profile_fragment;
mod storage_key;
pub mod string_set;

pub use category_result::{CategoryEntry, CategoryResult, MAX_RELEVANCE, UNKNOWN_CATEGORY};
pub use chunk::Chunk;
pub use document::{ContentType, Document};
pub use master_profile::{AbsorbOutcome, CategoryRollup, MasterProfile, SourceFile};
pub use persona::{MAX_COMPLETENESS, Persona, PersonaUpdate, PersonasDocument};
pub use pipeline_task::{PipelineTask, StorageEvent};
pub use profile_fragment::{MergeMode, PROFILE_SECTIONS, ProfileFragment, merge, merge_with};
pub use storage_key::{
    MASTER_PROFILE_FILE, PERSONAS_FILE, Stage, StorageKey, StorageKeyError, belongs_to_stem,
    chunk_relative_path, sanitize_file_name, split_extension,
};
