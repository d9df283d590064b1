pub mod backend;
pub mod journal;
pub mod normalizer;
pub mod orchestrator;
pub mod prompts;
pub mod providers;

pub use backend::{build_backends, Backend, BackendError, BackendSlot};
pub use journal::{JournalError, JournalService, Submission};
pub use normalizer::{extract_structured, locate_object, parse_reflection};
pub use orchestrator::{
    BackendAttempt, FailureReason, Generation, Reflection, ReflectionError,
    ReflectionOrchestrator, ReflectionRequest, ReflectionResult,
};
