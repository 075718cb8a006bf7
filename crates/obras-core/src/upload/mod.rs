//! Upload operation: session, remote paths, state machine and pipeline

pub mod orchestrator;
pub mod paths;
pub mod phase;
pub mod session;

pub use orchestrator::{
    ProgressReporter, ProgressUpdate, SilentProgress, UploadOrchestrator, UploadReport,
};
pub use paths::{cover_path, extension_of, progress_path};
pub use phase::UploadPhase;
pub use session::{StagedFile, UploadSession, MAX_PROGRESS_PHOTOS};
