//! Examscan core: pure controller state machine for the background unit.
mod artifact;
mod buffers;
mod effect;
mod jobs;
mod lifecycle;
mod msg;
mod notify;
mod protocol;
mod roster;
mod state;
mod update;
mod view_model;

pub use artifact::{sheet_filename, Artifact, ArtifactKind, ARCHIVE_FILENAME, SUMMARY_FILENAME};
pub use buffers::{BufferStore, NamedBuffer};
pub use effect::Effect;
pub use jobs::{build_scan_request, build_sheet_request, Selection, SheetOptions, UserInputError};
pub use lifecycle::{Completion, Generation, Lifecycle, ProtocolError, Signal, UnitState};
pub use msg::Msg;
pub use notify::{Notification, NotificationId, Severity, DEFAULT_AUTO_DISMISS_MS};
pub use protocol::{
    JobId, JobKind, JobRequest, LogLevel, ScanIngestionRequest, ScanOptions,
    SheetGenerationRequest, UnitEvent, UnitRequest,
};
pub use roster::{Roster, RosterError, Subject};
pub use state::{AppState, JobStatus, LogLine, LOG_LINE_LIMIT};
pub use update::update;
pub use view_model::{AppViewModel, JobRowView, SubjectRowView};
