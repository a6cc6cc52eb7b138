use crate::artifact::ArtifactKind;
use crate::jobs::SheetOptions;
use crate::lifecycle::UnitState;
use crate::notify::Notification;
use crate::protocol::{JobId, JobKind, ScanOptions};
use crate::state::{JobStatus, LogLine};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub unit_state: UnitState,
    pub init_percent: Option<u8>,
    pub init_label: Option<String>,
    pub pending_jobs: usize,
    pub roster_filename: Option<String>,
    pub subjects: Vec<SubjectRowView>,
    pub selection_enabled: bool,
    pub sheet_options: SheetOptions,
    pub document_names: Vec<String>,
    pub document_bytes: u64,
    pub scan_options: ScanOptions,
    pub jobs: Vec<JobRowView>,
    pub scan_progress_percent: u8,
    pub log_lines: Vec<LogLine>,
    pub notifications: Vec<Notification>,
    pub retained: Vec<ArtifactKind>,
    pub summary_available: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRowView {
    pub index: usize,
    pub id: String,
    pub display_name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress_percent: u8,
}
