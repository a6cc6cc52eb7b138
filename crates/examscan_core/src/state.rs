use std::collections::{BTreeMap, VecDeque};

use crate::artifact::{Artifact, ArtifactKind};
use crate::buffers::BufferStore;
use crate::jobs::{Selection, SheetOptions};
use crate::lifecycle::Lifecycle;
use crate::notify::{Notifications, DEFAULT_AUTO_DISMISS_MS};
use crate::protocol::{JobId, JobKind, LogLevel, ScanOptions};
use crate::roster::Roster;
use crate::view_model::{AppViewModel, JobRowView, SubjectRowView};

/// Cap on retained log lines; the oldest are dropped first.
pub const LOG_LINE_LIMIT: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JobRecord {
    pub(crate) kind: JobKind,
    pub(crate) status: JobStatus,
    /// Fallback stem for the sheet filename.
    pub(crate) output_stem: Option<String>,
    pub(crate) progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Increases by one per line for the whole session, across clears.
    pub seq: u64,
    pub job_id: Option<JobId>,
    pub level: LogLevel,
    pub text: String,
}

/// Controller state for one session. Nothing here outlives the process.
#[derive(Debug, Default)]
pub struct AppState {
    pub(crate) roster: Option<Roster>,
    pub(crate) selection: Selection,
    pub(crate) sheet_options: SheetOptions,
    pub(crate) buffers: BufferStore,
    pub(crate) scan_options: ScanOptions,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) jobs: BTreeMap<JobId, JobRecord>,
    pub(crate) init_label: Option<String>,
    pub(crate) log_lines: VecDeque<LogLine>,
    log_seq: u64,
    pub(crate) retained: BTreeMap<ArtifactKind, Artifact>,
    pub(crate) notifications: Notifications,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_auto_dismiss_ms(DEFAULT_AUTO_DISMISS_MS)
    }

    /// Non-error notifications disappear after `auto_dismiss_ms`.
    pub fn with_auto_dismiss_ms(auto_dismiss_ms: u64) -> Self {
        Self {
            notifications: Notifications::new(auto_dismiss_ms),
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let subjects = self
            .roster
            .iter()
            .flat_map(|roster| roster.subjects().iter().enumerate())
            .map(|(index, subject)| SubjectRowView {
                index,
                id: subject.id.clone(),
                display_name: subject.display_name.clone(),
                selected: self.selection.is_selected(index),
            })
            .collect();

        AppViewModel {
            unit_state: self.lifecycle.state().clone(),
            init_percent: self.lifecycle.state().init_percent(),
            init_label: self.init_label.clone(),
            pending_jobs: self.lifecycle.pending_len(),
            roster_filename: self.roster.as_ref().map(|r| r.filename().to_string()),
            subjects,
            selection_enabled: self.selection.enabled(),
            sheet_options: self.sheet_options,
            document_names: self.buffers.names(),
            document_bytes: self.buffers.total_bytes(),
            scan_options: self.scan_options,
            jobs: self
                .jobs
                .iter()
                .map(|(job_id, record)| JobRowView {
                    job_id: *job_id,
                    kind: record.kind,
                    status: record.status.clone(),
                    progress_percent: percent(record.progress),
                })
                .collect(),
            scan_progress_percent: self
                .jobs
                .values()
                .rev()
                .find(|record| record.kind == JobKind::ScanIngestion)
                .map_or(0, |record| percent(record.progress)),
            log_lines: self.log_lines.iter().cloned().collect(),
            notifications: self.notifications.items().to_vec(),
            retained: self.retained.keys().copied().collect(),
            summary_available: self.retained.contains_key(&ArtifactKind::Summary),
            dirty: self.dirty,
        }
    }

    pub fn job_status(&self, job_id: JobId) -> Option<&JobStatus> {
        self.jobs.get(&job_id).map(|record| &record.status)
    }

    /// True when no job is queued or running.
    pub fn is_idle(&self) -> bool {
        self.jobs.values().all(|record| record.status.is_terminal())
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, job_id: JobId, status: JobStatus) {
        if let Some(record) = self.jobs.get_mut(&job_id) {
            record.status = status;
        }
    }

    pub(crate) fn push_log(&mut self, job_id: Option<JobId>, level: LogLevel, text: String) {
        if self.log_lines.len() >= LOG_LINE_LIMIT {
            self.log_lines.pop_front();
        }
        self.log_seq += 1;
        self.log_lines.push_back(LogLine {
            seq: self.log_seq,
            job_id,
            level,
            text,
        });
    }
}

fn percent(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u8
}
