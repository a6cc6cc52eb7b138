use engine_logging::{engine_debug, engine_error, engine_info, engine_log};

use crate::artifact::{sheet_filename, Artifact, ArtifactKind, ARCHIVE_FILENAME, SUMMARY_FILENAME};
use crate::jobs::{build_scan_request, build_sheet_request, Selection, SheetOptions};
use crate::lifecycle::{Completion, Signal, UnitState};
use crate::notify::Severity;
use crate::protocol::{JobKind, JobRequest};
use crate::roster::Roster;
use crate::state::{JobRecord, JobStatus};
use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::RosterLoaded { filename, text } => match Roster::parse(filename.clone(), text) {
            Ok(roster) => {
                state.notifications.push(
                    format!("Loaded {} subjects from {}", roster.len(), roster.filename()),
                    Severity::Success,
                );
                state.selection = Selection::for_roster(&roster);
                state.roster = Some(roster);
                state.mark_dirty();
            }
            Err(err) => {
                state
                    .notifications
                    .push(format!("Could not read roster {filename}: {err}"), Severity::Error);
                state.mark_dirty();
            }
        },
        Msg::UploadFailed { name, reason } => {
            state
                .notifications
                .push(format!("Could not read {name}: {reason}"), Severity::Error);
            state.mark_dirty();
        }
        Msg::SubjectSelectionToggled(enabled) => {
            if state.selection.enabled() != enabled {
                state.selection.set_enabled(enabled);
                state.mark_dirty();
            }
        }
        Msg::SubjectToggled { index, selected } => {
            if state.selection.set(index, selected) {
                state.mark_dirty();
            }
        }
        Msg::SelectAllToggled(selected) => {
            state.selection.set_all(selected);
            state.mark_dirty();
        }
        Msg::SheetOptionsChanged(options) => {
            let options = SheetOptions::new(options.copies, options.offset_row, options.offset_col);
            if state.sheet_options != options {
                state.sheet_options = options;
                state.mark_dirty();
            }
        }
        Msg::DocumentAdded { name, bytes } => {
            if state.buffers.add(name.clone(), bytes) {
                state.mark_dirty();
            } else {
                engine_debug!("Document {} already loaded; keeping the first copy", name);
            }
        }
        Msg::DocumentsCleared => {
            state.buffers.clear();
            state
                .notifications
                .push("All document files removed", Severity::Info);
            state.mark_dirty();
        }
        Msg::ScanOptionsChanged(options) => {
            if state.scan_options != options {
                state.scan_options = options;
                state.mark_dirty();
            }
        }
        Msg::WarmUpRequested => {
            if state.lifecycle.warm_up(&mut effects) {
                state
                    .notifications
                    .push("Starting background unit...", Severity::Info);
                state.mark_dirty();
            }
        }
        Msg::GenerateSheetsClicked => {
            let built =
                build_sheet_request(state.roster.as_ref(), &state.selection, state.sheet_options);
            match built {
                Ok(request) => {
                    let stem = request.output_stem.clone();
                    submit(&mut state, JobRequest::SheetGeneration(request), Some(stem), &mut effects);
                }
                Err(err) => {
                    state.notifications.push(err.to_string(), Severity::Error);
                    state.mark_dirty();
                }
            }
        }
        Msg::ScanClicked => {
            let built = build_scan_request(&mut state.buffers, state.scan_options);
            match built {
                Ok(request) => {
                    // A new scan starts with a clean log panel.
                    state.log_lines.clear();
                    submit(&mut state, JobRequest::ScanIngestion(request), None, &mut effects);
                }
                Err(err) => {
                    state.notifications.push(err.to_string(), Severity::Error);
                    state.mark_dirty();
                }
            }
        }
        Msg::Unit { generation, event } => {
            let signals = state.lifecycle.on_event(generation, event, &mut effects);
            apply_signals(&mut state, signals, &mut effects);
        }
        Msg::Delivered { kind, location } => {
            state
                .notifications
                .push(format!("Saved {kind} to {location}"), Severity::Success);
            state.mark_dirty();
        }
        Msg::DeliveryFailed { kind, reason } => {
            state.notifications.push(
                format!("Could not save {kind}: {reason}. It can be saved again without rerunning the job."),
                Severity::Error,
            );
            state.mark_dirty();
        }
        Msg::SummaryDownloadRequested => redeliver(&mut state, ArtifactKind::Summary, &mut effects),
        Msg::RedeliverRequested(kind) => redeliver(&mut state, kind, &mut effects),
        Msg::NotificationDismissed(id) => {
            if state.notifications.dismiss(id) {
                state.mark_dirty();
            }
        }
        Msg::Tick { elapsed_ms } => {
            if state.notifications.age(elapsed_ms) {
                state.mark_dirty();
            }
        }
        Msg::NoOp => {}
    }

    (state, effects)
}

fn submit(
    state: &mut AppState,
    request: JobRequest,
    output_stem: Option<String>,
    effects: &mut Vec<Effect>,
) {
    let kind = request.kind();
    let (job_id, signals) = state.lifecycle.submit(request, effects);
    state.jobs.insert(
        job_id,
        JobRecord {
            kind,
            status: JobStatus::Queued,
            output_stem,
            progress: 0.0,
        },
    );
    if signals.is_empty() {
        let message = match state.lifecycle.state() {
            UnitState::Busy => format!("Queued {kind} until the running job finishes"),
            _ => format!("Queued {kind} until the background unit is ready"),
        };
        state.notifications.push(message, Severity::Info);
    }
    apply_signals(state, signals, effects);
    state.mark_dirty();
}

fn apply_signals(state: &mut AppState, signals: Vec<Signal>, effects: &mut Vec<Effect>) {
    for signal in signals {
        state.mark_dirty();
        match signal {
            Signal::InitProgress { step, total, label } => {
                engine_info!("Unit bootstrap {}/{}: {}", step, total, label);
                state.init_label = Some(format!("Loading {label} ({step}/{total})"));
            }
            Signal::UnitReady => {
                state.init_label = None;
                state
                    .notifications
                    .push("Background unit ready", Severity::Success);
            }
            Signal::Dispatched { job_id, kind } => {
                state.set_status(job_id, JobStatus::Running);
                let message = match kind {
                    JobKind::SheetGeneration => "Generating sheets...",
                    JobKind::ScanIngestion => "Scanning documents...",
                };
                state.notifications.push(message, Severity::Info);
            }
            Signal::Progress { job_id, fraction, .. } => {
                if let Some(record) = state.jobs.get_mut(&job_id) {
                    record.progress = record.progress.max(fraction);
                }
            }
            Signal::Log { job_id, level, text } => {
                engine_log!(level.log_level(), "unit: {}", text);
                state.push_log(job_id, level, text);
            }
            Signal::Completed { job_id, completion } => {
                let stem = state
                    .jobs
                    .get(&job_id)
                    .and_then(|record| record.output_stem.clone())
                    .unwrap_or_default();
                if let Some(record) = state.jobs.get_mut(&job_id) {
                    record.status = JobStatus::Completed;
                    record.progress = 1.0;
                }
                let (artifacts, message) = match completion {
                    Completion::Sheet { bytes, filename } => (
                        vec![Artifact::new(
                            ArtifactKind::Sheet,
                            sheet_filename(&filename, &stem),
                            bytes,
                        )],
                        "Sheets generated",
                    ),
                    Completion::Scan { archive, summary } => (
                        vec![
                            Artifact::new(ArtifactKind::Archive, ARCHIVE_FILENAME, archive),
                            Artifact::new(ArtifactKind::Summary, SUMMARY_FILENAME, summary),
                        ],
                        "Scan completed",
                    ),
                };
                state.notifications.push(message, Severity::Success);
                for artifact in artifacts {
                    state.retained.insert(artifact.kind, artifact.clone());
                    effects.push(Effect::Deliver(artifact));
                }
            }
            Signal::Failed { job_id, kind, reason } => {
                state.set_status(job_id, JobStatus::Failed(reason.clone()));
                let message = match kind {
                    JobKind::SheetGeneration => format!("Sheet generation failed: {reason}"),
                    JobKind::ScanIngestion => {
                        format!("Scan failed: {reason}. Load the documents again to retry.")
                    }
                };
                state.notifications.push(message, Severity::Error);
            }
            Signal::ProtocolViolation(err) => {
                engine_error!("Unit protocol violation: {}", err);
            }
            Signal::UnitFaulted { reason } => {
                state.init_label = None;
                state
                    .notifications
                    .push(format!("Background unit stopped: {reason}"), Severity::Error);
            }
        }
    }
}

fn redeliver(state: &mut AppState, kind: ArtifactKind, effects: &mut Vec<Effect>) {
    match state.retained.get(&kind) {
        Some(artifact) => effects.push(Effect::Deliver(artifact.clone())),
        None => {
            state
                .notifications
                .push(format!("No {kind} available yet"), Severity::Error);
            state.mark_dirty();
        }
    }
}
