//! Terminal rendering of view model changes.
use std::collections::BTreeMap;

use chrono::Local;
use examscan_core::{AppViewModel, JobId, JobStatus, Severity, UnitState};

/// Prints what changed since the previous view. Holds only what it needs to
/// compute the difference.
#[derive(Debug, Default)]
pub struct Renderer {
    last_unit_state: Option<UnitState>,
    last_notification: Option<u64>,
    job_progress: BTreeMap<JobId, (JobStatus, u8)>,
    last_log_seq: u64,
    errors: usize,
}

impl Renderer {
    /// Error notifications seen so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        if self.last_unit_state.as_ref() != Some(&view.unit_state) {
            if let Some(line) = unit_line(view) {
                lines.push(line);
            }
            self.last_unit_state = Some(view.unit_state.clone());
        }

        for job in &view.jobs {
            let current = (job.status.clone(), job.progress_percent);
            if self.job_progress.get(&job.job_id) == Some(&current) {
                continue;
            }
            let status = match &job.status {
                JobStatus::Queued => "queued".to_string(),
                JobStatus::Running => format!("{}%", job.progress_percent),
                JobStatus::Completed => "done".to_string(),
                JobStatus::Failed(reason) => format!("failed: {reason}"),
            };
            lines.push(format!("job {} ({}): {}", job.job_id, job.kind, status));
            self.job_progress.insert(job.job_id, current);
        }

        // Sequence numbers survive both the size cap and the clear on a new scan.
        for line in view.log_lines.iter() {
            if line.seq <= self.last_log_seq {
                continue;
            }
            lines.push(format!("  [{}] {}", line.level.as_str(), line.text));
            self.last_log_seq = line.seq;
        }

        for notification in &view.notifications {
            if self.last_notification.is_some_and(|last| notification.id <= last) {
                continue;
            }
            if notification.severity == Severity::Error {
                self.errors += 1;
            }
            lines.push(format!(
                "{} {:<7} {}",
                Local::now().format("%H:%M:%S"),
                severity_label(notification.severity),
                notification.message
            ));
            self.last_notification = Some(notification.id);
        }

        lines
    }
}

fn unit_line(view: &AppViewModel) -> Option<String> {
    let line = match &view.unit_state {
        UnitState::Uninitialized => return None,
        UnitState::Initializing { .. } => match &view.init_label {
            Some(label) => format!("unit: {label}"),
            None => "unit: starting".to_string(),
        },
        UnitState::Ready => "unit: ready".to_string(),
        UnitState::Busy => "unit: busy".to_string(),
        UnitState::Faulted { reason } => format!("unit: faulted ({reason})"),
    };
    Some(line)
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examscan_core::{update, AppState, LogLevel, Msg, UnitEvent, LOG_LINE_LIMIT};

    #[test]
    fn prints_each_notification_once_and_counts_errors() {
        let mut renderer = Renderer::default();
        let (state, _) = update(AppState::new(), Msg::ScanClicked);
        let first = renderer.render(&state.view());
        assert_eq!(first.len(), 1);
        assert!(first[0].contains("no document files loaded yet"));
        assert!(renderer.render(&state.view()).is_empty());
        assert_eq!(renderer.errors(), 1);
    }

    #[test]
    fn init_steps_are_reported() {
        let mut renderer = Renderer::default();
        let (state, _) = update(AppState::new(), Msg::WarmUpRequested);
        let lines = renderer.render(&state.view());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "unit: starting");
        assert!(lines[1].contains("Starting background unit"));

        let (state, _) = update(
            state,
            Msg::Unit {
                generation: 1,
                event: UnitEvent::InitProgress {
                    step: 1,
                    total: 2,
                    label: "numpy".to_string(),
                },
            },
        );
        assert_eq!(
            renderer.render(&state.view()),
            vec!["unit: Loading numpy (1/2)".to_string()]
        );
    }

    #[test]
    fn log_lines_past_the_cap_are_still_printed() {
        let mut renderer = Renderer::default();
        let (mut state, _) = update(AppState::new(), Msg::WarmUpRequested);
        renderer.render(&state.view());

        let total = LOG_LINE_LIMIT + 5;
        let mut printed = Vec::new();
        for n in 0..total {
            let (next, _) = update(
                state,
                Msg::Unit {
                    generation: 1,
                    event: UnitEvent::Log {
                        level: LogLevel::Info,
                        text: format!("line {n}"),
                    },
                },
            );
            state = next;
            printed.extend(renderer.render(&state.view()));
        }

        assert_eq!(printed.len(), total);
        assert_eq!(printed[total - 1], format!("  [info] line {}", total - 1));
        assert_eq!(state.view().log_lines.len(), LOG_LINE_LIMIT);
    }

    #[test]
    fn log_lines_after_a_new_scan_are_printed() {
        let mut renderer = Renderer::default();
        let log = |state: AppState, text: &str| {
            update(
                state,
                Msg::Unit {
                    generation: 1,
                    event: UnitEvent::Log {
                        level: LogLevel::Warning,
                        text: text.to_string(),
                    },
                },
            )
            .0
        };
        let (state, _) = update(AppState::new(), Msg::WarmUpRequested);
        let state = log(log(state, "first"), "second");
        renderer.render(&state.view());

        let (state, _) = update(
            state,
            Msg::DocumentAdded {
                name: "a.pdf".to_string(),
                bytes: b"%PDF".to_vec(),
            },
        );
        let (state, _) = update(state, Msg::ScanClicked);
        assert!(state.view().log_lines.is_empty());
        renderer.render(&state.view());
        let state = log(log(log(state, "third"), "fourth"), "fifth");
        assert_eq!(
            renderer.render(&state.view()),
            vec![
                "  [warning] third".to_string(),
                "  [warning] fourth".to_string(),
                "  [warning] fifth".to_string(),
            ]
        );
    }
}
