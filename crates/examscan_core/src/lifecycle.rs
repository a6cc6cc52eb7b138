//! Background unit lifecycle: readiness tracking, the pending-job queue and
//! event validation.
//!
//! ```text
//! Uninitialized --warm_up/submit--> Initializing --Initialized--> Ready
//! Ready --submit--> Busy --complete/error--> Ready
//! any --fault--> Faulted --warm_up/submit--> Initializing
//! ```
use std::collections::VecDeque;

use bytes::Bytes;
use engine_logging::{engine_debug, engine_info, engine_warn};
use thiserror::Error;

use crate::protocol::{JobId, JobKind, JobRequest, LogLevel, UnitEvent, UnitRequest};
use crate::Effect;

/// Identifies one incarnation of the unit. Events from an older generation
/// are stale and ignored.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum UnitState {
    #[default]
    Uninitialized,
    Initializing {
        step: u32,
        total: u32,
    },
    Ready,
    Busy,
    Faulted {
        reason: String,
    },
}

impl UnitState {
    /// Bootstrap percentage while initializing.
    pub fn init_percent(&self) -> Option<u8> {
        match self {
            UnitState::Initializing { step, total } if *total > 0 => {
                let pct = (u64::from(*step.min(total)) * 100) / u64::from(*total);
                Some(pct as u8)
            }
            UnitState::Initializing { .. } => Some(0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("progress fraction {0} outside [0, 1]")]
    ProgressOutOfRange(f64),
    #[error("{received} completion received while {expected} job was running")]
    UnexpectedCompletion { expected: JobKind, received: JobKind },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Sheet { bytes: Bytes, filename: String },
    Scan { archive: Bytes, summary: Bytes },
}

impl Completion {
    fn kind(&self) -> JobKind {
        match self {
            Completion::Sheet { .. } => JobKind::SheetGeneration,
            Completion::Scan { .. } => JobKind::ScanIngestion,
        }
    }
}

/// What an applied unit event means for the rest of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    InitProgress {
        step: u32,
        total: u32,
        label: String,
    },
    UnitReady,
    Dispatched {
        job_id: JobId,
        kind: JobKind,
    },
    Progress {
        job_id: JobId,
        kind: JobKind,
        fraction: f64,
    },
    Log {
        job_id: Option<JobId>,
        level: LogLevel,
        text: String,
    },
    Completed {
        job_id: JobId,
        completion: Completion,
    },
    Failed {
        job_id: JobId,
        kind: JobKind,
        reason: String,
    },
    ProtocolViolation(ProtocolError),
    UnitFaulted {
        reason: String,
    },
}

#[derive(Debug)]
struct PendingJob {
    job_id: JobId,
    request: JobRequest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct InFlight {
    job_id: JobId,
    kind: JobKind,
    progress: f64,
}

/// Owns the unit's state. All access goes through `submit`, `warm_up` and
/// `on_event`; each pushes the effects it needs onto `effects`.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: UnitState,
    generation: Generation,
    next_job_id: JobId,
    pending: VecDeque<PendingJob>,
    in_flight: Option<InFlight>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> Option<(JobId, JobKind)> {
        self.in_flight.map(|job| (job.job_id, job.kind))
    }

    /// Creates the unit unless it already exists or is starting. Returns
    /// whether a new unit was requested.
    pub fn warm_up(&mut self, effects: &mut Vec<Effect>) -> bool {
        match self.state {
            UnitState::Uninitialized | UnitState::Faulted { .. } => {
                self.spawn(effects);
                true
            }
            UnitState::Initializing { .. } | UnitState::Ready | UnitState::Busy => false,
        }
    }

    /// Never fails: a request that cannot go out now waits in FIFO order and
    /// is dispatched exactly once when the unit is free.
    pub fn submit(&mut self, request: JobRequest, effects: &mut Vec<Effect>) -> (JobId, Vec<Signal>) {
        self.next_job_id += 1;
        let job_id = self.next_job_id;
        engine_info!("Job {} ({}) submitted in state {:?}", job_id, request.kind(), self.state);
        self.pending.push_back(PendingJob { job_id, request });

        let mut signals = Vec::new();
        match self.state {
            UnitState::Uninitialized | UnitState::Faulted { .. } => self.spawn(effects),
            UnitState::Ready => self.drain(effects, &mut signals),
            UnitState::Initializing { .. } | UnitState::Busy => {}
        }
        (job_id, signals)
    }

    /// Applies one event from the unit of `generation`.
    pub fn on_event(
        &mut self,
        generation: Generation,
        event: UnitEvent,
        effects: &mut Vec<Effect>,
    ) -> Vec<Signal> {
        let mut signals = Vec::new();
        if generation != self.generation {
            engine_debug!(
                "Dropping event from stale unit generation {} (current {})",
                generation,
                self.generation
            );
            return signals;
        }

        match event {
            UnitEvent::InitProgress { step, total, label } => {
                if let UnitState::Initializing { .. } = self.state {
                    self.state = UnitState::Initializing { step, total };
                    signals.push(Signal::InitProgress { step, total, label });
                } else {
                    stray("InitProgress", &self.state);
                }
            }
            UnitEvent::Initialized => {
                if let UnitState::Initializing { .. } = self.state {
                    self.state = UnitState::Ready;
                    signals.push(Signal::UnitReady);
                    self.drain(effects, &mut signals);
                } else {
                    stray("Initialized", &self.state);
                }
            }
            UnitEvent::Progress { fraction } => {
                if let UnitState::Faulted { .. } = self.state {
                    stray("Progress", &self.state);
                } else if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                    self.violation(ProtocolError::ProgressOutOfRange(fraction), &mut signals);
                } else if let Some(job) = self.in_flight.as_mut() {
                    // Regressions and duplicates keep the stream non-decreasing.
                    if fraction > job.progress {
                        job.progress = fraction;
                        signals.push(Signal::Progress {
                            job_id: job.job_id,
                            kind: job.kind,
                            fraction,
                        });
                    }
                } else {
                    stray("Progress", &self.state);
                }
            }
            UnitEvent::Log { level, text } => {
                signals.push(Signal::Log {
                    job_id: self.in_flight.map(|job| job.job_id),
                    level,
                    text,
                });
            }
            UnitEvent::SheetGenComplete {
                artifact_bytes,
                filename,
            } => self.complete(
                Completion::Sheet {
                    bytes: artifact_bytes,
                    filename,
                },
                effects,
                &mut signals,
            ),
            UnitEvent::ScanComplete {
                archive_bytes,
                summary_bytes,
            } => self.complete(
                Completion::Scan {
                    archive: archive_bytes,
                    summary: summary_bytes,
                },
                effects,
                &mut signals,
            ),
            UnitEvent::Error { message } => {
                if let Some(job) = self.in_flight.take() {
                    self.state = UnitState::Ready;
                    signals.push(Signal::Failed {
                        job_id: job.job_id,
                        kind: job.kind,
                        reason: message,
                    });
                    self.drain(effects, &mut signals);
                } else if let UnitState::Faulted { .. } = self.state {
                    stray("Error", &self.state);
                } else {
                    // Bootstrap failure, or an error nobody asked for.
                    self.fault(message, &mut signals);
                }
            }
            UnitEvent::Fault { reason } => {
                if let UnitState::Faulted { .. } = self.state {
                    stray("Fault", &self.state);
                } else {
                    self.fault(reason, &mut signals);
                }
            }
        }
        signals
    }

    fn spawn(&mut self, effects: &mut Vec<Effect>) {
        self.generation += 1;
        self.state = UnitState::Initializing { step: 0, total: 0 };
        self.in_flight = None;
        engine_info!("Creating background unit generation {}", self.generation);
        effects.push(Effect::SpawnUnit {
            generation: self.generation,
        });
        effects.push(Effect::Send {
            generation: self.generation,
            request: UnitRequest::Init,
        });
    }

    fn drain(&mut self, effects: &mut Vec<Effect>, signals: &mut Vec<Signal>) {
        if self.state != UnitState::Ready {
            return;
        }
        let Some(PendingJob { job_id, request }) = self.pending.pop_front() else {
            return;
        };
        let kind = request.kind();
        self.state = UnitState::Busy;
        self.in_flight = Some(InFlight {
            job_id,
            kind,
            progress: 0.0,
        });
        effects.push(Effect::Send {
            generation: self.generation,
            request: request.into(),
        });
        signals.push(Signal::Dispatched { job_id, kind });
    }

    fn complete(&mut self, completion: Completion, effects: &mut Vec<Effect>, signals: &mut Vec<Signal>) {
        let Some(job) = self.in_flight else {
            stray("completion", &self.state);
            return;
        };
        if job.kind != completion.kind() {
            self.violation(
                ProtocolError::UnexpectedCompletion {
                    expected: job.kind,
                    received: completion.kind(),
                },
                signals,
            );
            return;
        }
        self.in_flight = None;
        self.state = UnitState::Ready;
        signals.push(Signal::Completed {
            job_id: job.job_id,
            completion,
        });
        self.drain(effects, signals);
    }

    fn violation(&mut self, error: ProtocolError, signals: &mut Vec<Signal>) {
        if let UnitState::Faulted { .. } = self.state {
            engine_debug!("Unit already faulted, ignoring {}", error);
            return;
        }
        let reason = format!("protocol error: {error}");
        signals.push(Signal::ProtocolViolation(error));
        self.fault(reason, signals);
    }

    /// Fails the running job and everything queued behind it.
    fn fault(&mut self, reason: String, signals: &mut Vec<Signal>) {
        engine_warn!("Background unit faulted: {}", reason);
        if let Some(job) = self.in_flight.take() {
            signals.push(Signal::Failed {
                job_id: job.job_id,
                kind: job.kind,
                reason: reason.clone(),
            });
        }
        for PendingJob { job_id, request } in self.pending.drain(..) {
            signals.push(Signal::Failed {
                job_id,
                kind: request.kind(),
                reason: reason.clone(),
            });
        }
        self.state = UnitState::Faulted {
            reason: reason.clone(),
        };
        signals.push(Signal::UnitFaulted { reason });
    }
}

fn stray(what: &str, state: &UnitState) {
    engine_warn!("Ignoring {} with no matching job (unit state {:?})", what, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ScanIngestionRequest, ScanOptions};

    fn scan_request() -> JobRequest {
        JobRequest::ScanIngestion(ScanIngestionRequest {
            files: Vec::new(),
            options: ScanOptions::default(),
        })
    }

    #[test]
    fn init_percent_tracks_steps() {
        assert_eq!(UnitState::Initializing { step: 0, total: 0 }.init_percent(), Some(0));
        assert_eq!(UnitState::Initializing { step: 1, total: 4 }.init_percent(), Some(25));
        assert_eq!(UnitState::Initializing { step: 9, total: 4 }.init_percent(), Some(100));
        assert_eq!(UnitState::Ready.init_percent(), None);
    }

    #[test]
    fn warm_up_is_idempotent() {
        let mut lifecycle = Lifecycle::new();
        let mut effects = Vec::new();
        assert!(lifecycle.warm_up(&mut effects));
        assert!(!lifecycle.warm_up(&mut effects));
        assert_eq!(effects.len(), 2);
        lifecycle.on_event(1, UnitEvent::Initialized, &mut effects);
        assert!(!lifecycle.warm_up(&mut effects));
        assert_eq!(lifecycle.state(), &UnitState::Ready);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut lifecycle = Lifecycle::new();
        let mut effects = Vec::new();
        lifecycle.warm_up(&mut effects);
        lifecycle.on_event(1, UnitEvent::Fault { reason: "gone".into() }, &mut effects);
        lifecycle.warm_up(&mut effects);
        assert_eq!(lifecycle.generation(), 2);

        let signals = lifecycle.on_event(1, UnitEvent::Initialized, &mut effects);
        assert!(signals.is_empty());
        assert_eq!(lifecycle.state(), &UnitState::Initializing { step: 0, total: 0 });
    }

    #[test]
    fn progress_out_of_range_faults_unit() {
        let mut lifecycle = Lifecycle::new();
        let mut effects = Vec::new();
        let (job_id, _) = lifecycle.submit(scan_request(), &mut effects);
        lifecycle.on_event(1, UnitEvent::Initialized, &mut effects);

        let signals = lifecycle.on_event(1, UnitEvent::Progress { fraction: 1.5 }, &mut effects);
        assert!(matches!(
            signals[0],
            Signal::ProtocolViolation(ProtocolError::ProgressOutOfRange(_))
        ));
        assert!(signals
            .iter()
            .any(|s| matches!(s, Signal::Failed { job_id: id, .. } if *id == job_id)));
        assert!(matches!(lifecycle.state(), UnitState::Faulted { .. }));
    }

    #[test]
    fn bad_progress_after_fault_is_ignored() {
        let mut lifecycle = Lifecycle::new();
        let mut effects = Vec::new();
        lifecycle.submit(scan_request(), &mut effects);
        lifecycle.on_event(1, UnitEvent::Initialized, &mut effects);
        lifecycle.on_event(1, UnitEvent::Progress { fraction: 1.5 }, &mut effects);

        let signals = lifecycle.on_event(1, UnitEvent::Progress { fraction: 1.5 }, &mut effects);
        assert!(signals.is_empty());
        let signals = lifecycle.on_event(1, UnitEvent::Progress { fraction: f64::NAN }, &mut effects);
        assert!(signals.is_empty());
        assert!(matches!(lifecycle.state(), UnitState::Faulted { .. }));
    }

    #[test]
    fn mismatched_completion_is_a_protocol_error() {
        let mut lifecycle = Lifecycle::new();
        let mut effects = Vec::new();
        lifecycle.submit(scan_request(), &mut effects);
        lifecycle.on_event(1, UnitEvent::Initialized, &mut effects);

        let signals = lifecycle.on_event(
            1,
            UnitEvent::SheetGenComplete {
                artifact_bytes: Bytes::from_static(b"%PDF"),
                filename: "x.pdf".into(),
            },
            &mut effects,
        );
        assert_eq!(
            signals[0],
            Signal::ProtocolViolation(ProtocolError::UnexpectedCompletion {
                expected: JobKind::ScanIngestion,
                received: JobKind::SheetGeneration,
            })
        );
        assert_eq!(lifecycle.in_flight(), None);
    }
}
