use std::io;
use std::sync::mpsc;

use bytes::Bytes;
use examscan_core::{ScanIngestionRequest, SheetGenerationRequest, UnitEvent};
use thiserror::Error;

use crate::wire::WireError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to start worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("worker io error: {0}")]
    Io(#[from] io::Error),
    #[error("worker protocol error: {0}")]
    Wire(#[from] WireError),
    #[error("worker exited")]
    Exited,
    #[error("worker sent {0} out of turn")]
    Unexpected(&'static str),
    /// The worker reported a job-level failure; the unit itself is healthy.
    #[error("{0}")]
    Reported(String),
}

impl BackendError {
    /// Maps a failure onto the event the controller sees. Only a reported
    /// failure leaves the unit usable.
    pub fn into_event(self) -> UnitEvent {
        match self {
            BackendError::Reported(message) => UnitEvent::Error { message },
            other => UnitEvent::Fault {
                reason: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOutput {
    pub artifact_bytes: Bytes,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutput {
    pub archive_bytes: Bytes,
    pub summary_bytes: Bytes,
}

/// Receives intermediate events (init steps, progress, log lines) while a
/// request runs.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UnitEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<UnitEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<UnitEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: UnitEvent) {
        let _ = self.tx.send(event);
    }
}

/// The processing side of a background unit. Calls are never concurrent:
/// the unit host awaits each one before taking the next request.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn bootstrap(&self, sink: &dyn EventSink) -> Result<(), BackendError>;

    async fn generate_sheets(
        &self,
        request: SheetGenerationRequest,
        sink: &dyn EventSink,
    ) -> Result<SheetOutput, BackendError>;

    async fn ingest_scans(
        &self,
        request: ScanIngestionRequest,
        sink: &dyn EventSink,
    ) -> Result<ScanOutput, BackendError>;
}
