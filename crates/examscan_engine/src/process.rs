use std::process::Stdio;

use examscan_core::{ScanIngestionRequest, SheetGenerationRequest, UnitEvent, UnitRequest};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use engine_logging::{engine_debug, engine_info};

use crate::backend::{Backend, BackendError, EventSink, ScanOutput, SheetOutput};
use crate::wire::{decode_event, encode_request, event_type};

/// The program that performs the actual processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self {
            program: "examscan-worker".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitSettings {
    /// Longest accepted line from the worker. Completion lines carry whole
    /// documents, so this is large.
    pub max_line_bytes: usize,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            max_line_bytes: 256 * 1024 * 1024,
        }
    }
}

impl From<LinesCodecError> for BackendError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::Io(err) => BackendError::Io(err),
            LinesCodecError::MaxLineLengthExceeded => {
                BackendError::Io(std::io::Error::other("worker line exceeds the size limit"))
            }
        }
    }
}

struct WorkerChannel {
    // Held so the worker is killed when the channel is dropped.
    _child: Child,
    writer: FramedWrite<ChildStdin, LinesCodec>,
    reader: FramedRead<ChildStdout, LinesCodec>,
}

/// Runs requests through a child process speaking the JSON-lines protocol on
/// stdin/stdout. The process is started by `bootstrap` and lives as long as
/// the backend.
pub struct ProcessBackend {
    command: WorkerCommand,
    settings: UnitSettings,
    channel: Mutex<Option<WorkerChannel>>,
}

impl ProcessBackend {
    pub fn new(command: WorkerCommand, settings: UnitSettings) -> Self {
        Self {
            command,
            settings,
            channel: Mutex::new(None),
        }
    }

    fn start(&self) -> Result<WorkerChannel, BackendError> {
        engine_info!("starting worker `{}`", self.command.program);
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BackendError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;
        let stdin = child.stdin.take().ok_or(BackendError::Exited)?;
        let stdout = child.stdout.take().ok_or(BackendError::Exited)?;
        Ok(WorkerChannel {
            _child: child,
            writer: FramedWrite::new(stdin, LinesCodec::new()),
            reader: FramedRead::new(
                stdout,
                LinesCodec::new_with_max_length(self.settings.max_line_bytes),
            ),
        })
    }

    /// Sends one request and pumps events until the worker answers with a
    /// completion. Intermediate events go to `sink`.
    async fn round_trip(
        &self,
        request: UnitRequest,
        sink: &dyn EventSink,
    ) -> Result<UnitEvent, BackendError> {
        let mut guard = self.channel.lock().await;
        if guard.is_none() {
            *guard = Some(self.start()?);
        }
        let channel = guard.as_mut().ok_or(BackendError::Exited)?;

        let line = encode_request(&request)?;
        drop(request);
        channel.writer.send(line).await?;

        loop {
            let line = match channel.reader.next().await {
                Some(line) => line?,
                None => return Err(BackendError::Exited),
            };
            if line.trim().is_empty() {
                continue;
            }
            match decode_event(&line)? {
                event @ (UnitEvent::InitProgress { .. }
                | UnitEvent::Progress { .. }
                | UnitEvent::Log { .. }) => sink.emit(event),
                UnitEvent::Error { message } => return Err(BackendError::Reported(message)),
                event => return Ok(event),
            }
        }
    }
}

#[async_trait::async_trait]
impl Backend for ProcessBackend {
    async fn bootstrap(&self, sink: &dyn EventSink) -> Result<(), BackendError> {
        match self.round_trip(UnitRequest::Init, sink).await? {
            UnitEvent::Initialized => {
                engine_debug!("worker initialized");
                Ok(())
            }
            other => Err(BackendError::Unexpected(event_type(&other))),
        }
    }

    async fn generate_sheets(
        &self,
        request: SheetGenerationRequest,
        sink: &dyn EventSink,
    ) -> Result<SheetOutput, BackendError> {
        match self.round_trip(UnitRequest::SheetGen(request), sink).await? {
            UnitEvent::SheetGenComplete {
                artifact_bytes,
                filename,
            } => Ok(SheetOutput {
                artifact_bytes,
                filename,
            }),
            other => Err(BackendError::Unexpected(event_type(&other))),
        }
    }

    async fn ingest_scans(
        &self,
        request: ScanIngestionRequest,
        sink: &dyn EventSink,
    ) -> Result<ScanOutput, BackendError> {
        match self.round_trip(UnitRequest::Scan(request), sink).await? {
            UnitEvent::ScanComplete {
                archive_bytes,
                summary_bytes,
            } => Ok(ScanOutput {
                archive_bytes,
                summary_bytes,
            }),
            other => Err(BackendError::Unexpected(event_type(&other))),
        }
    }
}
