use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_warn};
use examscan_core::{Generation, UnitEvent, UnitRequest};

use crate::backend::{Backend, BackendError, ChannelEventSink, EventSink, ScanOutput, SheetOutput};

/// Command side of one background unit.
///
/// The unit runs on its own thread with a single-threaded tokio runtime and
/// handles requests strictly in order. Dropping the handle closes the command
/// channel, which stops the thread and releases the backend.
pub struct UnitHandle {
    generation: Generation,
    cmd_tx: mpsc::Sender<UnitRequest>,
}

/// Event side of one background unit. `None` from [`UnitEvents::recv`] means
/// the unit thread is gone.
pub struct UnitEvents {
    generation: Generation,
    event_rx: mpsc::Receiver<UnitEvent>,
}

impl UnitHandle {
    pub fn spawn(generation: Generation, backend: Arc<dyn Backend>) -> (UnitHandle, UnitEvents) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let fault_tx = event_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("examscan-unit-{generation}"))
            .spawn(move || run_unit(generation, backend, cmd_rx, event_tx));
        if let Err(err) = spawned {
            engine_error!("unit {generation}: failed to start thread: {err}");
            let _ = fault_tx.send(UnitEvent::Fault {
                reason: format!("failed to start unit thread: {err}"),
            });
        }

        (
            UnitHandle { generation, cmd_tx },
            UnitEvents {
                generation,
                event_rx,
            },
        )
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Queues a request; returns `false` when the unit thread has stopped.
    pub fn send(&self, request: UnitRequest) -> bool {
        self.cmd_tx.send(request).is_ok()
    }
}

impl UnitEvents {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn recv(&self) -> Option<UnitEvent> {
        self.event_rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<UnitEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<UnitEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

fn run_unit(
    generation: Generation,
    backend: Arc<dyn Backend>,
    cmd_rx: mpsc::Receiver<UnitRequest>,
    event_tx: mpsc::Sender<UnitEvent>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = event_tx.send(UnitEvent::Fault {
                reason: format!("failed to start unit runtime: {err}"),
            });
            return;
        }
    };
    let sink = ChannelEventSink::new(event_tx.clone());

    while let Ok(request) = cmd_rx.recv() {
        let terminal = runtime.block_on(handle_request(backend.as_ref(), request, &sink));
        let faulted = matches!(terminal, UnitEvent::Fault { .. });
        if let UnitEvent::Fault { reason } = &terminal {
            engine_warn!("unit {generation}: {reason}");
        }
        if event_tx.send(terminal).is_err() || faulted {
            break;
        }
    }
    engine_debug!("unit {generation}: stopped");
}

async fn handle_request(
    backend: &dyn Backend,
    request: UnitRequest,
    sink: &dyn EventSink,
) -> UnitEvent {
    let outcome = match request {
        UnitRequest::Init => {
            engine_debug!("unit: bootstrapping");
            backend.bootstrap(sink).await.map(|()| UnitEvent::Initialized)
        }
        UnitRequest::SheetGen(request) => {
            engine_debug!("unit: generating sheets for {} subjects", request.selection.len());
            backend
                .generate_sheets(request, sink)
                .await
                .map(|SheetOutput { artifact_bytes, filename }| UnitEvent::SheetGenComplete {
                    artifact_bytes,
                    filename,
                })
        }
        UnitRequest::Scan(request) => {
            engine_debug!("unit: ingesting {} documents", request.files.len());
            backend
                .ingest_scans(request, sink)
                .await
                .map(|ScanOutput { archive_bytes, summary_bytes }| UnitEvent::ScanComplete {
                    archive_bytes,
                    summary_bytes,
                })
        }
    };
    outcome.unwrap_or_else(BackendError::into_event)
}
