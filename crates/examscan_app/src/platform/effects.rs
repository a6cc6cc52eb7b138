use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_info, engine_warn};
use examscan_core::{Effect, Msg, UnitEvent};
use examscan_engine::{ArtifactWriter, ProcessBackend, UnitEvents, UnitHandle, UnitSettings, WorkerCommand};

use super::config::AppConfig;

/// Executes effects from `update` and feeds results back as messages.
pub struct EffectRunner {
    msg_tx: mpsc::Sender<Msg>,
    worker: WorkerCommand,
    settings: UnitSettings,
    writer: ArtifactWriter,
    unit: Option<UnitHandle>,
}

impl EffectRunner {
    pub fn new(config: &AppConfig, msg_tx: mpsc::Sender<Msg>) -> Self {
        Self {
            msg_tx,
            worker: config.worker.clone(),
            settings: UnitSettings::default(),
            writer: ArtifactWriter::new(config.download_dir.clone()),
            unit: None,
        }
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SpawnUnit { generation } => {
                    // Dropping the previous handle stops its thread and worker.
                    self.unit = None;
                    engine_info!("SpawnUnit generation={} program={}", generation, self.worker.program);
                    let backend = Arc::new(ProcessBackend::new(self.worker.clone(), self.settings.clone()));
                    let (handle, events) = UnitHandle::spawn(generation, backend);
                    spawn_forwarder(events, self.msg_tx.clone());
                    self.unit = Some(handle);
                }
                Effect::Send {
                    generation,
                    request,
                } => match &self.unit {
                    Some(unit) if unit.generation() == generation => {
                        if !unit.send(request) {
                            let _ = self.msg_tx.send(Msg::Unit {
                                generation,
                                event: UnitEvent::Fault {
                                    reason: "background unit is not running".to_string(),
                                },
                            });
                        }
                    }
                    _ => engine_warn!("Dropping request for unit generation {}", generation),
                },
                Effect::Deliver(artifact) => {
                    let kind = artifact.kind;
                    let msg = match self.writer.deliver(&artifact) {
                        Ok(path) => Msg::Delivered {
                            kind,
                            location: path.display().to_string(),
                        },
                        Err(err) => Msg::DeliveryFailed {
                            kind,
                            reason: err.to_string(),
                        },
                    };
                    let _ = self.msg_tx.send(msg);
                }
            }
        }
    }
}

/// Tags unit events with their generation. A unit thread that ends while
/// its handle is still current shows up as a fault.
fn spawn_forwarder(events: UnitEvents, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let generation = events.generation();
        let mut faulted = false;
        while let Some(event) = events.recv() {
            faulted = matches!(event, UnitEvent::Fault { .. });
            if msg_tx.send(Msg::Unit { generation, event }).is_err() {
                return;
            }
        }
        if !faulted {
            let _ = msg_tx.send(Msg::Unit {
                generation,
                event: UnitEvent::Fault {
                    reason: "background unit stopped".to_string(),
                },
            });
        }
    });
}
