//! Examscan engine: background unit host, worker process bridge and artifact delivery.
mod backend;
mod delivery;
mod filename;
mod process;
mod unit;
pub mod wire;

pub use backend::{Backend, BackendError, ChannelEventSink, EventSink, ScanOutput, SheetOutput};
pub use delivery::{ensure_output_dir, ArtifactWriter, AtomicFileWriter, DeliveryError};
pub use filename::artifact_filename;
pub use process::{ProcessBackend, UnitSettings, WorkerCommand};
pub use unit::{UnitEvents, UnitHandle};
pub use wire::WireError;
