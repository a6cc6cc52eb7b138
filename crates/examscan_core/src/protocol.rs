//! Messages exchanged between the controller and the background unit.
//!
//! The unit handles one job at a time; the lifecycle manager guarantees that
//! at most one job request is in flight.
use std::fmt;

use bytes::Bytes;

use crate::buffers::NamedBuffer;
use crate::roster::Subject;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    SheetGeneration,
    ScanIngestion,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::SheetGeneration => write!(f, "sheet generation"),
            JobKind::ScanIngestion => write!(f, "scan ingestion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetGenerationRequest {
    pub roster_text: String,
    pub roster_filename: String,
    pub selection: Vec<Subject>,
    pub copies: u32,
    pub offset_row: u32,
    pub offset_col: u32,
    pub output_stem: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanOptions {
    pub two_page_scan: bool,
    pub split_a3: bool,
    pub quick_mode: bool,
}

/// Owns the uploaded documents; building one consumes the buffer store's contents.
#[derive(Debug, PartialEq, Eq)]
pub struct ScanIngestionRequest {
    pub files: Vec<NamedBuffer>,
    pub options: ScanOptions,
}

#[derive(Debug, PartialEq, Eq)]
pub enum JobRequest {
    SheetGeneration(SheetGenerationRequest),
    ScanIngestion(ScanIngestionRequest),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::SheetGeneration(_) => JobKind::SheetGeneration,
            JobRequest::ScanIngestion(_) => JobKind::ScanIngestion,
        }
    }
}

/// Controller to unit.
#[derive(Debug, PartialEq, Eq)]
pub enum UnitRequest {
    Init,
    SheetGen(SheetGenerationRequest),
    Scan(ScanIngestionRequest),
}

impl From<JobRequest> for UnitRequest {
    fn from(request: JobRequest) -> Self {
        match request {
            JobRequest::SheetGeneration(request) => UnitRequest::SheetGen(request),
            JobRequest::ScanIngestion(request) => UnitRequest::Scan(request),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Maps a free-form level name; anything unrecognised is `Info`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "success" => LogLevel::Success,
            "warn" | "warning" => LogLevel::Warning,
            "error" | "exception" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn log_level(&self) -> engine_logging::log::Level {
        use engine_logging::log::Level;
        match self {
            LogLevel::Info | LogLevel::Success => Level::Info,
            LogLevel::Warning => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// Unit to controller.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    InitProgress {
        step: u32,
        total: u32,
        label: String,
    },
    Initialized,
    Progress {
        fraction: f64,
    },
    Log {
        level: LogLevel,
        text: String,
    },
    SheetGenComplete {
        artifact_bytes: Bytes,
        filename: String,
    },
    ScanComplete {
        archive_bytes: Bytes,
        summary_bytes: Bytes,
    },
    Error {
        message: String,
    },
    /// Raised by the unit host, never sent by the unit itself: the channel
    /// broke (worker exited, malformed message, runtime failure).
    Fault {
        reason: String,
    },
}

impl UnitEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnitEvent::SheetGenComplete { .. }
                | UnitEvent::ScanComplete { .. }
                | UnitEvent::Error { .. }
                | UnitEvent::Fault { .. }
        )
    }
}
