use crate::artifact::ArtifactKind;
use crate::jobs::SheetOptions;
use crate::lifecycle::Generation;
use crate::notify::NotificationId;
use crate::protocol::{ScanOptions, UnitEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A roster file was read; replaces any previous roster.
    RosterLoaded { filename: String, text: String },
    /// Reading an uploaded file failed at the boundary.
    UploadFailed { name: String, reason: String },
    /// User switched per-subject selection on or off.
    SubjectSelectionToggled(bool),
    /// User (un)checked one roster row.
    SubjectToggled { index: usize, selected: bool },
    /// User (un)checked "select all".
    SelectAllToggled(bool),
    SheetOptionsChanged(SheetOptions),
    /// A document file was read; ignored when the name is already loaded.
    DocumentAdded { name: String, bytes: Vec<u8> },
    DocumentsCleared,
    ScanOptionsChanged(ScanOptions),
    /// Start the background unit ahead of the first job.
    WarmUpRequested,
    GenerateSheetsClicked,
    ScanClicked,
    /// Event from the background unit of the given generation.
    Unit {
        generation: Generation,
        event: UnitEvent,
    },
    /// An artifact was saved.
    Delivered { kind: ArtifactKind, location: String },
    /// Saving an artifact failed; it stays retained for another attempt.
    DeliveryFailed { kind: ArtifactKind, reason: String },
    /// Save the retained scan summary again.
    SummaryDownloadRequested,
    /// Save the retained artifact of `kind` again.
    RedeliverRequested(ArtifactKind),
    NotificationDismissed(NotificationId),
    /// Time passed; ages out notifications.
    Tick { elapsed_ms: u64 },
    /// Fallback for placeholder wiring.
    NoOp,
}
