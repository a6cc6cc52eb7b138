use std::fmt;

use bytes::Bytes;

pub const ARCHIVE_FILENAME: &str = "scan-results.zip";
pub const SUMMARY_FILENAME: &str = "Zusammenfassung.pdf";

const PDF_MIME: &str = "application/pdf";
const ZIP_MIME: &str = "application/zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Sheet,
    Archive,
    Summary,
}

impl ArtifactKind {
    pub fn mime_hint(&self) -> &'static str {
        match self {
            ArtifactKind::Sheet | ArtifactKind::Summary => PDF_MIME,
            ArtifactKind::Archive => ZIP_MIME,
        }
    }

    /// Used when the unit supplies no usable filename.
    pub fn default_filename(&self) -> &'static str {
        match self {
            ArtifactKind::Sheet => "QR-Codes.pdf",
            ArtifactKind::Archive => ARCHIVE_FILENAME,
            ArtifactKind::Summary => SUMMARY_FILENAME,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Sheet => write!(f, "sheet document"),
            ArtifactKind::Archive => write!(f, "scan archive"),
            ArtifactKind::Summary => write!(f, "scan summary"),
        }
    }
}

/// A downloadable result. Bytes are shared so a retained copy costs nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub filename: String,
    pub bytes: Bytes,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, filename: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            kind,
            filename: filename.into(),
            bytes,
        }
    }

    pub fn mime_hint(&self) -> &'static str {
        self.kind.mime_hint()
    }
}

/// Sheet filename: the unit's choice, else `<stem>.pdf`.
pub fn sheet_filename(from_unit: &str, output_stem: &str) -> String {
    let trimmed = from_unit.trim();
    if !trimmed.is_empty() {
        trimmed.to_string()
    } else if !output_stem.trim().is_empty() {
        format!("{}.pdf", output_stem.trim())
    } else {
        ArtifactKind::Sheet.default_filename().to_string()
    }
}
