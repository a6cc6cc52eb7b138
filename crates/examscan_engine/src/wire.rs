//! JSON-lines codec for the worker boundary.
//!
//! One JSON object per line, discriminated by a `"type"` field. Binary
//! payloads travel as base64 strings.
use std::borrow::Cow;

use bytes::Bytes;
use examscan_core::{
    LogLevel, NamedBuffer, ScanIngestionRequest, ScanOptions, SheetGenerationRequest, Subject,
    UnitEvent, UnitRequest,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message type {0} is not valid in this direction")]
    UnexpectedType(&'static str),
    #[error("host-side event cannot be encoded")]
    HostOnly,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
enum WireMessage<'a> {
    Init,
    InitProgress {
        step: u32,
        total: u32,
        #[serde(default)]
        label: Cow<'a, str>,
    },
    Initialized,
    #[serde(rename = "GENERATE_QR")]
    GenerateQr { data: WireSheetRequest<'a> },
    ScanStart { data: WireScanRequest<'a> },
    Progress { fraction: f64 },
    Log {
        #[serde(default)]
        level: Cow<'a, str>,
        #[serde(alias = "message")]
        text: Cow<'a, str>,
    },
    #[serde(rename = "QR_COMPLETE")]
    QrComplete {
        #[serde(with = "base64_bytes")]
        artifact_bytes: Cow<'a, [u8]>,
        filename: Cow<'a, str>,
    },
    ScanComplete {
        #[serde(with = "base64_bytes")]
        archive_bytes: Cow<'a, [u8]>,
        #[serde(with = "base64_bytes")]
        summary_bytes: Cow<'a, [u8]>,
    },
    Error { message: Cow<'a, str> },
}

impl WireMessage<'_> {
    fn type_name(&self) -> &'static str {
        match self {
            WireMessage::Init => "INIT",
            WireMessage::InitProgress { .. } => "INIT_PROGRESS",
            WireMessage::Initialized => "INITIALIZED",
            WireMessage::GenerateQr { .. } => "GENERATE_QR",
            WireMessage::ScanStart { .. } => "SCAN_START",
            WireMessage::Progress { .. } => "PROGRESS",
            WireMessage::Log { .. } => "LOG",
            WireMessage::QrComplete { .. } => "QR_COMPLETE",
            WireMessage::ScanComplete { .. } => "SCAN_COMPLETE",
            WireMessage::Error { .. } => "ERROR",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSheetRequest<'a> {
    roster_text: Cow<'a, str>,
    #[serde(default)]
    roster_filename: Cow<'a, str>,
    selection: Vec<WireSubject<'a>>,
    copies: u32,
    offset_row: u32,
    offset_col: u32,
    #[serde(default)]
    output_stem: Cow<'a, str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireSubject<'a> {
    id: Cow<'a, str>,
    name: Cow<'a, str>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireScanRequest<'a> {
    files: Vec<WireFile<'a>>,
    options: WireScanOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFile<'a> {
    name: Cow<'a, str>,
    #[serde(with = "base64_bytes")]
    data: Cow<'a, [u8]>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireScanOptions {
    two_page_scan: bool,
    split_a3: bool,
    quick_mode: bool,
}

mod base64_bytes {
    use std::borrow::Cow;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Cow<'_, [u8]>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, 'a, D: Deserializer<'de>>(deserializer: D) -> Result<Cow<'a, [u8]>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(Cow::Owned)
            .map_err(serde::de::Error::custom)
    }
}

/// Wire type name of an event, for diagnostics.
pub(crate) fn event_type(event: &UnitEvent) -> &'static str {
    match event {
        UnitEvent::InitProgress { .. } => "INIT_PROGRESS",
        UnitEvent::Initialized => "INITIALIZED",
        UnitEvent::Progress { .. } => "PROGRESS",
        UnitEvent::Log { .. } => "LOG",
        UnitEvent::SheetGenComplete { .. } => "QR_COMPLETE",
        UnitEvent::ScanComplete { .. } => "SCAN_COMPLETE",
        UnitEvent::Error { .. } => "ERROR",
        UnitEvent::Fault { .. } => "FAULT",
    }
}

/// Encodes a controller request as one line (without the trailing newline).
/// Scan buffers are borrowed, never copied before encoding.
pub fn encode_request(request: &UnitRequest) -> Result<String, WireError> {
    let message = match request {
        UnitRequest::Init => WireMessage::Init,
        UnitRequest::SheetGen(request) => WireMessage::GenerateQr {
            data: WireSheetRequest {
                roster_text: Cow::Borrowed(&request.roster_text),
                roster_filename: Cow::Borrowed(&request.roster_filename),
                selection: request
                    .selection
                    .iter()
                    .map(|subject| WireSubject {
                        id: Cow::Borrowed(&subject.id),
                        name: Cow::Borrowed(&subject.display_name),
                    })
                    .collect(),
                copies: request.copies,
                offset_row: request.offset_row,
                offset_col: request.offset_col,
                output_stem: Cow::Borrowed(&request.output_stem),
            },
        },
        UnitRequest::Scan(request) => WireMessage::ScanStart {
            data: WireScanRequest {
                files: request
                    .files
                    .iter()
                    .map(|file| WireFile {
                        name: Cow::Borrowed(&file.name),
                        data: Cow::Borrowed(&file.bytes),
                    })
                    .collect(),
                options: WireScanOptions {
                    two_page_scan: request.options.two_page_scan,
                    split_a3: request.options.split_a3,
                    quick_mode: request.options.quick_mode,
                },
            },
        },
    };
    Ok(serde_json::to_string(&message)?)
}

/// Decodes one line sent by the worker.
pub fn decode_event(line: &str) -> Result<UnitEvent, WireError> {
    let message: WireMessage<'_> = serde_json::from_str(line)?;
    let event = match message {
        WireMessage::InitProgress { step, total, label } => UnitEvent::InitProgress {
            step,
            total,
            label: label.into_owned(),
        },
        WireMessage::Initialized => UnitEvent::Initialized,
        WireMessage::Progress { fraction } => UnitEvent::Progress { fraction },
        WireMessage::Log { level, text } => UnitEvent::Log {
            level: LogLevel::from_name(&level),
            text: text.into_owned(),
        },
        WireMessage::QrComplete {
            artifact_bytes,
            filename,
        } => UnitEvent::SheetGenComplete {
            artifact_bytes: Bytes::from(artifact_bytes.into_owned()),
            filename: filename.into_owned(),
        },
        WireMessage::ScanComplete {
            archive_bytes,
            summary_bytes,
        } => UnitEvent::ScanComplete {
            archive_bytes: Bytes::from(archive_bytes.into_owned()),
            summary_bytes: Bytes::from(summary_bytes.into_owned()),
        },
        WireMessage::Error { message } => UnitEvent::Error {
            message: message.into_owned(),
        },
        other @ (WireMessage::Init | WireMessage::GenerateQr { .. } | WireMessage::ScanStart { .. }) => {
            return Err(WireError::UnexpectedType(other.type_name()))
        }
    };
    Ok(event)
}

/// Worker side of the codec: encodes an event as one line.
pub fn encode_event(event: &UnitEvent) -> Result<String, WireError> {
    let message = match event {
        UnitEvent::InitProgress { step, total, label } => WireMessage::InitProgress {
            step: *step,
            total: *total,
            label: Cow::Borrowed(label),
        },
        UnitEvent::Initialized => WireMessage::Initialized,
        UnitEvent::Progress { fraction } => WireMessage::Progress { fraction: *fraction },
        UnitEvent::Log { level, text } => WireMessage::Log {
            level: Cow::Borrowed(level.as_str()),
            text: Cow::Borrowed(text),
        },
        UnitEvent::SheetGenComplete {
            artifact_bytes,
            filename,
        } => WireMessage::QrComplete {
            artifact_bytes: Cow::Borrowed(artifact_bytes),
            filename: Cow::Borrowed(filename),
        },
        UnitEvent::ScanComplete {
            archive_bytes,
            summary_bytes,
        } => WireMessage::ScanComplete {
            archive_bytes: Cow::Borrowed(archive_bytes),
            summary_bytes: Cow::Borrowed(summary_bytes),
        },
        UnitEvent::Error { message } => WireMessage::Error {
            message: Cow::Borrowed(message),
        },
        UnitEvent::Fault { .. } => return Err(WireError::HostOnly),
    };
    Ok(serde_json::to_string(&message)?)
}

/// Worker side of the codec: decodes one controller request.
pub fn decode_request(line: &str) -> Result<UnitRequest, WireError> {
    let message: WireMessage<'_> = serde_json::from_str(line)?;
    let request = match message {
        WireMessage::Init => UnitRequest::Init,
        WireMessage::GenerateQr { data } => UnitRequest::SheetGen(SheetGenerationRequest {
            roster_text: data.roster_text.into_owned(),
            roster_filename: data.roster_filename.into_owned(),
            selection: data
                .selection
                .into_iter()
                .map(|subject| Subject::new(subject.id, subject.name))
                .collect(),
            copies: data.copies,
            offset_row: data.offset_row,
            offset_col: data.offset_col,
            output_stem: data.output_stem.into_owned(),
        }),
        WireMessage::ScanStart { data } => UnitRequest::Scan(ScanIngestionRequest {
            files: data
                .files
                .into_iter()
                .map(|file| NamedBuffer::new(file.name, file.data.into_owned()))
                .collect(),
            options: ScanOptions {
                two_page_scan: data.options.two_page_scan,
                split_a3: data.options.split_a3,
                quick_mode: data.options.quick_mode,
            },
        }),
        other => return Err(WireError::UnexpectedType(other.type_name())),
    };
    Ok(request)
}
