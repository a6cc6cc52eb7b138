//! Reads user files at the boundary and turns them into messages. Read
//! failures become `Msg::UploadFailed` so they surface as notifications.
use std::fs;
use std::path::Path;

use examscan_core::Msg;

pub fn roster(path: &Path) -> Msg {
    let name = display_name(path);
    match fs::read_to_string(path) {
        Ok(text) => Msg::RosterLoaded {
            filename: name,
            text,
        },
        Err(err) => Msg::UploadFailed {
            name,
            reason: err.to_string(),
        },
    }
}

pub fn document(path: &Path) -> Msg {
    let name = display_name(path);
    match fs::read(path) {
        Ok(bytes) => Msg::DocumentAdded { name, bytes },
        Err(err) => Msg::UploadFailed {
            name,
            reason: err.to_string(),
        },
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
