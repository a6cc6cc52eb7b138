use std::fs;

use bytes::Bytes;
use examscan_core::{Artifact, ArtifactKind};
use examscan_engine::{ensure_output_dir, ArtifactWriter, AtomicFileWriter, DeliveryError};
use tempfile::TempDir;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("summary.pdf", b"hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "summary.pdf");
    assert_eq!(fs::read(&first).unwrap(), b"hello");

    let second = writer.write("summary.pdf", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), b"world");
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("summary.pdf", b"data");
    assert!(matches!(result, Err(DeliveryError::OutputDir(_))));
    assert!(!file_path.with_file_name("summary.pdf").exists());
}

#[test]
fn delivers_scan_results_side_by_side() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let writer = ArtifactWriter::new(temp.path().join("out"));

    let archive = Artifact::new(
        ArtifactKind::Archive,
        "scan-results.zip",
        Bytes::from_static(b"PK\x03\x04"),
    );
    let summary = Artifact::new(
        ArtifactKind::Summary,
        "Zusammenfassung.pdf",
        Bytes::from_static(b"%PDF"),
    );

    let archive_path = writer.deliver(&archive).unwrap();
    let summary_path = writer.deliver(&summary).unwrap();

    assert_eq!(archive_path, writer.download_dir().join("scan-results.zip"));
    assert_eq!(fs::read(&archive_path).unwrap(), b"PK\x03\x04");
    assert_eq!(fs::read(&summary_path).unwrap(), b"%PDF");

    // Re-delivery overwrites in place.
    writer.deliver(&summary).unwrap();
    assert_eq!(fs::read_dir(writer.download_dir()).unwrap().count(), 2);
}

#[test]
fn unsafe_or_empty_names_are_cleaned() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let writer = ArtifactWriter::new(temp.path().to_path_buf());

    let traversal = Artifact::new(ArtifactKind::Sheet, "../QR-Codes.pdf", Bytes::from_static(b"a"));
    let path = writer.deliver(&traversal).unwrap();
    assert_eq!(path, temp.path().join("QR-Codes.pdf"));

    let unnamed = Artifact::new(ArtifactKind::Summary, "", Bytes::from_static(b"b"));
    let path = writer.deliver(&unnamed).unwrap();
    assert_eq!(path.file_name().unwrap(), "Zusammenfassung.pdf");
}
