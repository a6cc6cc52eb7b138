#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use examscan_core::{
    LogLevel, NamedBuffer, ScanIngestionRequest, ScanOptions, SheetGenerationRequest, Subject,
    UnitEvent, UnitRequest,
};
use examscan_engine::{
    Backend, BackendError, EventSink, ProcessBackend, UnitHandle, UnitSettings, WorkerCommand,
};
use pretty_assertions::assert_eq;

const WORKER: &str = r#"
while IFS= read -r line; do
  case "$line" in
    *'"type":"INIT"'*)
      echo '{"type":"INIT_PROGRESS","step":1,"total":2,"label":"numpy"}'
      echo '{"type":"INIT_PROGRESS","step":2,"total":2,"label":"pillow"}'
      echo '{"type":"INITIALIZED"}' ;;
    *'"type":"GENERATE_QR"'*)
      echo '{"type":"PROGRESS","fraction":0.5}'
      echo ''
      echo '{"type":"LOG","level":"info","text":"halfway"}'
      echo '{"type":"QR_COMPLETE","artifactBytes":"JVBERg==","filename":"QR-Codes.pdf"}' ;;
    *'"type":"SCAN_START"'*)
      echo '{"type":"ERROR","message":"no codes found"}' ;;
  esac
done
"#;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn shell(script: &str) -> ProcessBackend {
    ProcessBackend::new(
        WorkerCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        },
        UnitSettings::default(),
    )
}

#[derive(Default)]
struct Collect(Mutex<Vec<UnitEvent>>);

impl EventSink for Collect {
    fn emit(&self, event: UnitEvent) {
        self.0.lock().unwrap().push(event);
    }
}

impl Collect {
    fn take(&self) -> Vec<UnitEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn sheet_request() -> SheetGenerationRequest {
    SheetGenerationRequest {
        roster_text: "id,name\n1,A\n".to_string(),
        roster_filename: "roster.csv".to_string(),
        selection: vec![Subject::new("1", "A")],
        copies: 1,
        offset_row: 1,
        offset_col: 1,
        output_stem: "QR-Codes".to_string(),
    }
}

#[tokio::test]
async fn worker_bootstraps_and_generates_sheets() {
    init_logging();
    let backend = shell(WORKER);
    let sink = Collect::default();

    backend.bootstrap(&sink).await.unwrap();
    assert_eq!(
        sink.take(),
        vec![
            UnitEvent::InitProgress {
                step: 1,
                total: 2,
                label: "numpy".to_string()
            },
            UnitEvent::InitProgress {
                step: 2,
                total: 2,
                label: "pillow".to_string()
            },
        ]
    );

    let output = backend.generate_sheets(sheet_request(), &sink).await.unwrap();
    assert_eq!(output.artifact_bytes, Bytes::from_static(b"%PDF"));
    assert_eq!(output.filename, "QR-Codes.pdf");
    assert_eq!(
        sink.take(),
        vec![
            UnitEvent::Progress { fraction: 0.5 },
            UnitEvent::Log {
                level: LogLevel::Info,
                text: "halfway".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn reported_error_leaves_worker_running() {
    init_logging();
    let backend = shell(WORKER);
    let sink = Collect::default();
    backend.bootstrap(&sink).await.unwrap();

    let err = backend
        .ingest_scans(
            ScanIngestionRequest {
                files: vec![NamedBuffer::new("a.pdf", b"%PDF".to_vec())],
                options: ScanOptions::default(),
            },
            &sink,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Reported(ref message) if message == "no codes found"));

    backend.generate_sheets(sheet_request(), &sink).await.unwrap();
}

#[tokio::test]
async fn exited_worker_is_reported() {
    init_logging();
    let backend = shell("read line; exit 0");
    let err = backend.bootstrap(&Collect::default()).await.unwrap_err();
    assert!(matches!(err, BackendError::Exited), "{err:?}");
}

#[tokio::test]
async fn garbage_output_is_a_wire_error() {
    init_logging();
    let backend = shell("read line; echo 'hello there'; sleep 5");
    let err = backend.bootstrap(&Collect::default()).await.unwrap_err();
    assert!(matches!(err, BackendError::Wire(_)), "{err:?}");
}

#[tokio::test]
async fn out_of_turn_completion_is_rejected() {
    init_logging();
    let backend = shell(r#"read line; echo '{"type":"SCAN_COMPLETE","archiveBytes":"","summaryBytes":""}'; sleep 5"#);
    let err = backend.bootstrap(&Collect::default()).await.unwrap_err();
    assert!(matches!(err, BackendError::Unexpected("SCAN_COMPLETE")), "{err:?}");
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    init_logging();
    let backend = ProcessBackend::new(
        WorkerCommand {
            program: "/nonexistent/examscan-worker".to_string(),
            args: Vec::new(),
        },
        UnitSettings::default(),
    );
    let err = backend.bootstrap(&Collect::default()).await.unwrap_err();
    assert!(matches!(err, BackendError::Spawn { .. }), "{err:?}");
}

#[test]
fn unit_host_drives_the_worker_process() {
    init_logging();
    let (handle, events) = UnitHandle::spawn(1, Arc::new(shell(WORKER)));
    handle.send(UnitRequest::Init);
    handle.send(UnitRequest::SheetGen(sheet_request()));

    let mut received = Vec::new();
    while let Some(event) = events.recv_timeout(Duration::from_secs(10)) {
        let done = matches!(event, UnitEvent::SheetGenComplete { .. });
        received.push(event);
        if done {
            break;
        }
    }
    assert_eq!(received.len(), 6, "{received:?}");
    assert_eq!(received[2], UnitEvent::Initialized);
    assert!(matches!(
        received.last(),
        Some(UnitEvent::SheetGenComplete { filename, .. }) if filename == "QR-Codes.pdf"
    ));
}
