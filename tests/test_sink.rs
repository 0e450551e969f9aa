use diskcollectd::collector::*;
use diskcollectd::error::SinkError;
use diskcollectd::record::{MetricRecord, schema};
use diskcollectd::sink::{CsvStore, HttpSubmitter, Sink};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn record(serial: &str) -> MetricRecord {
    let mut record = MetricRecord::empty(
        "2026-10-19 12:00:00".to_string(),
        serial.to_string(),
        "WDC WD40EFRX, rev 2".to_string(),
        "PASSED".to_string(),
        &SmartRegistry::default(),
    );
    record.read_qps = 12.3;
    record
}

/// Serve exactly one HTTP request with `status_line`, returning the raw
/// request text once the exchange is done.
async fn one_shot_server(status_line: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/api", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        // Read headers, then as much body as Content-Length announces.
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
        }

        let response = format!("{status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&request).to_string()
    });

    (url, handle)
}

#[tokio::test]
async fn test_csv_header_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("disk_metrics.csv");
    let store = CsvStore::new(&path);
    assert_eq!(store.path(), path.as_path());

    for serial in ["A1", "B2", "C3"] {
        store.write(&record(serial)).await.unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    let header = schema(&SmartRegistry::default()).join(",");

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], header);
    assert_eq!(lines.iter().filter(|l| **l == header).count(), 1);
    assert!(lines[1].starts_with("2026-10-19 12:00:00,A1,\"WDC WD40EFRX, rev 2\",PASSED,0,0,0,12.3,"));
    assert!(lines[3].contains(",C3,"));
}

#[tokio::test]
async fn test_csv_concurrent_writers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk_metrics.csv");
    let store = Arc::new(CsvStore::new(&path));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store.write(&record(&format!("SN{i}"))).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let columns = schema(&SmartRegistry::default()).len();

    assert_eq!(text.lines().count(), 17);
    assert!(text.lines().next().unwrap().starts_with("date,serial_number,"));
    // The model contains a quoted comma, so every data row has one extra split.
    assert!(text.lines().skip(1).all(|l| l.split(',').count() == columns + 1));
}

#[tokio::test]
async fn test_csv_failure_reported() {
    let dir = tempfile::tempdir().unwrap();
    // A directory in place of the file makes opening it fail.
    let store = CsvStore::new(dir.path());

    assert!(matches!(store.write(&record("X")).await, Err(SinkError::Io(_))));
}

#[tokio::test]
async fn test_http_submission_accepted() {
    let (url, server) = one_shot_server("HTTP/1.1 200 OK").await;
    let submitter = HttpSubmitter::new(&url, Some(42), Duration::from_secs(5)).unwrap();

    submitter.write(&record("ZFL1ABCD")).await.unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/submit-metrics?node_id=42 HTTP/1.1"));
    assert!(request.contains("\"serial_number\":\"ZFL1ABCD\""));
    assert!(request.contains("\"read_qps\":12.3"));
}

#[tokio::test]
async fn test_http_non_200_is_error() {
    let (url, server) = one_shot_server("HTTP/1.1 201 Created").await;
    let submitter = HttpSubmitter::new(&url, None, Duration::from_secs(5)).unwrap();

    let result = submitter.write(&record("ZFL1ABCD")).await;
    server.await.unwrap();

    assert!(matches!(result, Err(SinkError::Status { status: 201, .. })));
}

#[tokio::test]
async fn test_http_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let submitter = HttpSubmitter::new(&format!("http://{addr}/"), None, Duration::from_secs(5)).unwrap();
    assert!(matches!(
        submitter.write(&record("X")).await,
        Err(SinkError::Transport(_))
    ));
}

#[tokio::test]
async fn test_pass_survives_failing_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk_metrics.csv");

    let runner = CannedRunner::new()
        .with("lsblk -dn -o NAME,TYPE", "sda disk\nsdb disk\nsr0 rom\n")
        .with("smartctl -i /dev/sda", "Device Model: A\nSerial Number: SA\n")
        .with("smartctl -i /dev/sdb", "Device Model: B\nSerial Number: SB\n");
    let runner: Arc<dyn CommandRunner> = Arc::new(runner);
    let assembler = MetricsAssembler::new(
        Arc::clone(&runner),
        Arc::new(SmartRegistry::default()),
        ProbeSettings::default(),
    );

    let broken = tempfile::tempdir().unwrap();
    let sinks: Vec<Arc<dyn Sink>> = vec![
        Arc::new(CsvStore::new(broken.path())),
        Arc::new(CsvStore::new(&path)),
    ];

    let summary = run_pass(runner, &assembler, &sinks, Some(1)).await;

    assert_eq!(summary.devices, 2);
    assert_eq!(summary.records, 2);
    assert_eq!(summary.delivered.get("csv"), Some(&2));

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains(",SA,A,Unknown,"));
    assert!(text.contains(",SB,B,Unknown,"));
}

#[tokio::test]
async fn test_huge_worker_cap_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk_metrics.csv");

    let runner: Arc<dyn CommandRunner> = Arc::new(CannedRunner::new());
    let assembler = MetricsAssembler::new(runner, Arc::new(SmartRegistry::default()), ProbeSettings::default());
    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(CsvStore::new(&path))];
    let devices = vec![Device {
        path: "/dev/sda".to_string(),
        model: "A".to_string(),
        serial_number: "SA".to_string(),
    }];

    let summary = process_devices(&assembler, &sinks, devices, Some(usize::MAX)).await;

    assert_eq!(summary.records, 1);
    assert_eq!(summary.delivered.get("csv"), Some(&1));
}

#[tokio::test]
async fn test_zero_workers_still_processes() {
    let runner: Arc<dyn CommandRunner> = Arc::new(CannedRunner::new());
    let assembler = MetricsAssembler::new(runner, Arc::new(SmartRegistry::default()), ProbeSettings::default());

    let summary = process_devices(&assembler, &[], Vec::new(), Some(0)).await;
    assert_eq!(summary.records, 0);

    let devices = vec![Device {
        path: "/dev/sdb".to_string(),
        model: "B".to_string(),
        serial_number: "SB".to_string(),
    }];
    let summary = process_devices(&assembler, &[], devices, Some(0)).await;
    assert_eq!(summary.records, 1);
}
