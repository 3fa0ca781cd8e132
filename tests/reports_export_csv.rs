use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn report_and_csv_export_follow_record_contents() {
    let workspace = temp_dir("gradebook-reports-export");
    let csv_out = workspace.join("exports").join("marks.csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "email": "report@school.edu", "password": "secret1", "name": "Report", "school": "Print Academy" }),
    );

    let empty = request(&mut stdin, &mut reader, "3", "reports.build", json!({}));
    assert_eq!(error_code(&empty), Some("bad_params"));
    let empty_csv = request(&mut stdin, &mut reader, "4", "reports.exportCsv", json!({}));
    assert_eq!(error_code(&empty_csv), Some("bad_params"));

    let quoted = r#"Wrote "excellent" essay, keep it up"#;
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assessments.create",
        json!({ "studentName": "Ama Boateng", "subject": "English Language", "score": 47.5, "maxScore": 50, "assessmentType": "Homework", "comments": quoted }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "assessments.create",
        json!({ "studentName": "Kwame Asare", "subject": "Mathematics", "score": 12, "maxScore": 40 }),
    );

    let built = request_ok(&mut stdin, &mut reader, "7", "reports.build", json!({}));
    let lines = built
        .get("report")
        .and_then(|r| r.get("lines"))
        .and_then(|v| v.as_array())
        .cloned()
        .expect("lines");
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].get("studentName").and_then(|v| v.as_str()), Some("Kwame Asare"));
    assert!(lines[0].get("comments").map(|v| v.is_null()).unwrap_or(false));
    assert_eq!(lines[1].get("scoreText").and_then(|v| v.as_str()), Some("47.5/50 (95%)"));
    let text = built.get("text").and_then(|v| v.as_str()).expect("text");
    assert!(text.contains("Total Assessments: 2"));

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "reports.exportCsv",
        json!({ "outPath": csv_out.to_string_lossy() }),
    );
    let file_name = exported.get("fileName").and_then(|v| v.as_str()).expect("fileName");
    assert!(file_name.starts_with("teacher_assessments_") && file_name.ends_with(".csv"));
    assert_eq!(exported.get("rowCount").and_then(|v| v.as_u64()), Some(2));

    let on_disk = std::fs::read_to_string(&csv_out).expect("read export");
    assert_eq!(Some(on_disk.as_str()), exported.get("csv").and_then(|v| v.as_str()));

    let mut rdr = csv::Reader::from_reader(on_disk.as_bytes());
    let headers = rdr.headers().expect("headers").clone();
    assert_eq!(&headers[0], "Student Name");
    assert_eq!(&headers[8], "Comments");
    let rows: Vec<csv::StringRecord> = rdr
        .records()
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "Ama Boateng");
    assert_eq!(&rows[0][4], "95%");
    assert_eq!(&rows[0][5], "1");
    assert_eq!(&rows[0][8], quoted);
    assert_eq!(&rows[1][8], "No comments");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
