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
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradebook-router-smoke");
    let csv_out = workspace.join("smoke-export.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let before = request(&mut stdin, &mut reader, "0", "assessments.list", json!({}));
    assert_eq!(error_code(&before), Some("no_workspace"));

    let _ = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({
            "email": "smoke@school.edu",
            "password": "secret1",
            "name": "Smoke Teacher",
            "school": "Smoke School"
        }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "4", "auth.current", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "5", "session.touch", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "6", "grades.scale", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "grades.classify",
        json!({ "percentage": 90 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grades.preview",
        json!({ "score": 45, "maxScore": 50 }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "assessments.create",
        json!({
            "studentName": "Kwame Asare",
            "subject": "Mathematics",
            "score": 45,
            "maxScore": 50,
            "assessmentType": "Class Test",
            "comments": "Good effort shown."
        }),
    );
    let id = created
        .get("assessment")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_i64())
        .expect("assessment id");

    let _ = request_ok(&mut stdin, &mut reader, "10", "assessments.get", json!({ "id": id }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "assessments.update",
        json!({ "id": id, "studentName": "Kwame Asare", "subject": "Mathematics", "score": 40, "maxScore": 50 }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "12", "assessments.recent", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "13", "assessments.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "14", "stats.summary", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "15", "reports.build", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "reports.exportCsv",
        json!({ "outPath": csv_out.to_string_lossy() }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "17", "profiles.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "18", "assessments.delete", json!({ "id": id }));
    let _ = request_ok(&mut stdin, &mut reader, "19", "auth.logout", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "profiles.deleteData",
        json!({ "email": "smoke@school.edu" }),
    );

    let unknown = request(&mut stdin, &mut reader, "21", "nope.nothing", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
