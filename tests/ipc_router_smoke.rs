use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOK_WORKSPACE")
        .env_remove("GRADEBOOK_SUBJECTS")
        .env_remove("GRADEBOOK_CREDENTIALS")
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
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let out_dir = tempfile::tempdir().expect("tempdir");
    let bundle_out = out_dir.path().join("smoke.gradebook.zip");
    let csv_out = out_dir.path().join("smoke-export.csv");
    let report_out = out_dir.path().join("smoke-report.txt");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["result"]["loggedIn"], json!(false));
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "username": "teacher1", "password": "password123" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let _ = request(&mut stdin, &mut reader, "4", "subjects.get", json!({}));
    let _ = request(&mut stdin, &mut reader, "5", "subjects.set", json!({ "count": 3 }));
    let _ = request(
        &mut stdin,
        &mut reader,
        "6",
        "students.add",
        json!({ "name": "Smoke", "scores": ["60", 70, "80"] }),
    );
    let _ = request(&mut stdin, &mut reader, "7", "students.list", json!({}));
    let _ = request(&mut stdin, &mut reader, "8", "roster.stats", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "9",
        "roster.export",
        json!({ "outPath": csv_out.to_string_lossy() }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "10",
        "reports.student",
        json!({ "name": "Smoke", "outPath": report_out.to_string_lossy() }),
    );
    let exported = request(
        &mut stdin,
        &mut reader,
        "11",
        "backup.export",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(exported["ok"], json!(true));
    assert_eq!(exported["result"]["bundleFormat"], json!("gradebook-roster-v1"));
    let imported = request(
        &mut stdin,
        &mut reader,
        "12",
        "backup.import",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(imported["ok"], json!(true));
    assert_eq!(imported["result"]["studentCount"], json!(1));
    let _ = request(&mut stdin, &mut reader, "13", "roster.clear", json!({}));
    let _ = request(&mut stdin, &mut reader, "14", "session.logout", json!({}));

    let unknown = json!({ "id": "15", "method": "does.not.exist", "params": {} });
    writeln!(stdin, "{}", unknown).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value["error"]["code"], json!("not_implemented"));

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("bad_json"));

    assert!(csv_out.is_file());
    assert!(report_out.is_file());
    assert!(bundle_out.is_file());

    drop(stdin);
    let _ = child.wait();
}
