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
    let exe = env!("CARGO_BIN_EXE_notenmeisterd");
    let mut child = Command::new(exe)
        .env_remove("NOTENMEISTER_DATA_DIR")
        .env_remove("NOTENMEISTER_LOG_DIR")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn notenmeisterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
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

    let value = read_response(reader);
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

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn result_str(value: &serde_json::Value, key: &str) -> String {
    value
        .get("result")
        .and_then(|r| r.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("missing result.{key} in {value}"))
        .to_string()
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("notenmeister-router-smoke");
    let csv_out = workspace.join("smoke-report.csv");
    let backup_out = workspace.join("smoke-backup.json");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    assert_eq!(health["result"]["workspacePath"], serde_json::Value::Null);

    let before = request(&mut stdin, &mut reader, "2", "schoolYears.list", json!({}));
    assert_eq!(error_code(&before), Some("no_workspace"));

    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let year = request(
        &mut stdin,
        &mut reader,
        "4",
        "schoolYears.create",
        json!({ "name": "2024/25" }),
    );
    let year_id = result_str(&year, "schoolYearId");
    assert_eq!(year["result"]["active"], json!(true));

    let class = request(
        &mut stdin,
        &mut reader,
        "5",
        "classes.create",
        json!({ "name": "7b" }),
    );
    let class_id = result_str(&class, "classId");
    let _ = request(
        &mut stdin,
        &mut reader,
        "6",
        "classes.select",
        json!({ "classId": class_id }),
    );
    let subject = request(
        &mut stdin,
        &mut reader,
        "7",
        "subjects.create",
        json!({ "name": "Mathematik" }),
    );
    let subject_id = result_str(&subject, "subjectId");
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "subjects.select",
        json!({ "subjectId": subject_id }),
    );
    let student = request(
        &mut stdin,
        &mut reader,
        "9",
        "students.create",
        json!({ "firstName": "Max", "lastName": "Muster" }),
    );
    let student_id = result_str(&student, "studentId");
    let column = request(
        &mut stdin,
        &mut reader,
        "10",
        "gradeColumns.create",
        json!({ "name": "1. Schulaufgabe", "kind": "schulaufgabe", "weight": 2 }),
    );
    let column_id = result_str(&column, "columnId");
    let grade = request(
        &mut stdin,
        &mut reader,
        "11",
        "grades.set",
        json!({ "studentId": student_id, "columnId": column_id, "value": 2 }),
    );
    assert_eq!(grade["result"]["created"], json!(true));

    for (i, method) in [
        "store.status",
        "selection.get",
        "schoolYears.list",
        "classes.list",
        "subjects.list",
        "students.list",
        "gradeColumns.list",
        "grades.list",
        "reports.subjectModel",
        "backup.suggestFileName",
        "store.flush",
    ]
    .iter()
    .enumerate()
    {
        let id = format!("list-{i}");
        let resp = request(&mut stdin, &mut reader, &id, method, json!({}));
        assert_eq!(resp["ok"], json!(true), "{method}: {resp}");
    }

    let avg = request(
        &mut stdin,
        &mut reader,
        "12",
        "students.average",
        json!({ "studentId": student_id }),
    );
    assert_eq!(avg["result"]["average"], json!(2.0));

    let csv = request(
        &mut stdin,
        &mut reader,
        "13",
        "reports.exportCsv",
        json!({ "outPath": csv_out.to_string_lossy() }),
    );
    assert_eq!(csv["result"]["rowCount"], json!(1));
    assert!(csv_out.is_file());

    let exported = request(
        &mut stdin,
        &mut reader,
        "14",
        "backup.export",
        json!({ "outPath": backup_out.to_string_lossy() }),
    );
    assert_eq!(exported["result"]["counts"]["gradeEntries"], json!(1));

    let _ = request(
        &mut stdin,
        &mut reader,
        "15",
        "grades.update",
        json!({ "gradeId": result_str(&grade, "gradeId"), "value": 3, "date": "2024-11-11" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "16",
        "schoolYears.setActive",
        json!({ "schoolYearId": year_id }),
    );
    let imported = request(
        &mut stdin,
        &mut reader,
        "17",
        "backup.import",
        json!({ "inPath": backup_out.to_string_lossy() }),
    );
    assert_eq!(imported["result"]["counts"]["students"], json!(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_method_and_bad_json_are_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let bad = read_response(&mut reader);
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(error_code(&bad), Some("bad_json"));

    writeln!(
        stdin,
        "{}",
        json!({ "id": "x", "method": "nope.nothing", "params": {} })
    )
    .expect("write request");
    stdin.flush().expect("flush");
    let unknown = read_response(&mut reader);
    assert_eq!(unknown["id"], json!("x"));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    drop(stdin);
    let _ = child.wait();
}
