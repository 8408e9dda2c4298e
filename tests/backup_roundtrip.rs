use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
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
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(json!({}))
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).expect("read json file");
    serde_json::from_str(&text).expect("parse json file")
}

fn seed(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    request_ok(
        stdin,
        reader,
        "y",
        "schoolYears.create",
        json!({ "name": "2024/25" }),
    );
    let class = request_ok(stdin, reader, "c", "classes.create", json!({ "name": "9a" }));
    request_ok(
        stdin,
        reader,
        "cs",
        "classes.select",
        json!({ "classId": class["classId"] }),
    );
    let subject = request_ok(
        stdin,
        reader,
        "s",
        "subjects.create",
        json!({ "name": "Physik" }),
    );
    request_ok(
        stdin,
        reader,
        "ss",
        "subjects.select",
        json!({ "subjectId": subject["subjectId"] }),
    );
    let student = request_ok(
        stdin,
        reader,
        "st",
        "students.create",
        json!({ "firstName": "Jana", "lastName": "Özdemir" }),
    );
    let column = request_ok(
        stdin,
        reader,
        "col",
        "gradeColumns.create",
        json!({ "name": "Referat", "kind": "muendlich", "weight": 1 }),
    );
    request_ok(
        stdin,
        reader,
        "g",
        "grades.set",
        json!({
            "studentId": student["studentId"],
            "columnId": column["columnId"],
            "value": 1,
            "date": "2024-10-15",
            "comment": "sehr anschaulich"
        }),
    );
}

#[test]
fn export_then_import_restores_the_document() {
    let workspace = temp_dir("notenmeister-backup-roundtrip");
    let backup_path = workspace.join("out").join("notenmeister-backup-2024-10-15.json");
    let data_path = workspace.join("notenmeister-data.json");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed(&mut stdin, &mut reader);

    let name = request_ok(
        &mut stdin,
        &mut reader,
        "n",
        "backup.suggestFileName",
        json!({}),
    );
    let file_name = name["fileName"].as_str().expect("fileName");
    assert!(file_name.starts_with("notenmeister-backup-"));
    assert!(file_name.ends_with(".json"));

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "e",
        "backup.export",
        json!({ "outPath": backup_path.to_string_lossy() }),
    );
    assert_eq!(exported["counts"]["students"], json!(1));
    let backup_json = read_json(&backup_path);
    for key in ["schuljahre", "klassen", "faecher", "schueler", "notenspalten", "noten"] {
        assert!(backup_json.get(key).map(|v| v.is_array()).unwrap_or(false), "{key}");
    }
    assert_eq!(backup_json["noten"][0]["wert"], json!(1));
    assert_eq!(backup_json["noten"][0]["kommentar"], json!("sehr anschaulich"));

    // Diverge from the backup, then restore it.
    request_ok(
        &mut stdin,
        &mut reader,
        "y2",
        "schoolYears.create",
        json!({ "name": "2025/26" }),
    );
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "i",
        "backup.import",
        json!({ "inPath": backup_path.to_string_lossy() }),
    );
    assert_eq!(imported["counts"], exported["counts"]);
    assert!(imported["selection"]["schoolYearId"].is_string());
    assert_eq!(imported["selection"]["classId"], serde_json::Value::Null);
    assert_eq!(imported["selection"]["subjectId"], serde_json::Value::Null);

    request_ok(&mut stdin, &mut reader, "f", "store.flush", json!({}));
    assert_eq!(read_json(&data_path), backup_json);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn rejected_import_leaves_state_unchanged() {
    let workspace = temp_dir("notenmeister-backup-reject");
    let bad_path = workspace.join("incomplete.json");
    let data_path = workspace.join("notenmeister-data.json");
    std::fs::write(
        &bad_path,
        json!({
            "schuljahre": [],
            "klassen": [],
            "faecher": [],
            "schueler": [],
            "notenspalten": []
        })
        .to_string(),
    )
    .expect("write incomplete backup");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    seed(&mut stdin, &mut reader);
    request_ok(&mut stdin, &mut reader, "f1", "store.flush", json!({}));
    let before_disk = read_json(&data_path);
    let before = request_ok(&mut stdin, &mut reader, "s1", "store.status", json!({}));

    let rejected = request(
        &mut stdin,
        &mut reader,
        "i",
        "backup.import",
        json!({ "inPath": bad_path.to_string_lossy() }),
    );
    assert_eq!(rejected["ok"], json!(false));
    assert_eq!(rejected["error"]["code"], json!("bad_backup"));
    assert!(rejected["error"]["message"]
        .as_str()
        .unwrap_or("")
        .contains("noten"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "m",
        "backup.import",
        json!({ "inPath": workspace.join("nope.json").to_string_lossy() }),
    );
    assert_eq!(missing["error"]["code"], json!("io_failed"));

    let after = request_ok(&mut stdin, &mut reader, "s2", "store.status", json!({}));
    assert_eq!(after, before);
    request_ok(&mut stdin, &mut reader, "f2", "store.flush", json!({}));
    assert_eq!(read_json(&data_path), before_disk);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
