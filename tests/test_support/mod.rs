#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_erpd");
    let mut child = Command::new(exe)
        .env_remove("ERPD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn erpd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
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
    let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(Value::Null)
}

/// Returns the error code of a call that must fail.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error.code")
        .to_string()
}

/// One sidecar process with its own request counter.
pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    pub fn open(workspace: &Path) -> Self {
        let (child, stdin, reader) = spawn_sidecar();
        let mut s = Self {
            child,
            stdin,
            reader,
            next_id: 0,
        };
        s.ok("workspace.select", json!({ "path": workspace.to_string_lossy() }));
        s
    }

    fn id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    pub fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.id();
        request(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    pub fn ok(&mut self, method: &str, params: Value) -> Value {
        let id = self.id();
        request_ok(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    pub fn err(&mut self, method: &str, params: Value) -> String {
        let id = self.id();
        request_err(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    pub fn login(&mut self, user_id: &str) {
        self.ok("session.login", json!({ "userId": user_id }));
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub struct Seeded {
    pub course_id: String,
    pub section_id: String,
    pub students: Vec<String>,
}

/// Admin `root`, instructors `i1` (owns the section) and `i2`, students
/// `s1..=s<student_count>`, one course and one section. Leaves the sidecar
/// logged in as `root`.
pub fn seed_section(sc: &mut Sidecar, capacity: i64, student_count: usize) -> Seeded {
    sc.ok(
        "setup.bootstrapAdmin",
        json!({ "userId": "root", "fullName": "Root Admin" }),
    );
    sc.login("root");
    for (id, dept) in [("i1", "CSE"), ("i2", "ECE")] {
        sc.ok(
            "users.create",
            json!({
                "userId": id,
                "fullName": format!("Instructor {}", id),
                "role": "instructor",
                "profile": { "department": dept, "designation": "Assistant Professor" }
            }),
        );
    }
    let students: Vec<String> = (1..=student_count).map(|n| format!("s{}", n)).collect();
    for (n, id) in students.iter().enumerate() {
        sc.ok(
            "users.create",
            json!({
                "userId": id,
                "fullName": format!("Student {}", id),
                "role": "student",
                "profile": { "rollNo": format!("2025{:03}", n + 1), "program": "BTech", "year": 2 }
            }),
        );
    }
    let course = sc.ok(
        "courses.create",
        json!({ "code": "CS201", "title": "Data Structures", "credits": 4 }),
    );
    let course_id = course["courseId"].as_str().expect("courseId").to_string();
    let section = sc.ok(
        "sections.create",
        json!({
            "courseId": course_id,
            "instructorId": "i1",
            "dayTime": "Mon/Wed 10:00",
            "room": "LH-101",
            "capacity": capacity,
            "semester": "Monsoon",
            "year": 2025
        }),
    );
    let section_id = section["sectionId"].as_str().expect("sectionId").to_string();
    Seeded {
        course_id,
        section_id,
        students,
    }
}
