use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "erp.sqlite3";

pub fn open_db(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace directory {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    // Other sidecars may hold the write lock; wait instead of failing with SQLITE_BUSY.
    conn.busy_timeout(busy_timeout)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('student', 'instructor', 'admin'))
        )",
        [],
    )?;
    ensure_users_status(conn)?;
    ensure_users_created_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_profiles(
            user_id TEXT PRIMARY KEY,
            roll_no TEXT NOT NULL,
            program TEXT NOT NULL,
            year INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructor_profiles(
            user_id TEXT PRIMARY KEY,
            department TEXT NOT NULL,
            designation TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            credits INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sections(
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL,
            instructor_id TEXT NOT NULL,
            day_time TEXT NOT NULL,
            room TEXT NOT NULL,
            capacity INTEGER NOT NULL CHECK(capacity > 0),
            semester TEXT NOT NULL,
            year INTEGER NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(instructor_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sections_course ON sections(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sections_instructor ON sections(instructor_id)",
        [],
    )?;

    // One row per (student, section); re-registration reactivates it.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            section_id TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('registered', 'dropped', 'completed')),
            updated_at TEXT,
            FOREIGN KEY(student_id) REFERENCES users(id),
            FOREIGN KEY(section_id) REFERENCES sections(id),
            UNIQUE(student_id, section_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_section_status ON enrollments(section_id, status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessments(
            id TEXT PRIMARY KEY,
            section_id TEXT NOT NULL,
            idx INTEGER NOT NULL,
            name TEXT NOT NULL,
            max_marks REAL NOT NULL CHECK(max_marks > 0),
            weight REAL NOT NULL CHECK(weight >= 0 AND weight <= 100),
            FOREIGN KEY(section_id) REFERENCES sections(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assessments_section ON assessments(section_id, idx)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            id TEXT PRIMARY KEY,
            assessment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            marks_obtained REAL NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(assessment_id) REFERENCES assessments(id),
            FOREIGN KEY(student_id) REFERENCES users(id),
            UNIQUE(assessment_id, student_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_student ON scores(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_slabs(
            id TEXT PRIMARY KEY,
            section_id TEXT NOT NULL,
            letter TEXT NOT NULL COLLATE NOCASE,
            min_percent REAL NOT NULL,
            max_percent REAL NOT NULL,
            FOREIGN KEY(section_id) REFERENCES sections(id),
            UNIQUE(section_id, letter)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS final_grades(
            section_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            percentage REAL NOT NULL,
            letter TEXT NOT NULL,
            PRIMARY KEY(section_id, student_id),
            FOREIGN KEY(section_id) REFERENCES sections(id),
            FOREIGN KEY(student_id) REFERENCES users(id)
        )",
        [],
    )?;
    ensure_final_grades_computed_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_final_grades_student ON final_grades(student_id)",
        [],
    )?;

    Ok(())
}

fn ensure_users_status(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "users", "status")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE users ADD COLUMN status TEXT NOT NULL DEFAULT 'active'",
        [],
    )?;
    Ok(())
}

fn ensure_users_created_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "users", "created_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE users ADD COLUMN created_at TEXT", [])?;
    Ok(())
}

fn ensure_final_grades_computed_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "final_grades", "computed_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE final_grades ADD COLUMN computed_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    // A corrupt value reads as unset rather than poisoning every request.
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn init_schema_is_rerunnable() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("first init");
        init_schema(&conn).expect("second init");
        assert!(table_has_column(&conn, "final_grades", "computed_at").expect("pragma"));
        assert!(table_has_column(&conn, "users", "status").expect("pragma"));
    }

    #[test]
    fn settings_round_trip_and_overwrite() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("init");
        assert_eq!(settings_get_json(&conn, "maintenance_mode").expect("get"), None);
        settings_set_json(&conn, "maintenance_mode", &json!(true)).expect("set");
        settings_set_json(&conn, "maintenance_mode", &json!(false)).expect("set again");
        assert_eq!(
            settings_get_json(&conn, "maintenance_mode").expect("get"),
            Some(json!(false))
        );
    }
}
