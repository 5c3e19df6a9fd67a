use chrono::NaiveDate;
use rusqlite::Connection;

use super::actor::{Actor, Role};
use super::catalog::{self, NewSection};
use crate::db;

pub struct SeededCatalog {
    pub conn: Connection,
    pub admin: String,
    pub instructor: String,
    pub other_instructor: String,
    pub students: Vec<String>,
    pub section: String,
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date")
}

/// One course, one section with the given capacity owned by `i1`, a second
/// instructor `i2` and six students.
pub fn seed_catalog(capacity: i64) -> SeededCatalog {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    db::init_schema(&conn).expect("schema");

    catalog::bootstrap_admin(&conn, "root", "Root Admin").expect("admin");
    let admin = Actor::new("root", Role::Admin);
    for id in ["i1", "i2"] {
        catalog::create_user(&conn, &admin, id, "Instructor", Role::Instructor, None)
            .expect("instructor");
    }
    let students: Vec<String> = (1..=6).map(|n| format!("s{}", n)).collect();
    for id in &students {
        catalog::create_user(&conn, &admin, id, "Student", Role::Student, None).expect("student");
    }
    let course = catalog::create_course(&conn, &admin, "CS201", "Data Structures", 4)
        .expect("course");
    let section = catalog::create_section(
        &conn,
        &admin,
        NewSection {
            course_id: course,
            instructor_id: "i1".into(),
            day_time: "Tue 09:00".into(),
            room: "LH-3".into(),
            capacity,
            semester: "Monsoon".into(),
            year: 2025,
        },
    )
    .expect("section");

    SeededCatalog {
        conn,
        admin: "root".into(),
        instructor: "i1".into(),
        other_instructor: "i2".into(),
        students,
        section,
    }
}
