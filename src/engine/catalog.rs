//! Users, courses and sections. Written by admins, read by everything else.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::access;
use super::actor::{Actor, Role, RoleProfile};
use super::error::{EngineError, Result};
use super::{immediate_tx, maintenance};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub code: String,
    pub title: String,
    pub credits: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub course_id: String,
    pub course_code: String,
    pub course_title: String,
    pub instructor_id: String,
    pub day_time: String,
    pub room: String,
    pub capacity: i64,
    pub semester: String,
    pub year: i64,
    pub seats_taken: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub full_name: String,
    pub role: Role,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct NewSection {
    pub course_id: String,
    pub instructor_id: String,
    pub day_time: String,
    pub room: String,
    pub capacity: i64,
    pub semester: String,
    pub year: i64,
}

const SECTION_SELECT: &str = "SELECT
       s.id, s.course_id, c.code, c.title, s.instructor_id, s.day_time, s.room,
       s.capacity, s.semester, s.year,
       (SELECT COUNT(*) FROM enrollments e
         WHERE e.section_id = s.id AND e.status = 'registered') AS seats_taken
     FROM sections s
     JOIN courses c ON c.id = s.course_id";

fn map_section(r: &rusqlite::Row<'_>) -> rusqlite::Result<Section> {
    Ok(Section {
        id: r.get(0)?,
        course_id: r.get(1)?,
        course_code: r.get(2)?,
        course_title: r.get(3)?,
        instructor_id: r.get(4)?,
        day_time: r.get(5)?,
        room: r.get(6)?,
        capacity: r.get(7)?,
        semester: r.get(8)?,
        year: r.get(9)?,
        seats_taken: r.get(10)?,
    })
}

fn require_non_blank(value: &str, field: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(EngineError::validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

pub fn get_section(conn: &Connection, section_id: &str) -> Result<Option<Section>> {
    let sql = format!("{} WHERE s.id = ?", SECTION_SELECT);
    Ok(conn.query_row(&sql, [section_id], map_section).optional()?)
}

pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare("SELECT id, code, title, credits FROM courses ORDER BY code")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(Course {
                id: r.get(0)?,
                code: r.get(1)?,
                title: r.get(2)?,
                credits: r.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn list_sections(conn: &Connection, course_id: Option<&str>) -> Result<Vec<Section>> {
    let rows = match course_id {
        Some(cid) => {
            let sql = format!(
                "{} WHERE s.course_id = ? ORDER BY s.year, s.semester, s.day_time",
                SECTION_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([cid], map_section)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
        None => {
            let sql = format!("{} ORDER BY c.code, s.year, s.semester", SECTION_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_section)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Sections taught by one instructor (instructor-self).
pub fn sections_for_instructor(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
) -> Result<Vec<Section>> {
    access::require_instructor(actor, instructor_id)?;
    let sql = format!(
        "{} WHERE s.instructor_id = ? ORDER BY c.code, s.year, s.semester",
        SECTION_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([instructor_id], map_section)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn insert_user(
    conn: &Connection,
    user_id: &str,
    full_name: &str,
    role: Role,
    profile: Option<&RoleProfile>,
) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?", [user_id], |r| r.get(0))
        .optional()?;
    if exists.is_some() {
        return Err(EngineError::validation(format!(
            "user {:?} already exists",
            user_id
        )));
    }

    conn.execute(
        "INSERT INTO users(id, full_name, role, status, created_at) VALUES(?, ?, ?, 'active', ?)",
        (user_id, full_name, role.as_str(), Utc::now().to_rfc3339()),
    )?;

    match (role, profile) {
        (_, None) | (Role::Admin, Some(RoleProfile::Admin)) => {}
        (Role::Student, Some(RoleProfile::Student(p))) => {
            conn.execute(
                "INSERT INTO student_profiles(user_id, roll_no, program, year) VALUES(?, ?, ?, ?)",
                (user_id, &p.roll_no, &p.program, p.year),
            )?;
        }
        (Role::Instructor, Some(RoleProfile::Instructor(p))) => {
            conn.execute(
                "INSERT INTO instructor_profiles(user_id, department, designation) VALUES(?, ?, ?)",
                (user_id, &p.department, &p.designation),
            )?;
        }
        _ => {
            return Err(EngineError::validation(format!(
                "profile does not match role {}",
                role.as_str()
            )))
        }
    }
    Ok(())
}

pub fn create_user(
    conn: &Connection,
    actor: &Actor,
    user_id: &str,
    full_name: &str,
    role: Role,
    profile: Option<RoleProfile>,
) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    let user_id = require_non_blank(user_id, "userId")?;
    let full_name = require_non_blank(full_name, "fullName")?;

    let tx = conn.unchecked_transaction()?;
    insert_user(&tx, &user_id, &full_name, role, profile.as_ref())?;
    tx.commit()?;
    info!(admin = %actor.id, user = %user_id, role = role.as_str(), "user created");
    Ok(())
}

/// Creates the first admin of an empty workspace. Refused once any admin exists.
pub fn bootstrap_admin(conn: &Connection, user_id: &str, full_name: &str) -> Result<()> {
    let user_id = require_non_blank(user_id, "userId")?;
    let full_name = require_non_blank(full_name, "fullName")?;

    let tx = immediate_tx(conn)?;
    let admins: i64 = tx.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'admin'",
        [],
        |r| r.get(0),
    )?;
    if admins > 0 {
        return Err(EngineError::access_denied());
    }
    insert_user(&tx, &user_id, &full_name, Role::Admin, None)?;
    tx.commit()?;
    info!(user = %user_id, "bootstrap admin created");
    Ok(())
}

pub fn list_users(conn: &Connection, actor: &Actor, role: Option<Role>) -> Result<Vec<UserSummary>> {
    access::require_admin(actor)?;
    let mut stmt = conn.prepare(
        "SELECT id, full_name, role, status FROM users
         WHERE (?1 IS NULL OR role = ?1)
         ORDER BY role, id",
    )?;
    let rows = stmt
        .query_map([role.map(Role::as_str)], |r| {
            let role: String = r.get(2)?;
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, role, r.get::<_, String>(3)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, full_name, role, status)| {
            let role = Role::parse(&role)
                .ok_or_else(|| EngineError::validation(format!("stored role {:?} is unknown", role)))?;
            Ok(UserSummary {
                id,
                full_name,
                role,
                status,
            })
        })
        .collect()
}

pub fn create_course(
    conn: &Connection,
    actor: &Actor,
    code: &str,
    title: &str,
    credits: i64,
) -> Result<String> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    let code = require_non_blank(code, "code")?;
    let title = require_non_blank(title, "title")?;
    if credits <= 0 {
        return Err(EngineError::validation("credits must be positive"));
    }

    let dup: Option<i64> = conn
        .query_row("SELECT 1 FROM courses WHERE code = ?", [&code], |r| r.get(0))
        .optional()?;
    if dup.is_some() {
        return Err(EngineError::validation(format!(
            "course code {:?} already exists",
            code
        )));
    }

    let course_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO courses(id, code, title, credits) VALUES(?, ?, ?, ?)",
        (&course_id, &code, &title, credits),
    )?;
    info!(admin = %actor.id, course = %course_id, code = %code, "course created");
    Ok(course_id)
}

pub fn update_course(
    conn: &Connection,
    actor: &Actor,
    course_id: &str,
    code: &str,
    title: &str,
    credits: i64,
) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    let code = require_non_blank(code, "code")?;
    let title = require_non_blank(title, "title")?;
    if credits <= 0 {
        return Err(EngineError::validation("credits must be positive"));
    }

    let tx = immediate_tx(conn)?;
    if !course_exists(&tx, course_id)? {
        return Err(EngineError::not_found("course"));
    }
    let dup: Option<i64> = tx
        .query_row(
            "SELECT 1 FROM courses WHERE code = ? AND id <> ?",
            (&code, course_id),
            |r| r.get(0),
        )
        .optional()?;
    if dup.is_some() {
        return Err(EngineError::validation(format!(
            "course code {:?} already exists",
            code
        )));
    }
    tx.execute(
        "UPDATE courses SET code = ?, title = ?, credits = ? WHERE id = ?",
        (&code, &title, credits, course_id),
    )?;
    tx.commit()?;
    info!(admin = %actor.id, course = %course_id, code = %code, "course updated");
    Ok(())
}

/// Only a course with no sections can be removed.
pub fn delete_course(conn: &Connection, actor: &Actor, course_id: &str) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;

    let tx = immediate_tx(conn)?;
    if !course_exists(&tx, course_id)? {
        return Err(EngineError::not_found("course"));
    }
    let sections = count_where(&tx, "SELECT COUNT(*) FROM sections WHERE course_id = ?", course_id)?;
    if sections > 0 {
        return Err(EngineError::validation(format!(
            "course still has {} sections; delete them first",
            sections
        )));
    }
    tx.execute("DELETE FROM courses WHERE id = ?", [course_id])?;
    tx.commit()?;
    info!(admin = %actor.id, course = %course_id, "course deleted");
    Ok(())
}

fn require_instructor_user(conn: &Connection, instructor_id: &str) -> Result<()> {
    let role: Option<String> = conn
        .query_row("SELECT role FROM users WHERE id = ?", [instructor_id], |r| {
            r.get(0)
        })
        .optional()?;
    match role.as_deref().and_then(Role::parse) {
        Some(Role::Instructor) => Ok(()),
        Some(_) => Err(EngineError::validation(format!(
            "user {:?} is not an instructor",
            instructor_id
        ))),
        None => Err(EngineError::not_found("instructor")),
    }
}

/// Trims and checks every field; the course and instructor must exist.
fn validated_section(conn: &Connection, new: NewSection) -> Result<NewSection> {
    let checked = NewSection {
        course_id: require_non_blank(&new.course_id, "courseId")?,
        instructor_id: require_non_blank(&new.instructor_id, "instructorId")?,
        day_time: require_non_blank(&new.day_time, "dayTime")?,
        room: require_non_blank(&new.room, "room")?,
        semester: require_non_blank(&new.semester, "semester")?,
        capacity: new.capacity,
        year: new.year,
    };
    if checked.capacity <= 0 {
        return Err(EngineError::validation("capacity must be positive"));
    }
    if checked.year <= 0 {
        return Err(EngineError::validation("year must be positive"));
    }
    if !course_exists(conn, &checked.course_id)? {
        return Err(EngineError::not_found("course"));
    }
    require_instructor_user(conn, &checked.instructor_id)?;
    Ok(checked)
}

fn course_exists(conn: &Connection, course_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM courses WHERE id = ?", [course_id], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn count_where(conn: &Connection, sql: &str, id: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [id], |r| r.get(0))?)
}

pub fn create_section(conn: &Connection, actor: &Actor, new: NewSection) -> Result<String> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    let new = validated_section(conn, new)?;

    let section_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO sections(id, course_id, instructor_id, day_time, room, capacity, semester, year)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &section_id,
            &new.course_id,
            &new.instructor_id,
            &new.day_time,
            &new.room,
            new.capacity,
            &new.semester,
            new.year,
        ),
    )?;
    info!(admin = %actor.id, section = %section_id, capacity = new.capacity, "section created");
    Ok(section_id)
}

/// Rewrites every section field. Capacity may not drop below the seats
/// already taken.
pub fn update_section(
    conn: &Connection,
    actor: &Actor,
    section_id: &str,
    new: NewSection,
) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    let new = validated_section(conn, new)?;

    let tx = immediate_tx(conn)?;
    let taken = match get_section(&tx, section_id)? {
        Some(s) => s.seats_taken,
        None => return Err(EngineError::not_found("section")),
    };
    if new.capacity < taken {
        return Err(EngineError::validation(format!(
            "capacity {} is below the {} students already registered",
            new.capacity, taken
        )));
    }
    tx.execute(
        "UPDATE sections
         SET course_id = ?, instructor_id = ?, day_time = ?, room = ?, capacity = ?, semester = ?, year = ?
         WHERE id = ?",
        (
            &new.course_id,
            &new.instructor_id,
            &new.day_time,
            &new.room,
            new.capacity,
            &new.semester,
            new.year,
            section_id,
        ),
    )?;
    tx.commit()?;
    info!(admin = %actor.id, section = %section_id, capacity = new.capacity, "section updated");
    Ok(())
}

/// Removes an unused section with its assessments and slabs. Any enrollment
/// row, dropped ones included, or stored final grade keeps it alive.
pub fn delete_section(conn: &Connection, actor: &Actor, section_id: &str) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;

    let tx = immediate_tx(conn)?;
    if get_section(&tx, section_id)?.is_none() {
        return Err(EngineError::not_found("section"));
    }
    let enrollments = count_where(&tx, "SELECT COUNT(*) FROM enrollments WHERE section_id = ?", section_id)?;
    let finals = count_where(&tx, "SELECT COUNT(*) FROM final_grades WHERE section_id = ?", section_id)?;
    if enrollments > 0 || finals > 0 {
        return Err(EngineError::validation(format!(
            "section has {} enrollments and {} final grades; it cannot be deleted",
            enrollments, finals
        )));
    }
    // No ON DELETE CASCADE; children go first.
    tx.execute(
        "DELETE FROM scores WHERE assessment_id IN (SELECT id FROM assessments WHERE section_id = ?)",
        [section_id],
    )?;
    let assessments = tx.execute("DELETE FROM assessments WHERE section_id = ?", [section_id])?;
    let slabs = tx.execute("DELETE FROM grade_slabs WHERE section_id = ?", [section_id])?;
    tx.execute("DELETE FROM sections WHERE id = ?", [section_id])?;
    tx.commit()?;
    info!(admin = %actor.id, section = %section_id, assessments, slabs, "section deleted");
    Ok(())
}

/// Reassigns the section without touching its schedule or capacity.
pub fn assign_instructor(
    conn: &Connection,
    actor: &Actor,
    section_id: &str,
    instructor_id: &str,
) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    require_instructor_user(conn, instructor_id)?;
    let changed = conn.execute(
        "UPDATE sections SET instructor_id = ? WHERE id = ?",
        (instructor_id, section_id),
    )?;
    if changed == 0 {
        return Err(EngineError::not_found("section"));
    }
    info!(admin = %actor.id, section = %section_id, instructor = %instructor_id, "instructor reassigned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::engine::actor::{load_profile, InstructorProfile};
    use crate::engine::enrollment;
    use crate::engine::ledger::{self, AssessmentInput};
    use crate::engine::slabs::{self, SlabInput};
    use crate::engine::testutil::{seed_catalog, today, SeededCatalog};

    fn conn() -> Connection {
        let c = Connection::open_in_memory().expect("open");
        db::init_schema(&c).expect("schema");
        c
    }

    #[test]
    fn bootstrap_only_once() {
        let c = conn();
        bootstrap_admin(&c, "root", "Root Admin").expect("first admin");
        assert!(matches!(
            bootstrap_admin(&c, "root2", "Second"),
            Err(EngineError::AccessDenied(_))
        ));
    }

    #[test]
    fn section_creation_validates_and_counts_seats() {
        let c = conn();
        bootstrap_admin(&c, "root", "Root").expect("admin");
        let admin = Actor::new("root", Role::Admin);
        create_user(
            &c,
            &admin,
            "i1",
            "Ada",
            Role::Instructor,
            Some(RoleProfile::Instructor(InstructorProfile {
                department: "CS".into(),
                designation: "Lecturer".into(),
            })),
        )
        .expect("instructor");
        create_user(&c, &admin, "s1", "Sam", Role::Student, None).expect("student");
        let course = create_course(&c, &admin, "CS101", "Intro", 4).expect("course");

        let base = NewSection {
            course_id: course.clone(),
            instructor_id: "i1".into(),
            day_time: "Mon 10:00".into(),
            room: "B-12".into(),
            capacity: 30,
            semester: "Fall".into(),
            year: 2025,
        };

        let zero_cap = create_section(&c, &admin, NewSection { capacity: 0, ..base.clone() });
        assert_eq!(zero_cap.unwrap_err().code(), "bad_params");

        let student_as_instructor = create_section(
            &c,
            &admin,
            NewSection {
                instructor_id: "s1".into(),
                ..base.clone()
            },
        );
        assert_eq!(student_as_instructor.unwrap_err().code(), "bad_params");

        let sid = create_section(&c, &admin, base).expect("section");
        let sec = get_section(&c, &sid).expect("get").expect("exists");
        assert_eq!(sec.course_code, "CS101");
        assert_eq!(sec.seats_taken, 0);
        assert_eq!(list_sections(&c, Some(&course)).expect("list").len(), 1);

        let p = load_profile(&c, &Actor::new("i1", Role::Instructor)).expect("profile");
        assert!(matches!(p, Some(RoleProfile::Instructor(_))));
    }

    #[test]
    fn non_admin_cannot_write_catalog() {
        let c = conn();
        let instructor = Actor::new("i1", Role::Instructor);
        assert!(matches!(
            create_course(&c, &instructor, "CS1", "x", 3),
            Err(EngineError::AccessDenied(_))
        ));
    }

    fn section_fields(cat: &SeededCatalog, capacity: i64) -> NewSection {
        let sec = get_section(&cat.conn, &cat.section).expect("get").expect("exists");
        NewSection {
            course_id: sec.course_id,
            instructor_id: sec.instructor_id,
            day_time: sec.day_time,
            room: sec.room,
            capacity,
            semester: sec.semester,
            year: sec.year,
        }
    }

    #[test]
    fn section_update_cannot_shrink_below_registered() {
        let cat = seed_catalog(5);
        let admin = Actor::new(&cat.admin, Role::Admin);
        for sid in &cat.students[..3] {
            let s = Actor::new(sid, Role::Student);
            enrollment::register(&cat.conn, &s, sid, &cat.section, today()).expect("register");
        }

        let e = update_section(&cat.conn, &admin, &cat.section, section_fields(&cat, 2)).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        assert_eq!(get_section(&cat.conn, &cat.section).expect("get").expect("exists").capacity, 5);

        let moved = NewSection {
            room: "  LH-9 ".into(),
            instructor_id: cat.other_instructor.clone(),
            ..section_fields(&cat, 3)
        };
        update_section(&cat.conn, &admin, &cat.section, moved).expect("update");
        let sec = get_section(&cat.conn, &cat.section).expect("get").expect("exists");
        assert_eq!(sec.capacity, 3);
        assert_eq!(sec.room, "LH-9");
        assert_eq!(sec.instructor_id, cat.other_instructor);
        assert_eq!(sec.seats_taken, 3);

        let e = update_section(&cat.conn, &admin, "missing", section_fields(&cat, 10)).unwrap_err();
        assert_eq!(e.code(), "not_found");

        let instructor = Actor::new(&cat.instructor, Role::Instructor);
        let e = update_section(&cat.conn, &instructor, &cat.section, section_fields(&cat, 10)).unwrap_err();
        assert_eq!(e.code(), "access_denied");
    }

    #[test]
    fn section_delete_refuses_enrollment_history() {
        let cat = seed_catalog(5);
        let admin = Actor::new(&cat.admin, Role::Admin);
        let student = &cat.students[0];
        let s = Actor::new(student, Role::Student);
        enrollment::register(&cat.conn, &s, student, &cat.section, today()).expect("register");
        enrollment::drop(&cat.conn, &s, student, &cat.section, today()).expect("drop");

        // A dropped row is still history.
        let e = delete_section(&cat.conn, &admin, &cat.section).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        assert!(get_section(&cat.conn, &cat.section).expect("get").is_some());

        let e = delete_course(&cat.conn, &admin, &section_fields(&cat, 5).course_id).unwrap_err();
        assert_eq!(e.code(), "bad_params");
    }

    #[test]
    fn unused_section_and_course_are_deleted_with_their_setup() {
        let cat = seed_catalog(5);
        let admin = Actor::new(&cat.admin, Role::Admin);
        let instructor = Actor::new(&cat.instructor, Role::Instructor);
        ledger::add_assessment(
            &cat.conn,
            &instructor,
            &cat.instructor,
            &cat.section,
            &AssessmentInput {
                name: "Quiz".into(),
                max_marks: 10.0,
                weight: 100.0,
            },
        )
        .expect("assessment");
        slabs::add_slab(
            &cat.conn,
            &instructor,
            &cat.instructor,
            &cat.section,
            &SlabInput {
                letter: "A".into(),
                min: 90.0,
                max: 100.0,
            },
        )
        .expect("slab");
        let course_id = section_fields(&cat, 5).course_id;

        delete_section(&cat.conn, &admin, &cat.section).expect("delete section");
        assert!(get_section(&cat.conn, &cat.section).expect("get").is_none());
        let leftovers: i64 = cat
            .conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM assessments) + (SELECT COUNT(*) FROM grade_slabs)",
                [],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(leftovers, 0);
        assert_eq!(
            delete_section(&cat.conn, &admin, &cat.section).unwrap_err().code(),
            "not_found"
        );

        delete_course(&cat.conn, &admin, &course_id).expect("delete course");
        assert!(list_courses(&cat.conn).expect("courses").is_empty());
    }

    #[test]
    fn course_update_rejects_taken_code() {
        let c = conn();
        bootstrap_admin(&c, "root", "Root").expect("admin");
        let admin = Actor::new("root", Role::Admin);
        let first = create_course(&c, &admin, "CS101", "Intro", 4).expect("course");
        create_course(&c, &admin, "CS102", "Systems", 4).expect("course");

        let e = update_course(&c, &admin, &first, "CS102", "Intro", 4).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        let e = update_course(&c, &admin, &first, "CS101", "Intro", 0).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        let e = update_course(&c, &admin, "missing", "CS109", "Other", 3).unwrap_err();
        assert_eq!(e.code(), "not_found");

        update_course(&c, &admin, &first, "CS101", "Introduction to Programming", 3).expect("same code");
        let courses = list_courses(&c).expect("courses");
        let intro = courses.iter().find(|c| c.id == first).expect("course");
        assert_eq!(intro.title, "Introduction to Programming");
        assert_eq!(intro.credits, 3);
    }
}
