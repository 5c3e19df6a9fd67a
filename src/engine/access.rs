//! Role and ownership checks. Every check fails closed with `AccessDenied`.

use rusqlite::{Connection, OptionalExtension};

use super::actor::{Actor, Role};
use super::error::{EngineError, Result};

/// Unwraps the session slot; an empty session is an access failure.
pub fn current(session: Option<&Actor>) -> Result<&Actor> {
    session.ok_or_else(|| EngineError::AccessDenied("Not logged in.".to_string()))
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Student | Role::Instructor => Err(EngineError::access_denied()),
    }
}

pub fn require_student(actor: &Actor, student_id: &str) -> Result<()> {
    match actor.role {
        Role::Student if actor.id == student_id => Ok(()),
        _ => Err(EngineError::access_denied()),
    }
}

pub fn require_instructor(actor: &Actor, instructor_id: &str) -> Result<()> {
    match actor.role {
        Role::Instructor if actor.id == instructor_id => Ok(()),
        _ => Err(EngineError::access_denied()),
    }
}

/// Instructor-self plus section ownership. A missing section is reported
/// exactly like a foreign one.
pub fn require_instructor_for_section(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<()> {
    require_instructor(actor, instructor_id)?;
    let owner: Option<String> = conn
        .query_row(
            "SELECT instructor_id FROM sections WHERE id = ?",
            [section_id],
            |r| r.get(0),
        )
        .optional()?;
    match owner {
        Some(owner) if owner == instructor_id => Ok(()),
        _ => Err(EngineError::access_denied()),
    }
}

/// Read access to one student's grade in a section: the student themself,
/// or the section's instructor.
pub fn require_student_or_section_instructor(
    conn: &Connection,
    actor: &Actor,
    student_id: &str,
    section_id: &str,
) -> Result<()> {
    match actor.role {
        Role::Student => require_student(actor, student_id),
        Role::Instructor => require_instructor_for_section(conn, actor, &actor.id, section_id),
        Role::Admin => Err(EngineError::access_denied()),
    }
}
