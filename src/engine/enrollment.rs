//! Enrollment rows and their state machine.
//!
//! ```text
//! (none)     --register--> registered
//! registered --drop------> dropped
//! dropped    --register--> registered   (same row, reactivated)
//! registered --complete--> completed    (terminal, section-wide)
//! ```
//!
//! Register and drop read the row, apply [`transition`] and write back inside
//! one IMMEDIATE transaction, so the capacity and one-row-per-pair checks
//! hold across concurrent sidecars.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::access;
use super::actor::Actor;
use super::catalog::{self, Section};
use super::error::{EngineError, Result};
use super::{adddrop, immediate_tx, maintenance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Registered,
    Dropped,
    Completed,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Dropped => "dropped",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(Self::Registered),
            "dropped" => Some(Self::Dropped),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentEvent {
    Register,
    Drop,
    Complete,
}

/// The transition table. `current` is `None` when no row exists yet.
pub fn transition(
    current: Option<EnrollmentStatus>,
    event: EnrollmentEvent,
) -> Result<EnrollmentStatus> {
    use EnrollmentEvent as E;
    use EnrollmentStatus as S;
    match (current, event) {
        (None, E::Register) | (Some(S::Dropped), E::Register) => Ok(S::Registered),
        (Some(S::Registered), E::Register) => Err(EngineError::AlreadyEnrolled(
            "already registered in this section".to_string(),
        )),
        (Some(S::Completed), E::Register) => Err(EngineError::AlreadyEnrolled(
            "this section is already completed".to_string(),
        )),
        (Some(S::Registered), E::Drop) => Ok(S::Dropped),
        (_, E::Drop) => Err(EngineError::NotEnrolled),
        (Some(S::Registered), E::Complete) => Ok(S::Completed),
        (other, E::Complete) => Err(EngineError::validation(format!(
            "cannot complete an enrollment in state {}",
            other.map(S::as_str).unwrap_or("none")
        ))),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutcome {
    pub enrollment_id: String,
    pub reactivated: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledSection {
    pub enrollment_id: String,
    pub status: EnrollmentStatus,
    pub section: Section,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSection {
    pub section: Section,
    pub percentage: Option<f64>,
    pub letter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledStudent {
    pub student_id: String,
    pub full_name: String,
    pub roll_no: Option<String>,
    pub status: EnrollmentStatus,
}

fn read_row(
    conn: &Connection,
    student_id: &str,
    section_id: &str,
) -> Result<Option<(String, EnrollmentStatus)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, status FROM enrollments WHERE student_id = ? AND section_id = ?",
            (student_id, section_id),
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        None => Ok(None),
        Some((id, status)) => {
            let status = EnrollmentStatus::parse(&status).ok_or_else(|| {
                EngineError::validation(format!("stored enrollment status {:?} is unknown", status))
            })?;
            Ok(Some((id, status)))
        }
    }
}

fn write_status(conn: &Connection, enrollment_id: &str, status: EnrollmentStatus) -> Result<()> {
    conn.execute(
        "UPDATE enrollments SET status = ?, updated_at = ? WHERE id = ?",
        (status.as_str(), Utc::now().to_rfc3339(), enrollment_id),
    )?;
    Ok(())
}

pub fn register(
    conn: &Connection,
    actor: &Actor,
    student_id: &str,
    section_id: &str,
    today: NaiveDate,
) -> Result<RegisterOutcome> {
    access::require_student(actor, student_id)?;
    maintenance::require_write_allowed(conn)?;
    adddrop::require_before_deadline(conn, today)?;

    let tx = immediate_tx(conn)?;

    let capacity: Option<i64> = tx
        .query_row(
            "SELECT capacity FROM sections WHERE id = ?",
            [section_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(capacity) = capacity else {
        return Err(EngineError::not_found("section"));
    };

    let current = read_row(&tx, student_id, section_id)?;
    let next = transition(current.as_ref().map(|(_, s)| *s), EnrollmentEvent::Register)?;

    let taken: i64 = tx.query_row(
        "SELECT COUNT(*) FROM enrollments WHERE section_id = ? AND status = 'registered'",
        [section_id],
        |r| r.get(0),
    )?;
    if taken >= capacity {
        debug!(section = %section_id, taken, capacity, "registration refused: full");
        return Err(EngineError::SectionFull { capacity });
    }

    let outcome = match current {
        Some((enrollment_id, _)) => {
            write_status(&tx, &enrollment_id, next)?;
            RegisterOutcome {
                enrollment_id,
                reactivated: true,
            }
        }
        None => {
            let enrollment_id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO enrollments(id, student_id, section_id, status, updated_at)
                 VALUES(?, ?, ?, ?, ?)",
                (
                    &enrollment_id,
                    student_id,
                    section_id,
                    next.as_str(),
                    Utc::now().to_rfc3339(),
                ),
            )?;
            RegisterOutcome {
                enrollment_id,
                reactivated: false,
            }
        }
    };
    tx.commit()?;

    info!(
        student = %student_id,
        section = %section_id,
        reactivated = outcome.reactivated,
        "student registered"
    );
    Ok(outcome)
}

pub fn drop(
    conn: &Connection,
    actor: &Actor,
    student_id: &str,
    section_id: &str,
    today: NaiveDate,
) -> Result<()> {
    access::require_student(actor, student_id)?;
    maintenance::require_write_allowed(conn)?;
    adddrop::require_before_deadline(conn, today)?;

    let tx = immediate_tx(conn)?;
    let current = read_row(&tx, student_id, section_id)?;
    let next = transition(current.as_ref().map(|(_, s)| *s), EnrollmentEvent::Drop)?;
    let Some((enrollment_id, _)) = current else {
        return Err(EngineError::NotEnrolled);
    };
    write_status(&tx, &enrollment_id, next)?;
    tx.commit()?;

    info!(student = %student_id, section = %section_id, "student dropped");
    Ok(())
}

/// Moves every registered row of the section to completed. Only called from
/// grade finalization; returns how many rows changed.
/// Completes the named students' registered rows. Runs on the caller's
/// connection so it can share the transaction that stored their grades;
/// rows registered after the grades were computed stay registered.
pub(crate) fn mark_section_completed(
    conn: &Connection,
    section_id: &str,
    student_ids: &[String],
) -> Result<usize> {
    let next = transition(Some(EnrollmentStatus::Registered), EnrollmentEvent::Complete)?;
    let mut stmt = conn.prepare(
        "SELECT id FROM enrollments WHERE section_id = ? AND student_id = ? AND status = 'registered'",
    )?;
    let mut completed = 0;
    for student_id in student_ids {
        let id: Option<String> = stmt
            .query_row((section_id, student_id), |r| r.get(0))
            .optional()?;
        if let Some(id) = id {
            write_status(conn, &id, next)?;
            completed += 1;
        }
    }
    Ok(completed)
}

/// Students whose grades belong to the section: registered now, or already
/// completed by an earlier finalization. Dropped students are excluded.
pub(crate) fn gradeable_student_ids(conn: &Connection, section_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT student_id FROM enrollments
         WHERE section_id = ? AND status IN ('registered', 'completed')
         ORDER BY student_id",
    )?;
    let ids = stmt
        .query_map([section_id], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

fn sections_with_status(
    conn: &Connection,
    student_id: &str,
    status: EnrollmentStatus,
) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, section_id FROM enrollments WHERE student_id = ? AND status = ? ORDER BY section_id",
    )?;
    let rows = stmt
        .query_map((student_id, status.as_str()), |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn list_my_sections(
    conn: &Connection,
    actor: &Actor,
    student_id: &str,
) -> Result<Vec<EnrolledSection>> {
    access::require_student(actor, student_id)?;
    let mut out = Vec::new();
    for (enrollment_id, section_id) in
        sections_with_status(conn, student_id, EnrollmentStatus::Registered)?
    {
        if let Some(section) = catalog::get_section(conn, &section_id)? {
            out.push(EnrolledSection {
                enrollment_id,
                status: EnrollmentStatus::Registered,
                section,
            });
        }
    }
    Ok(out)
}

pub fn list_completed_sections(
    conn: &Connection,
    actor: &Actor,
    student_id: &str,
) -> Result<Vec<CompletedSection>> {
    access::require_student(actor, student_id)?;
    let mut out = Vec::new();
    for (_, section_id) in sections_with_status(conn, student_id, EnrollmentStatus::Completed)? {
        let Some(section) = catalog::get_section(conn, &section_id)? else {
            continue;
        };
        let grade: Option<(f64, String)> = conn
            .query_row(
                "SELECT percentage, letter FROM final_grades WHERE section_id = ? AND student_id = ?",
                (&section_id, student_id),
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        out.push(CompletedSection {
            section,
            percentage: grade.as_ref().map(|g| g.0),
            letter: grade.map(|g| g.1),
        });
    }
    Ok(out)
}

pub fn enrolled_students(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<Vec<EnrolledStudent>> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    let mut stmt = conn.prepare(
        "SELECT e.student_id, u.full_name, p.roll_no, e.status
         FROM enrollments e
         JOIN users u ON u.id = e.student_id
         LEFT JOIN student_profiles p ON p.user_id = e.student_id
         WHERE e.section_id = ? AND e.status IN ('registered', 'completed')
         ORDER BY p.roll_no, e.student_id",
    )?;
    let rows = stmt
        .query_map([section_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(student_id, full_name, roll_no, status)| {
            let status = EnrollmentStatus::parse(&status).ok_or_else(|| {
                EngineError::validation(format!("stored enrollment status {:?} is unknown", status))
            })?;
            Ok(EnrolledStudent {
                student_id,
                full_name,
                roll_no,
                status,
            })
        })
        .collect()
}
