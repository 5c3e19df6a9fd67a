//! Weighted aggregation of raw scores into a final percentage and letter.
//!
//! `percentage = Σ (marks / max_marks) × weight` over the section's
//! assessments in creation order. A missing score contributes 0. Weights are
//! not normalized; [`audit_weights`] reports sections whose weights do not
//! add up to 100.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};

use super::access;
use super::actor::Actor;
use super::catalog;
use super::enrollment::{self, EnrolledStudent};
use super::error::{EngineError, Result};
use super::ledger::{self, Assessment};
use super::slabs::{self, GradeSlab};
use super::{immediate_tx, maintenance};

const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGrade {
    pub student_id: String,
    pub section_id: String,
    pub percentage: f64,
    pub letter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightAudit {
    pub total: f64,
    pub balanced: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalsPreview {
    pub finals: Vec<FinalGrade>,
    pub weights: WeightAudit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOutcome {
    pub students: usize,
    pub rows_changed: usize,
    pub enrollments_completed: usize,
    pub weights: WeightAudit,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGradeView {
    #[serde(flatten)]
    pub grade: FinalGrade,
    /// False when the grade was computed on the fly and not stored.
    pub persisted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradebookRow {
    pub student: EnrolledStudent,
    /// Aligned with `Gradebook::assessments`; `None` = no score recorded.
    pub marks: Vec<Option<f64>>,
    pub computed: FinalGrade,
    pub stored: Option<FinalGrade>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradebook {
    pub assessments: Vec<Assessment>,
    pub slabs: Vec<GradeSlab>,
    pub weights: WeightAudit,
    pub rows: Vec<GradebookRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub section_id: String,
    pub course_code: String,
    pub course_title: String,
    pub semester: String,
    pub year: i64,
    pub percentage: f64,
    pub letter: String,
}

pub fn audit_weights(assessments: &[Assessment]) -> WeightAudit {
    let total: f64 = assessments.iter().map(|a| a.weight).sum();
    WeightAudit {
        total,
        balanced: (total - 100.0).abs() < WEIGHT_TOLERANCE,
    }
}

/// The aggregation itself. Every path that produces a percentage goes through
/// here so stored, previewed and per-student values agree bit for bit.
pub fn weighted_percentage<F>(assessments: &[Assessment], mut marks_for: F) -> f64
where
    F: FnMut(&Assessment) -> Option<f64>,
{
    let mut total = 0.0;
    for a in assessments {
        let marks = marks_for(a).unwrap_or(0.0);
        total += (marks / a.max_marks) * a.weight;
    }
    total
}

pub fn compute_final_percentage(conn: &Connection, section_id: &str, student_id: &str) -> Result<f64> {
    let assessments = ledger::section_assessments(conn, section_id)?;
    let mut lookup_err = None;
    let pct = weighted_percentage(&assessments, |a| {
        match ledger::marks_for(conn, &a.id, student_id) {
            Ok(m) => m,
            Err(e) => {
                lookup_err.get_or_insert(e);
                None
            }
        }
    });
    match lookup_err {
        Some(e) => Err(e),
        None => Ok(pct),
    }
}

pub fn compute_for_student(conn: &Connection, section_id: &str, student_id: &str) -> Result<FinalGrade> {
    let percentage = compute_final_percentage(conn, section_id, student_id)?;
    let slabs = slabs::section_slabs(conn, section_id)?;
    Ok(FinalGrade {
        student_id: student_id.to_string(),
        section_id: section_id.to_string(),
        percentage,
        letter: slabs::classify(percentage, &slabs),
    })
}

/// Finals for every registered or completed student of the section.
pub fn compute_finals(conn: &Connection, section_id: &str) -> Result<Vec<FinalGrade>> {
    let assessments = ledger::section_assessments(conn, section_id)?;
    let slabs = slabs::section_slabs(conn, section_id)?;
    let scores = ledger::section_scores(conn, section_id)?;

    let finals = enrollment::gradeable_student_ids(conn, section_id)?
        .into_iter()
        .map(|student_id| {
            let percentage = weighted_percentage(&assessments, |a| {
                scores.get(&(a.id.clone(), student_id.clone())).copied()
            });
            FinalGrade {
                letter: slabs::classify(percentage, &slabs),
                student_id,
                section_id: section_id.to_string(),
                percentage,
            }
        })
        .collect();
    Ok(finals)
}

fn stored_final(conn: &Connection, section_id: &str, student_id: &str) -> Result<Option<FinalGrade>> {
    Ok(conn
        .query_row(
            "SELECT percentage, letter FROM final_grades WHERE section_id = ? AND student_id = ?",
            (section_id, student_id),
            |r| {
                Ok(FinalGrade {
                    student_id: student_id.to_string(),
                    section_id: section_id.to_string(),
                    percentage: r.get(0)?,
                    letter: r.get(1)?,
                })
            },
        )
        .optional()?)
}

pub fn preview_finals(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<FinalsPreview> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    let assessments = ledger::section_assessments(conn, section_id)?;
    Ok(FinalsPreview {
        finals: compute_finals(conn, section_id)?,
        weights: audit_weights(&assessments),
    })
}

/// Computes and upserts every final grade of the section, then marks the
/// graded students' registered enrollments completed, in one transaction.
/// Safe to repeat: unchanged scores leave stored rows untouched.
pub fn compute_and_store_finals(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<FinalizeOutcome> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;

    let assessments = ledger::section_assessments(conn, section_id)?;
    if assessments.is_empty() {
        return Err(EngineError::validation(
            "section has no assessments; nothing to finalize",
        ));
    }
    let weights = audit_weights(&assessments);
    if !weights.balanced {
        warn!(
            section = %section_id,
            weight_total = weights.total,
            "assessment weights do not sum to 100; finals are not normalized"
        );
    }

    // Compute, store and complete under one write lock so a registration
    // landing mid-finalize is neither graded nor completed.
    let tx = immediate_tx(conn)?;
    let finals = compute_finals(&tx, section_id)?;
    let now = Utc::now().to_rfc3339();
    let mut rows_changed = 0;
    for fg in &finals {
        rows_changed += tx.execute(
            "INSERT INTO final_grades(section_id, student_id, percentage, letter, computed_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(section_id, student_id) DO UPDATE SET
               percentage = excluded.percentage,
               letter = excluded.letter,
               computed_at = excluded.computed_at
             WHERE final_grades.percentage IS NOT excluded.percentage
                OR final_grades.letter IS NOT excluded.letter",
            (&fg.section_id, &fg.student_id, fg.percentage, &fg.letter, &now),
        )?;
    }
    let graded: Vec<String> = finals.iter().map(|fg| fg.student_id.clone()).collect();
    let enrollments_completed = enrollment::mark_section_completed(&tx, section_id, &graded)?;
    tx.commit()?;

    info!(
        section = %section_id,
        students = finals.len(),
        rows_changed,
        enrollments_completed,
        "section finalized"
    );
    Ok(FinalizeOutcome {
        students: finals.len(),
        rows_changed,
        enrollments_completed,
        weights,
    })
}

/// The stored grade if one exists, otherwise an unstored preview.
pub fn get_final_grade(
    conn: &Connection,
    actor: &Actor,
    section_id: &str,
    student_id: &str,
) -> Result<FinalGradeView> {
    access::require_student_or_section_instructor(conn, actor, student_id, section_id)?;
    if catalog::get_section(conn, section_id)?.is_none() {
        return Err(EngineError::not_found("section"));
    }

    if let Some(grade) = stored_final(conn, section_id, student_id)? {
        return Ok(FinalGradeView {
            grade,
            persisted: true,
        });
    }
    if !enrollment::gradeable_student_ids(conn, section_id)?
        .iter()
        .any(|s| s == student_id)
    {
        return Err(EngineError::NotEnrolled);
    }
    Ok(FinalGradeView {
        grade: compute_for_student(conn, section_id, student_id)?,
        persisted: false,
    })
}

pub fn gradebook(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<Gradebook> {
    let students = enrollment::enrolled_students(conn, actor, instructor_id, section_id)?;
    let assessments = ledger::section_assessments(conn, section_id)?;
    let slabs = slabs::section_slabs(conn, section_id)?;
    let scores = ledger::section_scores(conn, section_id)?;

    let mut rows = Vec::with_capacity(students.len());
    for student in students {
        let marks: Vec<Option<f64>> = assessments
            .iter()
            .map(|a| scores.get(&(a.id.clone(), student.student_id.clone())).copied())
            .collect();
        let percentage = weighted_percentage(&assessments, |a| {
            scores.get(&(a.id.clone(), student.student_id.clone())).copied()
        });
        let computed = FinalGrade {
            student_id: student.student_id.clone(),
            section_id: section_id.to_string(),
            percentage,
            letter: slabs::classify(percentage, &slabs),
        };
        let stored = stored_final(conn, section_id, &student.student_id)?;
        rows.push(GradebookRow {
            student,
            marks,
            computed,
            stored,
        });
    }

    Ok(Gradebook {
        weights: audit_weights(&assessments),
        assessments,
        slabs,
        rows,
    })
}

/// Stored final grades of one student across sections (transcript data).
pub fn student_final_grades(
    conn: &Connection,
    actor: &Actor,
    student_id: &str,
) -> Result<Vec<TranscriptEntry>> {
    access::require_student(actor, student_id)?;
    let mut stmt = conn.prepare(
        "SELECT fg.section_id, c.code, c.title, s.semester, s.year, fg.percentage, fg.letter
         FROM final_grades fg
         JOIN sections s ON s.id = fg.section_id
         JOIN courses c ON c.id = s.course_id
         WHERE fg.student_id = ?
         ORDER BY s.year, s.semester, c.code",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(TranscriptEntry {
                section_id: r.get(0)?,
                course_code: r.get(1)?,
                course_title: r.get(2)?,
                semester: r.get(3)?,
                year: r.get(4)?,
                percentage: r.get(5)?,
                letter: r.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
