//! Per-section assessments and per-student raw scores.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::access;
use super::actor::Actor;
use super::error::{EngineError, Result};
use super::maintenance;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub section_id: String,
    pub idx: i64,
    pub name: String,
    pub max_marks: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentInput {
    pub name: String,
    pub max_marks: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub assessment_id: String,
    pub student_id: String,
    pub marks_obtained: f64,
}

fn validate_assessment(input: &AssessmentInput) -> Result<(String, f64, f64)> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(EngineError::validation("name is required"));
    }
    if !input.max_marks.is_finite() || input.max_marks <= 0.0 {
        return Err(EngineError::validation("maxMarks must be > 0"));
    }
    if !input.weight.is_finite() || !(0.0..=100.0).contains(&input.weight) {
        return Err(EngineError::validation("weight must be in 0..=100"));
    }
    Ok((name.to_string(), input.max_marks, input.weight))
}

fn map_assessment(r: &rusqlite::Row<'_>) -> rusqlite::Result<Assessment> {
    Ok(Assessment {
        id: r.get(0)?,
        section_id: r.get(1)?,
        idx: r.get(2)?,
        name: r.get(3)?,
        max_marks: r.get(4)?,
        weight: r.get(5)?,
    })
}

/// Assessments of a section in creation order. No access check; callers gate.
pub(crate) fn section_assessments(conn: &Connection, section_id: &str) -> Result<Vec<Assessment>> {
    let mut stmt = conn.prepare(
        "SELECT id, section_id, idx, name, max_marks, weight
         FROM assessments
         WHERE section_id = ?
         ORDER BY idx",
    )?;
    let rows = stmt
        .query_map([section_id], map_assessment)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn assessment_in_section(
    conn: &Connection,
    section_id: &str,
    assessment_id: &str,
) -> Result<Assessment> {
    conn.query_row(
        "SELECT id, section_id, idx, name, max_marks, weight
         FROM assessments
         WHERE id = ? AND section_id = ?",
        (assessment_id, section_id),
        map_assessment,
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("assessment"))
}

pub fn list_assessments(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<Vec<Assessment>> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    section_assessments(conn, section_id)
}

pub fn add_assessment(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    input: &AssessmentInput,
) -> Result<Assessment> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;
    let (name, max_marks, weight) = validate_assessment(input)?;

    let next_idx: i64 = conn.query_row(
        "SELECT COALESCE(MAX(idx), -1) + 1 FROM assessments WHERE section_id = ?",
        [section_id],
        |r| r.get(0),
    )?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO assessments(id, section_id, idx, name, max_marks, weight)
         VALUES(?, ?, ?, ?, ?, ?)",
        (&id, section_id, next_idx, &name, max_marks, weight),
    )?;
    info!(section = %section_id, assessment = %id, weight, "assessment added");

    Ok(Assessment {
        id,
        section_id: section_id.to_string(),
        idx: next_idx,
        name,
        max_marks,
        weight,
    })
}

pub fn update_assessment(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    assessment_id: &str,
    input: &AssessmentInput,
) -> Result<Assessment> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;
    let (name, max_marks, weight) = validate_assessment(input)?;
    let existing = assessment_in_section(conn, section_id, assessment_id)?;

    conn.execute(
        "UPDATE assessments SET name = ?, max_marks = ?, weight = ? WHERE id = ?",
        (&name, max_marks, weight, assessment_id),
    )?;
    info!(section = %section_id, assessment = %assessment_id, "assessment updated");

    Ok(Assessment {
        name,
        max_marks,
        weight,
        ..existing
    })
}

/// Deletes the assessment and every score recorded against it.
pub fn delete_assessment(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    assessment_id: &str,
) -> Result<usize> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;
    assessment_in_section(conn, section_id, assessment_id)?;

    let tx = conn.unchecked_transaction()?;
    let removed_scores = tx.execute("DELETE FROM scores WHERE assessment_id = ?", [assessment_id])?;
    tx.execute("DELETE FROM assessments WHERE id = ?", [assessment_id])?;
    tx.commit()?;

    info!(
        section = %section_id,
        assessment = %assessment_id,
        removed_scores,
        "assessment deleted"
    );
    Ok(removed_scores)
}

/// Raw marks for one (assessment, student), `None` when nothing was recorded.
pub(crate) fn marks_for(
    conn: &Connection,
    assessment_id: &str,
    student_id: &str,
) -> Result<Option<f64>> {
    Ok(conn
        .query_row(
            "SELECT marks_obtained FROM scores WHERE assessment_id = ? AND student_id = ?",
            (assessment_id, student_id),
            |r| r.get(0),
        )
        .optional()?)
}

/// All scores of a section keyed by (assessment, student).
pub(crate) fn section_scores(
    conn: &Connection,
    section_id: &str,
) -> Result<HashMap<(String, String), f64>> {
    let mut stmt = conn.prepare(
        "SELECT sc.assessment_id, sc.student_id, sc.marks_obtained
         FROM scores sc
         JOIN assessments a ON a.id = sc.assessment_id
         WHERE a.section_id = ?",
    )?;
    let rows = stmt
        .query_map([section_id], |r| {
            Ok(((r.get::<_, String>(0)?, r.get::<_, String>(1)?), r.get::<_, f64>(2)?))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(rows)
}

pub fn get_score(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    assessment_id: &str,
    student_id: &str,
) -> Result<Option<Score>> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    assessment_in_section(conn, section_id, assessment_id)?;
    Ok(marks_for(conn, assessment_id, student_id)?.map(|marks_obtained| Score {
        assessment_id: assessment_id.to_string(),
        student_id: student_id.to_string(),
        marks_obtained,
    }))
}

pub fn list_scores(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    assessment_id: &str,
) -> Result<Vec<Score>> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    assessment_in_section(conn, section_id, assessment_id)?;
    let mut stmt = conn.prepare(
        "SELECT assessment_id, student_id, marks_obtained
         FROM scores
         WHERE assessment_id = ?
         ORDER BY student_id",
    )?;
    let rows = stmt
        .query_map([assessment_id], |r| {
            Ok(Score {
                assessment_id: r.get(0)?,
                student_id: r.get(1)?,
                marks_obtained: r.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn upsert_score(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    score: &Score,
) -> Result<()> {
    upsert_scores(conn, actor, instructor_id, section_id, std::slice::from_ref(score)).map(|_| ())
}

/// Saves a batch of scores. Either every row is written or none is.
pub fn upsert_scores(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    scores: &[Score],
) -> Result<usize> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;

    let tx = conn.unchecked_transaction()?;
    let mut max_by_assessment: HashMap<String, f64> = HashMap::new();
    let now = Utc::now().to_rfc3339();

    for (i, score) in scores.iter().enumerate() {
        let max_marks = match max_by_assessment.get(&score.assessment_id) {
            Some(m) => *m,
            None => {
                let a = assessment_in_section(&tx, section_id, &score.assessment_id).map_err(
                    |e| match e {
                        EngineError::NotFound(_) => EngineError::validation(format!(
                            "scores[{}]: assessment does not belong to this section",
                            i
                        )),
                        other => other,
                    },
                )?;
                max_by_assessment.insert(score.assessment_id.clone(), a.max_marks);
                a.max_marks
            }
        };

        let m = score.marks_obtained;
        if !m.is_finite() || m < 0.0 || m > max_marks {
            return Err(EngineError::validation(format!(
                "scores[{}]: marksObtained must be in 0..={}",
                i, max_marks
            )));
        }

        let enrolled: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM enrollments
                 WHERE student_id = ? AND section_id = ? AND status IN ('registered', 'completed')",
                (&score.student_id, section_id),
                |r| r.get(0),
            )
            .optional()?;
        if enrolled.is_none() {
            debug!(index = i, student = %score.student_id, "score refused: not enrolled");
            return Err(EngineError::NotEnrolled);
        }

        tx.execute(
            "INSERT INTO scores(id, assessment_id, student_id, marks_obtained, updated_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(assessment_id, student_id) DO UPDATE SET
               marks_obtained = excluded.marks_obtained,
               updated_at = excluded.updated_at",
            (
                Uuid::new_v4().to_string(),
                &score.assessment_id,
                &score.student_id,
                m,
                &now,
            ),
        )?;
    }
    tx.commit()?;

    info!(section = %section_id, count = scores.len(), "scores saved");
    Ok(scores.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::actor::Role;
    use crate::engine::enrollment;
    use crate::engine::testutil::{seed_catalog, today, SeededCatalog};

    fn enroll_all(cat: &SeededCatalog, n: usize) {
        for sid in &cat.students[..n] {
            let s = Actor::new(sid, Role::Student);
            enrollment::register(&cat.conn, &s, sid, &cat.section, today()).expect("register");
        }
    }

    fn input(name: &str, max_marks: f64, weight: f64) -> AssessmentInput {
        AssessmentInput {
            name: name.into(),
            max_marks,
            weight,
        }
    }

    #[test]
    fn assessment_validation() {
        let cat = seed_catalog(5);
        let i = Actor::new(&cat.instructor, Role::Instructor);
        for bad in [input(" ", 10.0, 10.0), input("Quiz", 0.0, 10.0), input("Quiz", 10.0, 101.0)] {
            let e = add_assessment(&cat.conn, &i, &cat.instructor, &cat.section, &bad).unwrap_err();
            assert_eq!(e.code(), "bad_params");
        }
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let cat = seed_catalog(5);
        enroll_all(&cat, 2);
        let i = Actor::new(&cat.instructor, Role::Instructor);
        let quiz = add_assessment(&cat.conn, &i, &cat.instructor, &cat.section, &input("Quiz", 20.0, 20.0))
            .expect("quiz");

        let batch = vec![
            Score {
                assessment_id: quiz.id.clone(),
                student_id: cat.students[0].clone(),
                marks_obtained: 15.0,
            },
            Score {
                assessment_id: quiz.id.clone(),
                student_id: cat.students[1].clone(),
                marks_obtained: 25.0,
            },
        ];
        let e = upsert_scores(&cat.conn, &i, &cat.instructor, &cat.section, &batch).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        assert_eq!(marks_for(&cat.conn, &quiz.id, &cat.students[0]).expect("read"), None);
    }

    #[test]
    fn upsert_overwrites_and_get_returns_none_when_absent() {
        let cat = seed_catalog(5);
        enroll_all(&cat, 2);
        let i = Actor::new(&cat.instructor, Role::Instructor);
        let quiz = add_assessment(&cat.conn, &i, &cat.instructor, &cat.section, &input("Quiz", 20.0, 20.0))
            .expect("quiz");

        let mut score = Score {
            assessment_id: quiz.id.clone(),
            student_id: cat.students[0].clone(),
            marks_obtained: 11.0,
        };
        upsert_score(&cat.conn, &i, &cat.instructor, &cat.section, &score).expect("first");
        upsert_score(&cat.conn, &i, &cat.instructor, &cat.section, &score).expect("replay");
        score.marks_obtained = 17.5;
        upsert_score(&cat.conn, &i, &cat.instructor, &cat.section, &score).expect("overwrite");

        let got = get_score(&cat.conn, &i, &cat.instructor, &cat.section, &quiz.id, &cat.students[0])
            .expect("get");
        assert_eq!(got.map(|s| s.marks_obtained), Some(17.5));
        assert_eq!(
            list_scores(&cat.conn, &i, &cat.instructor, &cat.section, &quiz.id)
                .expect("list")
                .len(),
            1
        );

        let absent = get_score(&cat.conn, &i, &cat.instructor, &cat.section, &quiz.id, &cat.students[1])
            .expect("get absent");
        assert_eq!(absent, None);
    }

    #[test]
    fn delete_cascades_scores() {
        let cat = seed_catalog(5);
        enroll_all(&cat, 1);
        let i = Actor::new(&cat.instructor, Role::Instructor);
        let quiz = add_assessment(&cat.conn, &i, &cat.instructor, &cat.section, &input("Quiz", 10.0, 10.0))
            .expect("quiz");
        upsert_score(
            &cat.conn,
            &i,
            &cat.instructor,
            &cat.section,
            &Score {
                assessment_id: quiz.id.clone(),
                student_id: cat.students[0].clone(),
                marks_obtained: 9.0,
            },
        )
        .expect("score");

        let removed = delete_assessment(&cat.conn, &i, &cat.instructor, &cat.section, &quiz.id)
            .expect("delete");
        assert_eq!(removed, 1);
        let left: i64 = cat
            .conn
            .query_row("SELECT COUNT(*) FROM scores", [], |r| r.get(0))
            .expect("count");
        assert_eq!(left, 0);
        assert!(section_assessments(&cat.conn, &cat.section).expect("list").is_empty());
    }

    #[test]
    fn foreign_instructor_is_denied() {
        let cat = seed_catalog(5);
        let other = Actor::new(&cat.other_instructor, Role::Instructor);
        let e = add_assessment(
            &cat.conn,
            &other,
            &cat.other_instructor,
            &cat.section,
            &input("Quiz", 10.0, 10.0),
        )
        .unwrap_err();
        assert_eq!(e.code(), "access_denied");
    }
}
