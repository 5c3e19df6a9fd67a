//! Percentage-range to letter mapping, configured per section.
//!
//! Slabs are closed intervals `[min, max]` and must be pairwise disjoint:
//! two slabs that share a boundary value overlap. This keeps classification
//! unambiguous (at most one slab can contain any percentage). Percentages
//! that fall between slabs use the default scale.
//!
//! Adjacent slabs therefore need a gap: a new slab whose min equals another
//! slab's max is rejected, which is stricter than accepting any min at or
//! above the other slab's max.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::access;
use super::actor::Actor;
use super::error::{EngineError, Result};
use super::{immediate_tx, maintenance};

const MAX_LETTER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSlab {
    pub id: String,
    pub section_id: String,
    pub letter: String,
    pub min_percent: f64,
    pub max_percent: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlabInput {
    pub letter: String,
    pub min: f64,
    pub max: f64,
}

/// Used when no configured slab contains the percentage.
pub fn default_letter(percentage: f64) -> &'static str {
    if percentage >= 95.0 {
        "A+"
    } else if percentage >= 90.0 {
        "A"
    } else if percentage >= 80.0 {
        "A-"
    } else if percentage >= 70.0 {
        "B"
    } else if percentage >= 60.0 {
        "C"
    } else {
        "F"
    }
}

pub fn classify(percentage: f64, slabs: &[GradeSlab]) -> String {
    slabs
        .iter()
        .find(|s| s.min_percent <= percentage && percentage <= s.max_percent)
        .map(|s| s.letter.clone())
        .unwrap_or_else(|| default_letter(percentage).to_string())
}

fn validate_input(input: &SlabInput) -> Result<(String, f64, f64)> {
    let letter = input.letter.trim();
    if letter.is_empty() {
        return Err(EngineError::validation("letter is required"));
    }
    if letter.chars().count() > MAX_LETTER_LEN {
        return Err(EngineError::validation(format!(
            "letter must be at most {} characters",
            MAX_LETTER_LEN
        )));
    }
    if !input.min.is_finite() || !input.max.is_finite() {
        return Err(EngineError::validation("min and max must be numbers"));
    }
    if input.min < 0.0 || input.max > 100.0 || input.min > input.max {
        return Err(EngineError::validation("require 0 <= min <= max <= 100"));
    }
    Ok((letter.to_string(), input.min, input.max))
}

/// Rejects a duplicate letter or an overlapping range. `editing` is the id
/// of the slab being updated, which is not compared with itself.
pub fn check_against(
    existing: &[GradeSlab],
    letter: &str,
    min: f64,
    max: f64,
    editing: Option<&str>,
) -> Result<()> {
    let others = existing
        .iter()
        .filter(|s| editing.map(|id| id != s.id).unwrap_or(true));
    for s in others {
        if s.letter.eq_ignore_ascii_case(letter) {
            return Err(EngineError::DuplicateLetter(s.letter.clone()));
        }
        let disjoint = min > s.max_percent || max < s.min_percent;
        if !disjoint {
            return Err(EngineError::OverlappingSlab {
                min,
                max,
                letter: s.letter.clone(),
                other_min: s.min_percent,
                other_max: s.max_percent,
            });
        }
    }
    Ok(())
}

/// Slabs of a section, highest range first. No access check; callers gate.
pub(crate) fn section_slabs(conn: &Connection, section_id: &str) -> Result<Vec<GradeSlab>> {
    let mut stmt = conn.prepare(
        "SELECT id, section_id, letter, min_percent, max_percent
         FROM grade_slabs
         WHERE section_id = ?
         ORDER BY min_percent DESC",
    )?;
    let rows = stmt
        .query_map([section_id], |r| {
            Ok(GradeSlab {
                id: r.get(0)?,
                section_id: r.get(1)?,
                letter: r.get(2)?,
                min_percent: r.get(3)?,
                max_percent: r.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn require_slab_in_section(conn: &Connection, section_id: &str, slab_id: &str) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM grade_slabs WHERE id = ? AND section_id = ?",
            (slab_id, section_id),
            |r| r.get(0),
        )
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| EngineError::not_found("grade slab"))
}

pub fn list_slabs(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
) -> Result<Vec<GradeSlab>> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    section_slabs(conn, section_id)
}

pub fn add_slab(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    input: &SlabInput,
) -> Result<GradeSlab> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;
    let (letter, min, max) = validate_input(input)?;

    let tx = immediate_tx(conn)?;
    let existing = section_slabs(&tx, section_id)?;
    check_against(&existing, &letter, min, max, None)?;

    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO grade_slabs(id, section_id, letter, min_percent, max_percent)
         VALUES(?, ?, ?, ?, ?)",
        (&id, section_id, &letter, min, max),
    )?;
    tx.commit()?;
    info!(section = %section_id, letter = %letter, min, max, "grade slab added");

    Ok(GradeSlab {
        id,
        section_id: section_id.to_string(),
        letter,
        min_percent: min,
        max_percent: max,
    })
}

pub fn update_slab(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    slab_id: &str,
    input: &SlabInput,
) -> Result<GradeSlab> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;
    let (letter, min, max) = validate_input(input)?;

    let tx = immediate_tx(conn)?;
    require_slab_in_section(&tx, section_id, slab_id)?;
    let existing = section_slabs(&tx, section_id)?;
    check_against(&existing, &letter, min, max, Some(slab_id))?;

    tx.execute(
        "UPDATE grade_slabs SET letter = ?, min_percent = ?, max_percent = ? WHERE id = ?",
        (&letter, min, max, slab_id),
    )?;
    tx.commit()?;
    info!(section = %section_id, slab = %slab_id, letter = %letter, "grade slab updated");

    Ok(GradeSlab {
        id: slab_id.to_string(),
        section_id: section_id.to_string(),
        letter,
        min_percent: min,
        max_percent: max,
    })
}

pub fn delete_slab(
    conn: &Connection,
    actor: &Actor,
    instructor_id: &str,
    section_id: &str,
    slab_id: &str,
) -> Result<()> {
    access::require_instructor_for_section(conn, actor, instructor_id, section_id)?;
    maintenance::require_write_allowed(conn)?;
    require_slab_in_section(conn, section_id, slab_id)?;
    conn.execute("DELETE FROM grade_slabs WHERE id = ?", [slab_id])?;
    info!(section = %section_id, slab = %slab_id, "grade slab deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::actor::Role;
    use crate::engine::testutil::seed_catalog;

    fn slab(letter: &str, min: f64, max: f64) -> GradeSlab {
        GradeSlab {
            id: format!("id-{}", letter),
            section_id: "sec".into(),
            letter: letter.into(),
            min_percent: min,
            max_percent: max,
        }
    }

    fn input(letter: &str, min: f64, max: f64) -> SlabInput {
        SlabInput {
            letter: letter.into(),
            min,
            max,
        }
    }

    #[test]
    fn default_scale_boundaries() {
        assert_eq!(default_letter(95.0), "A+");
        assert_eq!(default_letter(94.99), "A");
        assert_eq!(default_letter(90.0), "A");
        assert_eq!(default_letter(80.0), "A-");
        assert_eq!(default_letter(70.0), "B");
        assert_eq!(default_letter(60.0), "C");
        assert_eq!(default_letter(59.99), "F");
        assert_eq!(default_letter(0.0), "F");
    }

    #[test]
    fn configured_slab_wins_over_default() {
        let slabs = vec![slab("B+", 65.0, 75.0)];
        assert_eq!(classify(70.0, &slabs), "B+");
        assert_eq!(classify(70.0, &[]), "B");
        assert_eq!(classify(95.0, &[]), "A+");
        // Outside every slab: default scale.
        assert_eq!(classify(76.0, &slabs), "B");
    }

    #[test]
    fn shared_boundary_counts_as_overlap() {
        let existing = vec![slab("C", 60.0, 70.0)];
        assert!(matches!(
            check_against(&existing, "B", 65.0, 80.0, None),
            Err(EngineError::OverlappingSlab { .. })
        ));
        assert!(matches!(
            check_against(&existing, "B", 70.0, 80.0, None),
            Err(EngineError::OverlappingSlab { .. })
        ));
        assert!(matches!(
            check_against(&existing, "D", 50.0, 60.0, None),
            Err(EngineError::OverlappingSlab { .. })
        ));
        // Enclosing range overlaps too.
        assert!(check_against(&existing, "X", 0.0, 100.0, None).is_err());
        assert!(check_against(&existing, "B", 70.01, 80.0, None).is_ok());
        assert!(check_against(&existing, "B", 71.0, 80.0, None).is_ok());
        assert!(check_against(&existing, "D", 40.0, 59.99, None).is_ok());
    }

    #[test]
    fn duplicate_letter_is_case_insensitive_and_ignores_self() {
        let existing = vec![slab("A", 90.0, 100.0), slab("B", 75.0, 89.99)];
        assert!(matches!(
            check_against(&existing, "a", 10.0, 20.0, None),
            Err(EngineError::DuplicateLetter(_))
        ));
        // Re-saving a slab with its own letter and a widened range is fine.
        assert!(check_against(&existing, "B", 70.0, 89.99, Some("id-B")).is_ok());
    }

    #[test]
    fn crud_enforces_invariants_in_store() {
        let cat = seed_catalog(5);
        let i = Actor::new(&cat.instructor, Role::Instructor);

        let c = add_slab(&cat.conn, &i, &cat.instructor, &cat.section, &input("C", 60.0, 70.0))
            .expect("add C");
        let e = add_slab(&cat.conn, &i, &cat.instructor, &cat.section, &input("B", 65.0, 80.0))
            .unwrap_err();
        assert_eq!(e.code(), "overlapping_slab");
        let b = add_slab(&cat.conn, &i, &cat.instructor, &cat.section, &input("B", 71.0, 80.0))
            .expect("add B");
        let e = add_slab(&cat.conn, &i, &cat.instructor, &cat.section, &input("c", 0.0, 10.0))
            .unwrap_err();
        assert_eq!(e.code(), "duplicate_letter");

        let e = update_slab(&cat.conn, &i, &cat.instructor, &cat.section, &b.id, &input("B", 69.0, 80.0))
            .unwrap_err();
        assert_eq!(e.code(), "overlapping_slab");
        update_slab(&cat.conn, &i, &cat.instructor, &cat.section, &c.id, &input("C", 55.0, 70.0))
            .expect("widen C downward");

        let listed = list_slabs(&cat.conn, &i, &cat.instructor, &cat.section).expect("list");
        assert_eq!(
            listed.iter().map(|s| s.letter.as_str()).collect::<Vec<_>>(),
            vec!["B", "C"]
        );

        delete_slab(&cat.conn, &i, &cat.instructor, &cat.section, &c.id).expect("delete");
        let e = delete_slab(&cat.conn, &i, &cat.instructor, &cat.section, &c.id).unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn bad_ranges_are_validation_errors() {
        let cat = seed_catalog(5);
        let i = Actor::new(&cat.instructor, Role::Instructor);
        for bad in [input("A", 80.0, 70.0), input("A", -1.0, 10.0), input("A", 90.0, 101.0), input("", 1.0, 2.0)] {
            let e = add_slab(&cat.conn, &i, &cat.instructor, &cat.section, &bad).unwrap_err();
            assert_eq!(e.code(), "bad_params");
        }
    }
}
