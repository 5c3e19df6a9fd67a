use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }
}

/// The authenticated caller of one engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub roll_no: String,
    pub program: String,
    pub year: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorProfile {
    pub department: String,
    pub designation: String,
}

/// Role-specific data, loaded separately from the actor record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RoleProfile {
    Student(StudentProfile),
    Instructor(InstructorProfile),
    Admin,
}

/// Resolves a user id into an actor for a new session.
pub fn load_actor(conn: &Connection, user_id: &str) -> Result<Actor> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT role, status FROM users WHERE id = ?",
            [user_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((role, status)) = row else {
        return Err(EngineError::not_found("user"));
    };
    if status != "active" {
        return Err(EngineError::AccessDenied(format!("account is {}", status)));
    }
    let role = Role::parse(&role)
        .ok_or_else(|| EngineError::validation(format!("stored role {:?} is unknown", role)))?;
    Ok(Actor::new(user_id, role))
}

pub fn load_profile(conn: &Connection, actor: &Actor) -> Result<Option<RoleProfile>> {
    match actor.role {
        Role::Student => {
            let p = conn
                .query_row(
                    "SELECT roll_no, program, year FROM student_profiles WHERE user_id = ?",
                    [&actor.id],
                    |r| {
                        Ok(StudentProfile {
                            roll_no: r.get(0)?,
                            program: r.get(1)?,
                            year: r.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(p.map(RoleProfile::Student))
        }
        Role::Instructor => {
            let p = conn
                .query_row(
                    "SELECT department, designation FROM instructor_profiles WHERE user_id = ?",
                    [&actor.id],
                    |r| {
                        Ok(InstructorProfile {
                            department: r.get(0)?,
                            designation: r.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(p.map(RoleProfile::Instructor))
        }
        Role::Admin => Ok(Some(RoleProfile::Admin)),
    }
}
