//! Failure kinds shared by every engine operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Not logged in, wrong role, or not the owner of the resource.
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("maintenance mode is on; changes are temporarily disabled")]
    MaintenanceActive,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    AlreadyEnrolled(String),

    #[error("not enrolled in this section")]
    NotEnrolled,

    #[error("section is full ({capacity} seats)")]
    SectionFull { capacity: i64 },

    #[error("the add/drop deadline ({0}) has passed")]
    DeadlinePassed(chrono::NaiveDate),

    #[error("a slab with letter {0:?} already exists in this section")]
    DuplicateLetter(String),

    #[error("range [{min}, {max}] overlaps slab {letter:?} [{other_min}, {other_max}]")]
    OverlappingSlab {
        min: f64,
        max: f64,
        letter: String,
        other_min: f64,
        other_max: f64,
    },

    #[error("{0}")]
    Validation(String),

    #[error("internal error")]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn access_denied() -> Self {
        Self::AccessDenied("Access Denied.".to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Stable wire code; callers branch on this, never on the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied(_) => "access_denied",
            Self::MaintenanceActive => "maintenance_active",
            Self::NotFound(_) => "not_found",
            Self::AlreadyEnrolled(_) => "already_enrolled",
            Self::NotEnrolled => "not_enrolled",
            Self::SectionFull { .. } => "section_full",
            Self::DeadlinePassed(_) => "deadline_passed",
            Self::DuplicateLetter(_) => "duplicate_letter",
            Self::OverlappingSlab { .. } => "overlapping_slab",
            Self::Validation(_) => "bad_params",
            Self::Storage(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
