use serde_json::json;
use tracing::error;

use crate::engine::EngineError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Structured context for the variants a caller can act on.
pub fn engine_details(e: &EngineError) -> Option<serde_json::Value> {
    match e {
        EngineError::SectionFull { capacity } => Some(json!({ "capacity": capacity })),
        EngineError::DeadlinePassed(d) => Some(json!({ "deadline": d.to_string() })),
        EngineError::DuplicateLetter(letter) => Some(json!({ "letter": letter })),
        EngineError::OverlappingSlab {
            letter,
            other_min,
            other_max,
            ..
        } => Some(json!({
            "conflictsWith": { "letter": letter, "min": other_min, "max": other_max }
        })),
        EngineError::Storage(source) => {
            // The message stays generic on the wire; the cause goes to the log only.
            error!(error = %source, "storage failure");
            None
        }
        _ => None,
    }
}
