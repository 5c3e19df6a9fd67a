use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::engine::{access, Actor, EngineError};
use crate::ipc::error::{engine_details, err, ok};
use crate::ipc::types::AppState;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<EngineError> for HandlerErr {
    fn from(e: EngineError) -> Self {
        Self {
            code: e.code(),
            details: engine_details(&e),
            message: e.to_string(),
        }
    }
}

pub type HandlerResult = Result<Value, HandlerErr>;

pub fn respond(id: &str, result: HandlerResult) -> Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state.db.as_ref().ok_or_else(|| HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

/// Connection plus the logged-in actor; most handlers start here.
pub fn db_and_actor(state: &AppState) -> Result<(&Connection, &Actor), HandlerErr> {
    let conn = require_db(state)?;
    let actor = access::current(state.session.as_ref())?;
    Ok((conn, actor))
}

pub fn req_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    match params.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must not be empty", key))),
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn req_i64(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or non-integer {}", key)))
}

pub fn req_bool(params: &Value, key: &str) -> Result<bool, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or non-boolean {}", key)))
}

/// `studentId` / `instructorId` fall back to the session user when omitted.
pub fn id_or_self(params: &Value, key: &str, actor: &Actor) -> String {
    opt_str(params, key).unwrap_or_else(|| actor.id.clone())
}

pub fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, HandlerErr> {
    serde_json::from_value(params.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: e.to_string(),
        details: None,
    })
}

pub fn ack() -> HandlerResult {
    Ok(json!({ "ok": true }))
}
