//! Add/drop deadline: the last calendar day on which students may register
//! or drop. No deadline configured means the window is open.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

use super::access;
use super::actor::Actor;
use super::error::{EngineError, Result};
use super::maintenance;
use crate::db;

const DEADLINE_KEY: &str = "add_drop_deadline";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| EngineError::validation(format!("{:?} is not a YYYY-MM-DD date", raw)))
}

pub fn get_deadline(conn: &Connection) -> Result<Option<NaiveDate>> {
    let v = db::settings_get_json(conn, DEADLINE_KEY)?;
    Ok(v.as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok()))
}

pub fn set_deadline(conn: &Connection, actor: &Actor, deadline: Option<NaiveDate>) -> Result<()> {
    access::require_admin(actor)?;
    maintenance::require_write_allowed(conn)?;
    let value = match deadline {
        Some(d) => json!(d.format(DATE_FORMAT).to_string()),
        None => serde_json::Value::Null,
    };
    db::settings_set_json(conn, DEADLINE_KEY, &value)?;
    info!(admin = %actor.id, deadline = ?deadline, "add/drop deadline updated");
    Ok(())
}

/// The deadline day itself is still inside the window.
pub fn require_before_deadline(conn: &Connection, today: NaiveDate) -> Result<()> {
    match get_deadline(conn)? {
        Some(deadline) if today > deadline => Err(EngineError::DeadlinePassed(deadline)),
        _ => Ok(()),
    }
}
