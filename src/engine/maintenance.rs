//! System-wide write freeze.
//!
//! The flag is checked, not locked: a write that passed the check may still
//! land just after an admin turns maintenance on.

use rusqlite::Connection;
use serde_json::json;
use tracing::{info, warn};

use super::access;
use super::actor::Actor;
use super::error::{EngineError, Result};
use crate::db;

const MAINTENANCE_KEY: &str = "maintenance_mode";

pub fn is_maintenance_on(conn: &Connection) -> Result<bool> {
    let v = db::settings_get_json(conn, MAINTENANCE_KEY)?;
    Ok(v.and_then(|v| v.as_bool()).unwrap_or(false))
}

pub fn is_write_allowed(conn: &Connection) -> Result<bool> {
    Ok(!is_maintenance_on(conn)?)
}

pub fn require_write_allowed(conn: &Connection) -> Result<()> {
    if is_maintenance_on(conn)? {
        warn!("write refused: maintenance mode is on");
        return Err(EngineError::MaintenanceActive);
    }
    Ok(())
}

/// Admin only. Not itself write-gated, so maintenance can always be lifted.
pub fn set_maintenance(conn: &Connection, actor: &Actor, on: bool) -> Result<()> {
    access::require_admin(actor)?;
    db::settings_set_json(conn, MAINTENANCE_KEY, &json!(on))?;
    info!(admin = %actor.id, on, "maintenance mode changed");
    Ok(())
}
