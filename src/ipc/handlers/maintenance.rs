use crate::engine::maintenance;
use crate::ipc::helpers::{db_and_actor, req_bool, require_db, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_set(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let on = req_bool(&req.params, "on")?;
    maintenance::set_maintenance(conn, actor, on)?;
    Ok(json!({ "on": on }))
}

fn handle_status(state: &mut AppState) -> HandlerResult {
    let conn = require_db(state)?;
    Ok(json!({
        "on": maintenance::is_maintenance_on(conn)?,
        "writeAllowed": maintenance::is_write_allowed(conn)?
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "maintenance.set" => handle_set(state, req),
        "maintenance.status" => handle_status(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
