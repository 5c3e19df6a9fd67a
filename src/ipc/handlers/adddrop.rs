use crate::engine::adddrop;
use crate::ipc::helpers::{db_and_actor, require_db, respond, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_set_deadline(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let deadline = match req.params.get("deadline") {
        None => return Err(HandlerErr::bad_params("missing deadline (use null to clear)")),
        Some(v) if v.is_null() => None,
        Some(v) => match v.as_str() {
            Some(s) => Some(adddrop::parse_date(s)?),
            None => return Err(HandlerErr::bad_params("deadline must be YYYY-MM-DD or null")),
        },
    };
    adddrop::set_deadline(conn, actor, deadline)?;
    Ok(json!({ "deadline": deadline.map(|d| d.format(adddrop::DATE_FORMAT).to_string()) }))
}

fn handle_get_deadline(state: &mut AppState) -> HandlerResult {
    let conn = require_db(state)?;
    let deadline = adddrop::get_deadline(conn)?;
    Ok(json!({ "deadline": deadline.map(|d| d.format(adddrop::DATE_FORMAT).to_string()) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "adddrop.setDeadline" => handle_set_deadline(state, req),
        "adddrop.getDeadline" => handle_get_deadline(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
