use crate::engine::catalog;
use crate::ipc::helpers::{req_str, require_db, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// First-run only: creates the initial admin while the workspace has none.
fn handle_bootstrap_admin(state: &mut AppState, req: &Request) -> HandlerResult {
    let conn = require_db(state)?;
    let user_id = req_str(&req.params, "userId")?;
    let full_name = req_str(&req.params, "fullName")?;
    catalog::bootstrap_admin(conn, &user_id, &full_name)?;
    Ok(json!({ "userId": user_id, "role": "admin" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "setup.bootstrapAdmin" => handle_bootstrap_admin(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
