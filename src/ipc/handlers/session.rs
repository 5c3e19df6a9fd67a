//! Login state for this process. Credentials are checked by the host before
//! it calls `session.login`; the sidecar only resolves the user record.

use crate::engine::actor;
use crate::ipc::helpers::{ack, db_and_actor, req_str, require_db, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_login(state: &mut AppState, req: &Request) -> HandlerResult {
    let user_id = req_str(&req.params, "userId")?;
    let actor = {
        let conn = require_db(state)?;
        actor::load_actor(conn, &user_id)?
    };
    info!(user = %actor.id, role = actor.role.as_str(), "login");
    let result = json!({ "userId": actor.id, "role": actor.role });
    state.session = Some(actor);
    Ok(result)
}

fn handle_logout(state: &mut AppState) -> HandlerResult {
    if let Some(actor) = state.session.take() {
        info!(user = %actor.id, "logout");
    }
    ack()
}

fn handle_current(state: &mut AppState) -> HandlerResult {
    Ok(match state.session.as_ref() {
        Some(a) => json!({ "userId": a.id, "role": a.role }),
        None => serde_json::Value::Null,
    })
}

fn handle_profile(state: &mut AppState) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let profile = actor::load_profile(conn, actor)?;
    Ok(json!({ "userId": actor.id, "role": actor.role, "profile": profile }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "session.login" => handle_login(state, req),
        "session.logout" => handle_logout(state),
        "session.current" => handle_current(state),
        "session.profile" => handle_profile(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
