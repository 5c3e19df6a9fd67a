use crate::engine::slabs::{self, SlabInput};
use crate::ipc::helpers::{
    ack, db_and_actor, id_or_self, parse_params, req_str, respond, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let instructor_id = id_or_self(&req.params, "instructorId", actor);
    let slabs = slabs::list_slabs(conn, actor, &instructor_id, &section_id)?;
    Ok(json!({ "slabs": slabs }))
}

fn handle_add(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let instructor_id = id_or_self(&req.params, "instructorId", actor);
    let input: SlabInput = parse_params(&req.params)?;
    let slab = slabs::add_slab(conn, actor, &instructor_id, &section_id, &input)?;
    Ok(json!({ "slab": slab }))
}

fn handle_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let instructor_id = id_or_self(&req.params, "instructorId", actor);
    let slab_id = req_str(&req.params, "slabId")?;
    let input: SlabInput = parse_params(&req.params)?;
    let slab = slabs::update_slab(conn, actor, &instructor_id, &section_id, &slab_id, &input)?;
    Ok(json!({ "slab": slab }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let instructor_id = id_or_self(&req.params, "instructorId", actor);
    let slab_id = req_str(&req.params, "slabId")?;
    slabs::delete_slab(conn, actor, &instructor_id, &section_id, &slab_id)?;
    ack()
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "slabs.list" => handle_list(state, req),
        "slabs.add" => handle_add(state, req),
        "slabs.update" => handle_update(state, req),
        "slabs.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
