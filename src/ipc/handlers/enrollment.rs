use crate::engine::{enrollment, finals};
use crate::ipc::helpers::{ack, db_and_actor, id_or_self, req_str, respond, HandlerResult};
use crate::ipc::types::{AppState, Request};
use chrono::{Local, NaiveDate};
use serde_json::json;

/// The add/drop window is judged against the host's local calendar day.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn handle_register(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let student_id = id_or_self(&req.params, "studentId", actor);
    let section_id = req_str(&req.params, "sectionId")?;
    let outcome = enrollment::register(conn, actor, &student_id, &section_id, today())?;
    Ok(json!(outcome))
}

fn handle_drop(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let student_id = id_or_self(&req.params, "studentId", actor);
    let section_id = req_str(&req.params, "sectionId")?;
    enrollment::drop(conn, actor, &student_id, &section_id, today())?;
    ack()
}

fn handle_my_sections(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let student_id = id_or_self(&req.params, "studentId", actor);
    let sections = enrollment::list_my_sections(conn, actor, &student_id)?;
    Ok(json!({ "sections": sections }))
}

fn handle_completed_sections(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let student_id = id_or_self(&req.params, "studentId", actor);
    let sections = enrollment::list_completed_sections(conn, actor, &student_id)?;
    Ok(json!({ "sections": sections }))
}

fn handle_my_grades(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let student_id = id_or_self(&req.params, "studentId", actor);
    let grades = finals::student_final_grades(conn, actor, &student_id)?;
    Ok(json!({ "grades": grades }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "enrollment.register" => handle_register(state, req),
        "enrollment.drop" => handle_drop(state, req),
        "enrollment.mySections" => handle_my_sections(state, req),
        "enrollment.completedSections" => handle_completed_sections(state, req),
        "enrollment.myGrades" => handle_my_grades(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
