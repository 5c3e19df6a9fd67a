use crate::engine::ledger::{self, AssessmentInput, Score};
use crate::engine::{finals, Actor, Role};
use crate::ipc::helpers::{
    db_and_actor, id_or_self, parse_params, req_str, respond, HandlerErr, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::{json, Value};

const SCORES_SAVE_MAX: usize = 5000;

/// `(sectionId, instructorId)` for instructor-scoped calls.
fn section_scope(req: &Request, actor: &Actor) -> Result<(String, String), HandlerErr> {
    let section_id = req_str(&req.params, "sectionId")?;
    Ok((section_id, id_or_self(&req.params, "instructorId", actor)))
}

fn handle_assessments_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let assessments = ledger::list_assessments(conn, actor, &instructor_id, &section_id)?;
    let weights = finals::audit_weights(&assessments);
    Ok(json!({ "assessments": assessments, "weights": weights }))
}

fn handle_assessments_add(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let input: AssessmentInput = parse_params(&req.params)?;
    let a = ledger::add_assessment(conn, actor, &instructor_id, &section_id, &input)?;
    Ok(json!({ "assessment": a }))
}

fn handle_assessments_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let assessment_id = req_str(&req.params, "assessmentId")?;
    let input: AssessmentInput = parse_params(&req.params)?;
    let a = ledger::update_assessment(conn, actor, &instructor_id, &section_id, &assessment_id, &input)?;
    Ok(json!({ "assessment": a }))
}

fn handle_assessments_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let assessment_id = req_str(&req.params, "assessmentId")?;
    let removed = ledger::delete_assessment(conn, actor, &instructor_id, &section_id, &assessment_id)?;
    Ok(json!({ "scoresRemoved": removed }))
}

fn handle_scores_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let assessment_id = req_str(&req.params, "assessmentId")?;
    let scores = ledger::list_scores(conn, actor, &instructor_id, &section_id, &assessment_id)?;
    Ok(json!({ "scores": scores }))
}

fn handle_scores_get(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let assessment_id = req_str(&req.params, "assessmentId")?;
    let student_id = req_str(&req.params, "studentId")?;
    let score = ledger::get_score(
        conn,
        actor,
        &instructor_id,
        &section_id,
        &assessment_id,
        &student_id,
    )?;
    Ok(json!({ "score": score }))
}

#[derive(Deserialize)]
struct ScoresSaveParams {
    scores: Vec<Score>,
}

fn handle_scores_save(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let p: ScoresSaveParams = parse_params(&req.params)?;
    if p.scores.len() > SCORES_SAVE_MAX {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("at most {} scores per call", SCORES_SAVE_MAX),
            details: Some(json!({ "count": p.scores.len() })),
        });
    }
    let saved = ledger::upsert_scores(conn, actor, &instructor_id, &section_id, &p.scores)?;
    Ok(json!({ "saved": saved }))
}

fn handle_scores_upsert(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let score: Score = parse_params(&req.params)?;
    ledger::upsert_score(conn, actor, &instructor_id, &section_id, &score)?;
    Ok(json!({ "score": score }))
}

fn handle_grades_preview(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let preview = finals::preview_finals(conn, actor, &instructor_id, &section_id)?;
    Ok(json!(preview))
}

fn handle_grades_gradebook(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let book = finals::gradebook(conn, actor, &instructor_id, &section_id)?;
    Ok(json!(book))
}

fn handle_grades_finalize(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let (section_id, instructor_id) = section_scope(req, actor)?;
    let outcome = finals::compute_and_store_finals(conn, actor, &instructor_id, &section_id)?;
    Ok(json!(outcome))
}

fn handle_grades_get(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    // Students read their own grade; instructors must name the student.
    let student_id = match actor.role {
        Role::Student => id_or_self(&req.params, "studentId", actor),
        _ => req_str(&req.params, "studentId")?,
    };
    let view = finals::get_final_grade(conn, actor, &section_id, &student_id)?;
    Ok(json!(view))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "assessments.list" => handle_assessments_list(state, req),
        "assessments.add" => handle_assessments_add(state, req),
        "assessments.update" => handle_assessments_update(state, req),
        "assessments.delete" => handle_assessments_delete(state, req),
        "scores.list" => handle_scores_list(state, req),
        "scores.get" => handle_scores_get(state, req),
        "scores.save" => handle_scores_save(state, req),
        "scores.upsert" => handle_scores_upsert(state, req),
        "grades.preview" => handle_grades_preview(state, req),
        "grades.gradebook" => handle_grades_gradebook(state, req),
        "grades.finalize" => handle_grades_finalize(state, req),
        "grades.get" => handle_grades_get(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
