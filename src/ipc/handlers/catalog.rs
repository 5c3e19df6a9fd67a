use crate::engine::actor::{InstructorProfile, Role, RoleProfile, StudentProfile};
use crate::engine::catalog::{self, NewSection};
use crate::engine::enrollment;
use crate::ipc::helpers::{
    ack, db_and_actor, id_or_self, opt_str, parse_params, req_i64, req_str, respond, HandlerErr,
    HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn parse_role(raw: &str) -> Result<Role, HandlerErr> {
    Role::parse(raw).ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: "role must be one of: student, instructor, admin".to_string(),
        details: Some(json!({ "role": raw })),
    })
}

fn parse_profile(role: Role, raw: Option<&Value>) -> Result<Option<RoleProfile>, HandlerErr> {
    let raw = match raw {
        Some(v) if !v.is_null() => v,
        _ => return Ok(None),
    };
    let profile = match role {
        Role::Student => RoleProfile::Student(parse_params::<StudentProfile>(raw)?),
        Role::Instructor => RoleProfile::Instructor(parse_params::<InstructorProfile>(raw)?),
        Role::Admin => RoleProfile::Admin,
    };
    Ok(Some(profile))
}

fn handle_users_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let user_id = req_str(&req.params, "userId")?;
    let full_name = req_str(&req.params, "fullName")?;
    let role = parse_role(&req_str(&req.params, "role")?)?;
    let profile = parse_profile(role, req.params.get("profile"))?;
    catalog::create_user(conn, actor, &user_id, &full_name, role, profile)?;
    Ok(json!({ "userId": user_id }))
}

fn handle_users_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let role = match opt_str(&req.params, "role") {
        Some(r) => Some(parse_role(&r)?),
        None => None,
    };
    let users = catalog::list_users(conn, actor, role)?;
    Ok(json!({ "users": users }))
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let code = req_str(&req.params, "code")?;
    let title = req_str(&req.params, "title")?;
    let credits = req_i64(&req.params, "credits")?;
    let course_id = catalog::create_course(conn, actor, &code, &title, credits)?;
    Ok(json!({ "courseId": course_id }))
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let course_id = req_str(&req.params, "courseId")?;
    let code = req_str(&req.params, "code")?;
    let title = req_str(&req.params, "title")?;
    let credits = req_i64(&req.params, "credits")?;
    catalog::update_course(conn, actor, &course_id, &code, &title, credits)?;
    ack()
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let course_id = req_str(&req.params, "courseId")?;
    catalog::delete_course(conn, actor, &course_id)?;
    ack()
}

fn handle_courses_list(state: &mut AppState) -> HandlerResult {
    let Some(conn) = state.db.as_ref() else {
        return Ok(json!({ "courses": [] }));
    };
    let courses = catalog::list_courses(conn)?;
    Ok(json!({ "courses": courses }))
}

fn section_fields(p: &Value) -> Result<NewSection, HandlerErr> {
    Ok(NewSection {
        course_id: req_str(p, "courseId")?,
        instructor_id: req_str(p, "instructorId")?,
        day_time: req_str(p, "dayTime")?,
        room: req_str(p, "room")?,
        capacity: req_i64(p, "capacity")?,
        semester: req_str(p, "semester")?,
        year: req_i64(p, "year")?,
    })
}

fn handle_sections_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let new = section_fields(&req.params)?;
    let section_id = catalog::create_section(conn, actor, new)?;
    Ok(json!({ "sectionId": section_id }))
}

fn handle_sections_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let fields = section_fields(&req.params)?;
    catalog::update_section(conn, actor, &section_id, fields)?;
    ack()
}

fn handle_sections_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    catalog::delete_section(conn, actor, &section_id)?;
    ack()
}

fn handle_sections_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let Some(conn) = state.db.as_ref() else {
        return Ok(json!({ "sections": [] }));
    };
    let course_id = opt_str(&req.params, "courseId");
    let sections = catalog::list_sections(conn, course_id.as_deref())?;
    Ok(json!({ "sections": sections }))
}

fn handle_sections_assign_instructor(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let instructor_id = req_str(&req.params, "instructorId")?;
    catalog::assign_instructor(conn, actor, &section_id, &instructor_id)?;
    ack()
}

fn handle_instructor_sections(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let instructor_id = id_or_self(&req.params, "instructorId", actor);
    let sections = catalog::sections_for_instructor(conn, actor, &instructor_id)?;
    Ok(json!({ "sections": sections }))
}

fn handle_sections_students(state: &mut AppState, req: &Request) -> HandlerResult {
    let (conn, actor) = db_and_actor(state)?;
    let section_id = req_str(&req.params, "sectionId")?;
    let instructor_id = id_or_self(&req.params, "instructorId", actor);
    let students = enrollment::enrolled_students(conn, actor, &instructor_id, &section_id)?;
    Ok(json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "users.create" => handle_users_create(state, req),
        "users.list" => handle_users_list(state, req),
        "courses.create" => handle_courses_create(state, req),
        "courses.update" => handle_courses_update(state, req),
        "courses.delete" => handle_courses_delete(state, req),
        "courses.list" => handle_courses_list(state),
        "sections.create" => handle_sections_create(state, req),
        "sections.update" => handle_sections_update(state, req),
        "sections.delete" => handle_sections_delete(state, req),
        "sections.list" => handle_sections_list(state, req),
        "sections.assignInstructor" => handle_sections_assign_instructor(state, req),
        "instructor.sections" => handle_instructor_sections(state, req),
        "sections.students" => handle_sections_students(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
