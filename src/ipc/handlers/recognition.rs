use crate::ipc::error::{err, ok};
use crate::ipc::handlers::activity::log_activity;
use crate::ipc::handlers::attendance::{append_record, present_today, today, StudentSnapshot};
use crate::ipc::types::{AppState, ModelStatus, Request};
use crate::matcher::{self, EnrolledFace};
use rusqlite::Connection;
use serde_json::json;

fn handle_model_loaded(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.model = ModelStatus::Ready;
    ok(&req.id, json!({ "model": state.model }))
}

fn handle_model_failed(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Non-fatal: AI matching stays off, manual entry keeps working.
    state.model = ModelStatus::Failed;
    ok(
        &req.id,
        json!({ "model": state.model, "fallback": "manual" }),
    )
}

fn enrolled_roster(conn: &Connection) -> rusqlite::Result<Vec<EnrolledFace>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, roll_number, face_descriptor
         FROM students WHERE face_descriptor IS NOT NULL ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (student_id, student_name, roll_number, raw) = row?;
        // Stored descriptors were validated at enrollment.
        let descriptor: Vec<f32> = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(_) => continue,
        };
        out.push(EnrolledFace {
            student_id,
            student_name,
            roll_number,
            descriptor,
        });
    }
    Ok(out)
}

/// One detection-loop tick. The front end samples a frame every 500 ms and
/// reports the primary detection here; a tick that lands after stop gets a
/// terminal "stopped" status and must not touch anything.
fn handle_recognition_frame(state: &mut AppState, req: &Request) -> serde_json::Value {
    if !state.camera.is_active() {
        return ok(&req.id, json!({ "status": "stopped" }));
    }
    if state.model != ModelStatus::Ready {
        return ok(&req.id, json!({ "status": "model_unavailable" }));
    }

    let raw = match req.params.get("descriptor") {
        None | Some(serde_json::Value::Null) => {
            return ok(&req.id, json!({ "status": "searching" }));
        }
        Some(raw) => raw,
    };
    let probe = match matcher::parse_descriptor(raw) {
        Ok(v) => v,
        Err(message) => return err(&req.id, "bad_params", message, None),
    };

    let roster = match enrolled_roster(&state.db) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let Some(face_match) = matcher::best_match(&probe, &roster) else {
        return ok(
            &req.id,
            json!({ "status": "detected", "outcome": "unrecognized" }),
        );
    };

    let marked_today = match present_today(&state.db, &face_match.student_id, &today()) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if marked_today {
        return ok(
            &req.id,
            json!({
                "status": "detected",
                "outcome": "alreadyMarked",
                "match": face_match,
            }),
        );
    }

    let student = StudentSnapshot {
        id: face_match.student_id.clone(),
        name: face_match.student_name.clone(),
        roll_number: face_match.roll_number.clone(),
    };
    let record = match append_record(&state.db, &student, "present", "ai") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Err(e) = log_activity(
        &state.db,
        &format!("{} marked present (AI Detected)", student.name),
        "check-circle",
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "status": "detected",
            "outcome": "marked",
            "match": face_match,
            "record": record,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "model.loaded" => Some(handle_model_loaded(state, req)),
        "model.failed" => Some(handle_model_failed(state, req)),
        "recognition.frame" => Some(handle_recognition_frame(state, req)),
        _ => None,
    }
}
