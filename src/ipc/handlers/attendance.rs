use crate::ipc::error::{err, ok};
use crate::ipc::handlers::activity::log_activity;
use crate::ipc::types::{AppState, Request};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, None)
    }
}

fn db_err(e: rusqlite::Error) -> HandlerErr {
    HandlerErr {
        code: "db_query_failed",
        message: e.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct StudentSnapshot {
    pub id: String,
    pub name: String,
    pub roll_number: String,
}

pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

pub fn load_student(conn: &Connection, student_id: &str) -> Result<StudentSnapshot, HandlerErr> {
    conn.query_row(
        "SELECT id, name, roll_number FROM students WHERE id = ?",
        [student_id],
        |r| {
            Ok(StudentSnapshot {
                id: r.get(0)?,
                name: r.get(1)?,
                roll_number: r.get(2)?,
            })
        },
    )
    .optional()
    .map_err(db_err)?
    .ok_or(HandlerErr {
        code: "not_found",
        message: "student not found".to_string(),
    })
}

/// Whether the student already has a `present` record for the given day.
/// This is the only dedup in the system; the manual path never consults it.
pub fn present_today(conn: &Connection, student_id: &str, date: &str) -> Result<bool, HandlerErr> {
    conn.query_row(
        "SELECT 1 FROM attendance_records
         WHERE student_id = ? AND date = ? AND status = 'present'
         LIMIT 1",
        (student_id, date),
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
    .map_err(db_err)
}

/// Pure append stamped with the current date and time. The record carries a
/// denormalized snapshot of the student, not a live reference.
pub fn append_record(
    conn: &Connection,
    student: &StudentSnapshot,
    status: &str,
    method: &str,
) -> Result<serde_json::Value, HandlerErr> {
    let now = Local::now();
    let record_id = Uuid::new_v4().to_string();
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M:%S").to_string();
    conn.execute(
        "INSERT INTO attendance_records(id, student_id, student_name, roll_number, date, time, status, method)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &record_id,
            &student.id,
            &student.name,
            &student.roll_number,
            &date,
            &time,
            status,
            method,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
    })?;
    Ok(json!({
        "id": record_id,
        "studentId": student.id,
        "studentName": student.name,
        "rollNumber": student.roll_number,
        "date": date,
        "time": time,
        "status": status,
        "method": method,
    }))
}

fn attendance_mark(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = params
        .get("studentId")
        .and_then(|v| v.as_str())
        .ok_or(HandlerErr {
            code: "bad_params",
            message: "missing studentId".to_string(),
        })?;
    let status = params
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("present");
    if status != "present" && status != "absent" {
        return Err(HandlerErr {
            code: "bad_params",
            message: "status must be present or absent".to_string(),
        });
    }

    let student = load_student(conn, student_id)?;
    let record = append_record(conn, &student, status, "manual")?;

    if status == "present" {
        log_activity(
            conn,
            &format!("{} marked present (Manual)", student.name),
            "check-circle",
        )
        .map_err(db_err)?;
    }

    Ok(json!({ "record": record }))
}

fn attendance_records(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = params
        .get("date")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(today);

    let mut stmt = conn
        .prepare(
            "SELECT id, student_id, student_name, roll_number, time, status, method
             FROM attendance_records WHERE date = ? ORDER BY rowid",
        )
        .map_err(db_err)?;
    let records = stmt
        .query_map([&date], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "studentId": r.get::<_, String>(1)?,
                "studentName": r.get::<_, String>(2)?,
                "rollNumber": r.get::<_, String>(3)?,
                "time": r.get::<_, String>(4)?,
                "status": r.get::<_, String>(5)?,
                "method": r.get::<_, String>(6)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(db_err)?;

    Ok(json!({ "date": date, "records": records }))
}

fn attendance_summary(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let total_students: i64 = conn
        .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
        .map_err(db_err)?;
    let present_today: i64 = conn
        .query_row(
            "SELECT COUNT(DISTINCT student_id) FROM attendance_records
             WHERE date = ? AND status = 'present'",
            [&today()],
            |r| r.get(0),
        )
        .map_err(db_err)?;
    let pending_reviews: i64 = conn
        .query_row("SELECT COUNT(*) FROM assignment_submissions", [], |r| {
            r.get(0)
        })
        .map_err(db_err)?;
    let active_classwork: i64 = conn
        .query_row("SELECT COUNT(*) FROM classwork", [], |r| r.get(0))
        .map_err(db_err)?;

    let percent = if total_students > 0 {
        ((present_today as f64 / total_students as f64) * 100.0).round() as i64
    } else {
        0
    };

    Ok(json!({
        "totalStudents": total_students,
        "presentToday": present_today,
        "todayAttendancePercent": percent,
        "pendingReviews": pending_reviews,
        "activeClasswork": active_classwork,
    }))
}

fn handle_attendance_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_mark(&state.db, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_records(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_records(&state.db, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_summary(&state.db) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_attendance_mark(state, req)),
        "attendance.records" => Some(handle_attendance_records(state, req)),
        "attendance.summary" => Some(handle_attendance_summary(state, req)),
        _ => None,
    }
}
