use crate::ipc::error::{err, ok};
use crate::ipc::handlers::activity::log_activity;
use crate::ipc::types::{AppState, Request};
use crate::matcher;
use chrono::Local;
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn required_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(name) = required_str(&req.params, "name") else {
        return err(&req.id, "bad_params", "missing name", None);
    };
    let Some(roll_number) = required_str(&req.params, "rollNumber") else {
        return err(&req.id, "bad_params", "missing rollNumber", None);
    };
    let Some(email) = required_str(&req.params, "email") else {
        return err(&req.id, "bad_params", "missing email", None);
    };
    let Some(class_name) = required_str(&req.params, "class") else {
        return err(&req.id, "bad_params", "missing class", None);
    };
    let phone = req
        .params
        .get("phone")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    // Photo is an opaque payload (data URL or similar); stored untouched.
    let photo = req
        .params
        .get("photo")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let descriptor_json = match req.params.get("faceDescriptor") {
        None | Some(serde_json::Value::Null) => None,
        Some(raw) => match matcher::parse_descriptor(raw) {
            Ok(parsed) => match serde_json::to_string(&parsed) {
                Ok(s) => Some(s),
                Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
            },
            Err(message) => return err(&req.id, "bad_params", message, None),
        },
    };

    let student_id = Uuid::new_v4().to_string();
    let created_at = Local::now().to_rfc3339();
    if let Err(e) = state.db.execute(
        "INSERT INTO students(id, name, roll_number, email, phone, class_name, photo, face_descriptor, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &student_id,
            &name,
            &roll_number,
            &email,
            &phone,
            &class_name,
            &photo,
            &descriptor_json,
            &created_at,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    if let Err(e) = log_activity(&state.db, &format!("New student added: {}", name), "user-plus") {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({
            "studentId": student_id,
            "name": name,
            "rollNumber": roll_number,
            "class": class_name,
            "faceEnrolled": descriptor_json.is_some()
        }),
    )
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = req
        .params
        .get("q")
        .and_then(|v| v.as_str())
        .map(|s| s.to_lowercase());
    let class_filter = req
        .params
        .get("class")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    let mut stmt = match state.db.prepare(
        "SELECT id, name, roll_number, email, phone, class_name, photo,
                face_descriptor IS NOT NULL, created_at
         FROM students ORDER BY rowid",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let roll: String = row.get(2)?;
            let email: String = row.get(3)?;
            let class_name: String = row.get(5)?;
            Ok((
                json!({
                    "id": row.get::<_, String>(0)?,
                    "name": name.clone(),
                    "rollNumber": roll.clone(),
                    "email": email.clone(),
                    "phone": row.get::<_, Option<String>>(4)?,
                    "class": class_name.clone(),
                    "photo": row.get::<_, Option<String>>(6)?,
                    "faceEnrolled": row.get::<_, bool>(7)?,
                    "createdAt": row.get::<_, String>(8)?,
                }),
                name,
                roll,
                email,
                class_name,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let students: Vec<serde_json::Value> = rows
        .into_iter()
        .filter(|(_, name, roll, email, class_name)| {
            let matches_query = query.as_ref().map_or(true, |q| {
                name.to_lowercase().contains(q)
                    || roll.to_lowercase().contains(q)
                    || email.to_lowercase().contains(q)
            });
            let matches_class = class_filter.as_ref().map_or(true, |c| class_name == c);
            matches_query && matches_class
        })
        .map(|(row, ..)| row)
        .collect();

    ok(&req.id, json!({ "students": students }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(student_id) = required_str(&req.params, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };

    let exists: Option<i64> = match state
        .db
        .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }

    // Attendance records keep their denormalized snapshot of the student.
    if let Err(e) = state
        .db
        .execute("DELETE FROM students WHERE id = ?", [&student_id])
    {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_students_create(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
