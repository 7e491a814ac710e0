use crate::ipc::error::{err, ok};
use crate::ipc::handlers::activity::log_activity;
use crate::ipc::types::{AppState, Request};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn required_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn eligible_students(conn: &Connection, class_name: &str) -> rusqlite::Result<i64> {
    if class_name == "all" {
        conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
    } else {
        conn.query_row(
            "SELECT COUNT(*) FROM students WHERE class_name = ?",
            [class_name],
            |r| r.get(0),
        )
    }
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(title) = required_str(&req.params, "title") else {
        return err(&req.id, "bad_params", "missing title", None);
    };
    let Some(description) = required_str(&req.params, "description") else {
        return err(&req.id, "bad_params", "missing description", None);
    };
    let Some(deadline) = required_str(&req.params, "deadline") else {
        return err(&req.id, "bad_params", "missing deadline", None);
    };
    let Some(marks) = req.params.get("marks").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing marks", None);
    };
    let priority = req
        .params
        .get("priority")
        .and_then(|v| v.as_str())
        .unwrap_or("medium");
    if !matches!(priority, "low" | "medium" | "high") {
        return err(&req.id, "bad_params", "priority must be low, medium, or high", None);
    }
    let class_name = required_str(&req.params, "class").unwrap_or_else(|| "all".to_string());

    let assignment_id = Uuid::new_v4().to_string();
    if let Err(e) = state.db.execute(
        "INSERT INTO assignments(id, title, description, deadline, marks, priority, class_name, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &assignment_id,
            &title,
            &description,
            &deadline,
            marks,
            priority,
            &class_name,
            Local::now().to_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "assignments" })),
        );
    }

    if let Err(e) = log_activity(
        &state.db,
        &format!("New assignment created: {}", title),
        "plus-circle",
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "assignmentId": assignment_id, "title": title }))
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tab = req
        .params
        .get("tab")
        .and_then(|v| v.as_str())
        .unwrap_or("all");
    if !matches!(tab, "all" | "pending" | "graded") {
        return err(&req.id, "bad_params", "tab must be all, pending, or graded", None);
    }

    let mut stmt = match state.db.prepare(
        "SELECT a.id, a.title, a.description, a.deadline, a.marks, a.priority, a.class_name,
                a.created_at,
                (SELECT COUNT(*) FROM assignment_submissions s WHERE s.assignment_id = a.id),
                (SELECT COUNT(*) FROM assignment_submissions s
                  WHERE s.assignment_id = a.id AND s.graded = 1)
         FROM assignments a ORDER BY a.rowid",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, i64>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, String>(6)?,
                r.get::<_, String>(7)?,
                r.get::<_, i64>(8)?,
                r.get::<_, i64>(9)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut assignments = Vec::new();
    for (id, title, description, deadline, marks, priority, class_name, created_at, submissions, graded) in rows {
        let eligible = match eligible_students(&state.db, &class_name) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        let keep = match tab {
            "pending" => submissions < eligible,
            "graded" => graded > 0,
            _ => true,
        };
        if !keep {
            continue;
        }
        assignments.push(json!({
            "id": id,
            "title": title,
            "description": description,
            "deadline": deadline,
            "marks": marks,
            "priority": priority,
            "class": class_name,
            "createdAt": created_at,
            "submissionCount": submissions,
            "eligibleStudents": eligible,
        }));
    }

    ok(&req.id, json!({ "assignments": assignments }))
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(assignment_id) = required_str(&req.params, "assignmentId") else {
        return err(&req.id, "bad_params", "missing assignmentId", None);
    };
    let exists: Option<i64> = match state
        .db
        .query_row("SELECT 1 FROM assignments WHERE id = ?", [&assignment_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "assignment not found", None);
    }

    // Submissions first; no ON DELETE CASCADE.
    if let Err(e) = state.db.execute(
        "DELETE FROM assignment_submissions WHERE assignment_id = ?",
        [&assignment_id],
    ) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "assignment_submissions" })),
        );
    }
    if let Err(e) = state
        .db
        .execute("DELETE FROM assignments WHERE id = ?", [&assignment_id])
    {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "assignments" })),
        );
    }

    ok(&req.id, json!({ "ok": true }))
}

fn handle_classwork_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(title) = required_str(&req.params, "title") else {
        return err(&req.id, "bad_params", "missing title", None);
    };
    let Some(content) = required_str(&req.params, "content") else {
        return err(&req.id, "bad_params", "missing content", None);
    };
    let class_name = required_str(&req.params, "class").unwrap_or_else(|| "all".to_string());
    let deadline = req
        .params
        .get("deadline")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    let mandatory = req
        .params
        .get("mandatory")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let classwork_id = Uuid::new_v4().to_string();
    if let Err(e) = state.db.execute(
        "INSERT INTO classwork(id, title, content, class_name, deadline, mandatory, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &classwork_id,
            &title,
            &content,
            &class_name,
            &deadline,
            mandatory as i64,
            Local::now().to_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classwork" })),
        );
    }

    if let Err(e) = log_activity(
        &state.db,
        &format!("New classwork created: {}", title),
        "book",
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "classworkId": classwork_id, "title": title }))
}

fn handle_classwork_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut stmt = match state.db.prepare(
        "SELECT c.id, c.title, c.content, c.class_name, c.deadline, c.mandatory, c.created_at,
                (SELECT COUNT(*) FROM classwork_completions cc WHERE cc.classwork_id = c.id)
         FROM classwork c ORDER BY c.rowid",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            let class_name: String = r.get(3)?;
            Ok((
                json!({
                    "id": r.get::<_, String>(0)?,
                    "title": r.get::<_, String>(1)?,
                    "content": r.get::<_, String>(2)?,
                    "class": class_name.clone(),
                    "deadline": r.get::<_, Option<String>>(4)?,
                    "mandatory": r.get::<_, i64>(5)? != 0,
                    "createdAt": r.get::<_, String>(6)?,
                    "completionCount": r.get::<_, i64>(7)?,
                }),
                class_name,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut classwork = Vec::new();
    for (mut row, class_name) in rows {
        let eligible = match eligible_students(&state.db, &class_name) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        row["eligibleStudents"] = json!(eligible);
        classwork.push(row);
    }

    ok(&req.id, json!({ "classwork": classwork }))
}

fn handle_classwork_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(classwork_id) = required_str(&req.params, "classworkId") else {
        return err(&req.id, "bad_params", "missing classworkId", None);
    };
    let exists: Option<i64> = match state
        .db
        .query_row("SELECT 1 FROM classwork WHERE id = ?", [&classwork_id], |r| r.get(0))
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "classwork not found", None);
    }

    if let Err(e) = state.db.execute(
        "DELETE FROM classwork_completions WHERE classwork_id = ?",
        [&classwork_id],
    ) {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "classwork_completions" })),
        );
    }
    if let Err(e) = state
        .db
        .execute("DELETE FROM classwork WHERE id = ?", [&classwork_id])
    {
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "classwork" })),
        );
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        "classwork.create" => Some(handle_classwork_create(state, req)),
        "classwork.list" => Some(handle_classwork_list(state, req)),
        "classwork.delete" => Some(handle_classwork_delete(state, req)),
        _ => None,
    }
}
