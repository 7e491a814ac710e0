use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn table_count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    // Table names are fixed strings from this module, never caller input.
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    conn.query_row(&sql, [], |r| r.get(0))
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let counts = (|| -> rusqlite::Result<serde_json::Value> {
        Ok(json!({
            "students": table_count(&state.db, "students")?,
            "attendanceRecords": table_count(&state.db, "attendance_records")?,
            "assignments": table_count(&state.db, "assignments")?,
            "classwork": table_count(&state.db, "classwork")?,
            "activities": table_count(&state.db, "activity_log")?,
        }))
    })();
    match counts {
        Ok(counts) => ok(
            &req.id,
            json!({
                "version": env!("CARGO_PKG_VERSION"),
                "model": state.model,
                "cameraPhase": state.camera.phase(),
                "counts": counts,
            }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn dump_table(conn: &Connection, table: &str) -> rusqlite::Result<Vec<serde_json::Value>> {
    let sql = format!("SELECT * FROM {} ORDER BY rowid", table);
    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let rows = stmt.query_map([], |row| {
        let mut obj = serde_json::Map::new();
        for (idx, name) in names.iter().enumerate() {
            let value = match row.get_ref(idx)? {
                rusqlite::types::ValueRef::Null => serde_json::Value::Null,
                rusqlite::types::ValueRef::Integer(v) => json!(v),
                rusqlite::types::ValueRef::Real(v) => json!(v),
                rusqlite::types::ValueRef::Text(v) => {
                    json!(String::from_utf8_lossy(v).to_string())
                }
                rusqlite::types::ValueRef::Blob(_) => serde_json::Value::Null,
            };
            obj.insert(name.clone(), value);
        }
        Ok(serde_json::Value::Object(obj))
    })?;
    rows.collect()
}

fn restore_table(conn: &Connection, table: &str, rows: &[serde_json::Value]) -> rusqlite::Result<()> {
    let delete_sql = format!("DELETE FROM {}", table);
    conn.execute(&delete_sql, [])?;
    for row in rows {
        let Some(obj) = row.as_object() else { continue };
        let columns: Vec<&String> = obj.keys().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let column_list = columns
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {}({}) VALUES({})",
            table, column_list, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        for (idx, column) in columns.iter().enumerate() {
            let value = &obj[*column];
            match value {
                serde_json::Value::Null => {
                    stmt.raw_bind_parameter(idx + 1, rusqlite::types::Null)?
                }
                serde_json::Value::Bool(b) => stmt.raw_bind_parameter(idx + 1, *b as i64)?,
                serde_json::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        stmt.raw_bind_parameter(idx + 1, i)?;
                    } else {
                        stmt.raw_bind_parameter(idx + 1, n.as_f64().unwrap_or(0.0))?;
                    }
                }
                serde_json::Value::String(s) => stmt.raw_bind_parameter(idx + 1, s.as_str())?,
                other => stmt.raw_bind_parameter(idx + 1, other.to_string())?,
            }
        }
        stmt.raw_execute()?;
    }
    Ok(())
}

const SNAPSHOT_TABLES: [&str; 5] = [
    "students",
    "attendance_records",
    "assignments",
    "classwork",
    "activity_log",
];

/// The dashboard's "save": a copy of the collections into a sibling
/// in-memory field. Deliberately not persistence; a restart loses both
/// the store and the snapshot.
fn handle_session_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut snapshot = serde_json::Map::new();
    let mut counts = serde_json::Map::new();
    for table in SNAPSHOT_TABLES {
        match dump_table(&state.db, table) {
            Ok(rows) => {
                counts.insert(table.to_string(), json!(rows.len()));
                snapshot.insert(table.to_string(), serde_json::Value::Array(rows));
            }
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }
    state.snapshot = Some(serde_json::Value::Object(snapshot));
    ok(&req.id, json!({ "saved": true, "counts": counts }))
}

fn handle_session_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(snapshot) = state.snapshot.clone() else {
        // Fresh process: nothing saved yet, nothing to restore.
        return ok(&req.id, json!({ "restored": false }));
    };
    for table in SNAPSHOT_TABLES {
        let rows = snapshot
            .get(table)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        if let Err(e) = restore_table(&state.db, table, &rows) {
            return err(
                &req.id,
                "db_update_failed",
                e.to_string(),
                Some(json!({ "table": table })),
            );
        }
    }
    ok(&req.id, json!({ "restored": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.save" => Some(handle_session_save(state, req)),
        "session.load" => Some(handle_session_load(state, req)),
        _ => None,
    }
}
