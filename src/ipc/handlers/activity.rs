use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use chrono::Local;
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

/// Most recent entries kept; inserting past the bound evicts the oldest.
pub const ACTIVITY_CAP: usize = 10;

/// Appends a dashboard activity entry and trims the feed to the bound.
/// Rowid order is insertion order, which is all the eviction needs.
pub fn log_activity(conn: &Connection, message: &str, icon: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO activity_log(id, message, icon, time) VALUES(?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            message,
            icon,
            Local::now().format("%H:%M").to_string(),
        ),
    )?;
    conn.execute(
        "DELETE FROM activity_log WHERE rowid NOT IN (
            SELECT rowid FROM activity_log ORDER BY rowid DESC LIMIT ?
        )",
        [ACTIVITY_CAP as i64],
    )?;
    Ok(())
}

fn handle_activity_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut stmt = match state.db.prepare(
        "SELECT id, message, icon, time FROM activity_log ORDER BY rowid DESC",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "message": row.get::<_, String>(1)?,
                "icon": row.get::<_, String>(2)?,
                "time": row.get::<_, String>(3)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(entries) => ok(&req.id, json!({ "activities": entries })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "activity.list" => Some(handle_activity_list(state, req)),
        _ => None,
    }
}
