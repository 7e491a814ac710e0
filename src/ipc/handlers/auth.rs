use crate::db::password_digest;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::validate::{self, Field};
use rusqlite::OptionalExtension;
use serde_json::{json, Map};
use uuid::Uuid;

/// Advisory field check backing the form's debounced inline messages. The
/// debounce timers live in the front end; this side is stateless, so the
/// latest value always wins.
fn handle_validate_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let _ = state;
    let Some(field_name) = req.params.get("field").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing field", None);
    };
    let Some(field) = Field::parse(field_name) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown field: {}", field_name),
            None,
        );
    };
    let value = req
        .params
        .get("value")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim();

    match validate::check_field(field, value) {
        Ok(()) => ok(&req.id, json!({ "valid": true })),
        Err(message) => ok(&req.id, json!({ "valid": false, "message": message })),
    }
}

fn handle_password_strength(state: &mut AppState, req: &Request) -> serde_json::Value {
    let _ = state;
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    match validate::password_strength(password) {
        Some((strength, score)) => ok(&req.id, json!({ "strength": strength, "score": score })),
        None => ok(&req.id, json!({ "strength": null, "score": 0 })),
    }
}

fn handle_signup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = &req.params;
    let name = p.get("name").and_then(|v| v.as_str()).unwrap_or("").trim();
    let email = p.get("email").and_then(|v| v.as_str()).unwrap_or("").trim();
    let password = p.get("password").and_then(|v| v.as_str()).unwrap_or("");
    let confirm = p
        .get("confirmPassword")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let role = p.get("role").and_then(|v| v.as_str()).unwrap_or("");
    let terms_accepted = p
        .get("termsAccepted")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if role != "student" && role != "admin" {
        return err(&req.id, "bad_params", "role must be student or admin", None);
    }

    // Field-scoped errors, all reported at once like the form does.
    let mut field_errors = Map::new();
    if let Err(m) = validate::check_field(Field::FullName, name) {
        field_errors.insert("name".to_string(), json!(m));
    }
    if let Err(m) = validate::check_field(Field::Email, email) {
        field_errors.insert("email".to_string(), json!(m));
    }
    if let Err(m) = validate::check_field(Field::Password, password) {
        field_errors.insert("password".to_string(), json!(m));
    }
    if confirm.is_empty() {
        field_errors.insert("confirmPassword".to_string(), json!("Please confirm your password"));
    } else if confirm != password {
        field_errors.insert("confirmPassword".to_string(), json!("Passwords do not match"));
    }

    let (role_field, role_key) = if role == "student" {
        (Field::StudentId, "studentId")
    } else {
        (Field::AdminCode, "adminCode")
    };
    let role_id = p.get(role_key).and_then(|v| v.as_str()).unwrap_or("").trim();
    if let Err(m) = validate::check_field(role_field, role_id) {
        field_errors.insert(role_key.to_string(), json!(m));
    }

    if !terms_accepted {
        field_errors.insert(
            "terms".to_string(),
            json!("You must agree to the terms and conditions"),
        );
    }

    if !field_errors.is_empty() {
        return err(
            &req.id,
            "validation_failed",
            "signup rejected by field validation",
            Some(json!({ "fields": field_errors })),
        );
    }

    // Mirrors the mock list's behavior: no duplicate-email check, first
    // matching credential wins at login.
    if let Err(e) = state.db.execute(
        "INSERT INTO users(id, name, email, password_digest, role, role_id)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            Uuid::new_v4().to_string(),
            name,
            email,
            password_digest(password),
            role,
            role_id,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "users" })),
        );
    }

    ok(&req.id, json!({ "name": name, "email": email, "role": role }))
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = &req.params;
    let email = p.get("email").and_then(|v| v.as_str()).unwrap_or("").trim();
    let password = p.get("password").and_then(|v| v.as_str()).unwrap_or("");
    let role = p.get("role").and_then(|v| v.as_str()).unwrap_or("");

    if email.is_empty() {
        return err(&req.id, "bad_params", "Email is required", None);
    }
    if !validate::valid_email(email) {
        return err(&req.id, "bad_params", "Please enter a valid email address", None);
    }
    if password.is_empty() {
        return err(&req.id, "bad_params", "Password is required", None);
    }

    let found = state
        .db
        .query_row(
            "SELECT name, role_id FROM users
             WHERE email = ? AND password_digest = ? AND role = ?
             ORDER BY rowid LIMIT 1",
            (email, password_digest(password), role),
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)),
        )
        .optional();

    match found {
        Ok(Some((name, role_id))) => ok(
            &req.id,
            json!({ "name": name, "role": role, "roleId": role_id }),
        ),
        Ok(None) => err(
            &req.id,
            "invalid_credentials",
            "Invalid email, password, or role selection",
            None,
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.validateField" => Some(handle_validate_field(state, req)),
        "auth.passwordStrength" => Some(handle_password_strength(state, req)),
        "auth.signup" => Some(handle_signup(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        _ => None,
    }
}
