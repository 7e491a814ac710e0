mod test_support;

use serde_json::json;
use test_support::{descriptor, error_code, request_err, request_ok, spawn_sidecar};

#[test]
fn create_list_and_delete_students() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({
            "name": "Alice Carter",
            "rollNumber": "R-001",
            "email": "alice@example.com",
            "class": "10A",
            "phone": "555-0100"
        }),
    );
    let alice_id = created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    assert_eq!(created.get("faceEnrolled").and_then(|v| v.as_bool()), Some(false));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Bob Stone",
            "rollNumber": "R-002",
            "email": "bob@example.com",
            "class": "10B",
            "faceDescriptor": descriptor(0.2)
        }),
    );

    let listed = request_ok(&mut stdin, &mut reader, "3", "students.list", json!({}));
    let students = listed
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students");
    assert_eq!(students.len(), 2);
    assert_eq!(
        students[0].get("name").and_then(|v| v.as_str()),
        Some("Alice Carter")
    );
    assert_eq!(
        students[1].get("faceEnrolled").and_then(|v| v.as_bool()),
        Some(true)
    );

    // Substring search is case-insensitive over name, roll number and email.
    let searched = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.list",
        json!({ "q": "ALICE" }),
    );
    let found = searched
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students");
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].get("rollNumber").and_then(|v| v.as_str()),
        Some("R-001")
    );

    let by_class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.list",
        json!({ "class": "10B" }),
    );
    let found = by_class
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name").and_then(|v| v.as_str()), Some("Bob Stone"));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.delete",
        json!({ "studentId": alice_id }),
    );
    assert_eq!(deleted.get("ok").and_then(|v| v.as_bool()), Some(true));

    let listed = request_ok(&mut stdin, &mut reader, "7", "students.list", json!({}));
    let students = listed
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students");
    assert_eq!(students.len(), 1);
}

#[test]
fn create_requires_core_fields() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "No Roll", "email": "x@example.com", "class": "10A" }),
    );
    assert_eq!(error_code(&error), "bad_params");

    // Whitespace-only values count as missing.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "  ", "rollNumber": "R-1", "email": "x@example.com", "class": "10A" }),
    );
    assert_eq!(error_code(&error), "bad_params");
}

#[test]
fn enrollment_rejects_wrong_descriptor_length() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({
            "name": "Short Vector",
            "rollNumber": "R-9",
            "email": "short@example.com",
            "class": "10A",
            "faceDescriptor": [0.1, 0.2, 0.3]
        }),
    );
    assert_eq!(error_code(&error), "bad_params");

    let listed = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(
        listed.get("students").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
}

#[test]
fn delete_unknown_student_is_not_found() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "students.delete",
        json!({ "studentId": "missing" }),
    );
    assert_eq!(error_code(&error), "not_found");
}

#[test]
fn deleting_a_student_keeps_their_attendance_records() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({
            "name": "Cara Diaz",
            "rollNumber": "R-003",
            "email": "cara@example.com",
            "class": "10A"
        }),
    );
    let student_id = created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "present" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.delete",
        json!({ "studentId": student_id }),
    );

    // The record carries its own snapshot of the student.
    let records = request_ok(&mut stdin, &mut reader, "4", "attendance.records", json!({}));
    let records = records
        .get("records")
        .and_then(|v| v.as_array())
        .expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("studentName").and_then(|v| v.as_str()),
        Some("Cara Diaz")
    );
}
