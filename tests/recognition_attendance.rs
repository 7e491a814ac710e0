mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{descriptor, offset_for_distance, request_ok, spawn_sidecar};

fn enroll(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    name: &str,
    roll: &str,
    face: Vec<f64>,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        id,
        "students.create",
        json!({
            "name": name,
            "rollNumber": roll,
            "email": format!("{}@example.com", roll.to_lowercase()),
            "class": "10A",
            "faceDescriptor": face
        }),
    );
    created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string()
}

fn arm_pipeline(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let _ = request_ok(stdin, reader, "arm-1", "model.loaded", json!({}));
    let _ = request_ok(stdin, reader, "arm-2", "camera.start", json!({}));
    let _ = request_ok(
        stdin,
        reader,
        "arm-3",
        "camera.opened",
        json!({ "tracks": [{ "id": "cam", "kind": "video" }] }),
    );
}

#[test]
fn frame_before_camera_is_a_stopped_tick() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "recognition.frame",
        json!({ "descriptor": descriptor(0.1) }),
    );
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("stopped"));
}

#[test]
fn frame_without_model_degrades_not_errors() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "1", "camera.start", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "camera.opened",
        json!({ "tracks": [{ "id": "cam" }] }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "recognition.frame",
        json!({ "descriptor": descriptor(0.1) }),
    );
    assert_eq!(
        result.get("status").and_then(|v| v.as_str()),
        Some("model_unavailable")
    );

    // A reported load failure keeps the same degraded answer.
    let _ = request_ok(&mut stdin, &mut reader, "4", "model.failed", json!({}));
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "recognition.frame",
        json!({ "descriptor": descriptor(0.1) }),
    );
    assert_eq!(
        result.get("status").and_then(|v| v.as_str()),
        Some("model_unavailable")
    );
}

#[test]
fn empty_frame_keeps_searching() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    arm_pipeline(&mut stdin, &mut reader);

    let result = request_ok(&mut stdin, &mut reader, "1", "recognition.frame", json!({}));
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("searching"));

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "recognition.frame",
        json!({ "descriptor": null }),
    );
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("searching"));
}

#[test]
fn nearest_enrolled_face_below_threshold_wins() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let probe = descriptor(0.5);
    // One enrollment at distance 0.3, one at 0.6; only the first qualifies.
    let near: Vec<f64> = probe.iter().map(|v| v + offset_for_distance(0.3)).collect();
    let far: Vec<f64> = probe.iter().map(|v| v + offset_for_distance(0.6)).collect();
    let near_id = enroll(&mut stdin, &mut reader, "1", "Near Match", "R-020", near);
    let _far_id = enroll(&mut stdin, &mut reader, "2", "Far Match", "R-021", far);

    arm_pipeline(&mut stdin, &mut reader);

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "recognition.frame",
        json!({ "descriptor": probe }),
    );
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("detected"));
    assert_eq!(result.get("outcome").and_then(|v| v.as_str()), Some("marked"));
    assert_eq!(
        result.pointer("/match/studentId").and_then(|v| v.as_str()),
        Some(near_id.as_str())
    );
    let record = result.get("record").expect("record");
    assert_eq!(record.get("status").and_then(|v| v.as_str()), Some("present"));
    assert_eq!(record.get("method").and_then(|v| v.as_str()), Some("ai"));
}

#[test]
fn face_at_threshold_distance_is_unrecognized() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let probe = descriptor(0.5);
    // One displaced component; sqrt(0.5 * 0.5) is exactly the threshold.
    let mut at_threshold = probe.clone();
    at_threshold[0] += 0.5;
    let _ = enroll(&mut stdin, &mut reader, "1", "Edge Case", "R-022", at_threshold);

    arm_pipeline(&mut stdin, &mut reader);

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "recognition.frame",
        json!({ "descriptor": probe }),
    );
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("detected"));
    assert_eq!(
        result.get("outcome").and_then(|v| v.as_str()),
        Some("unrecognized")
    );

    // Nothing was recorded.
    let records = request_ok(&mut stdin, &mut reader, "3", "attendance.records", json!({}));
    assert_eq!(
        records.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
}

#[test]
fn repeated_detections_mark_once_per_day() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let face = descriptor(0.3);
    let student_id = enroll(&mut stdin, &mut reader, "1", "Kay Lund", "R-023", face.clone());
    arm_pipeline(&mut stdin, &mut reader);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "recognition.frame",
        json!({ "descriptor": face }),
    );
    assert_eq!(first.get("outcome").and_then(|v| v.as_str()), Some("marked"));

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "recognition.frame",
        json!({ "descriptor": face }),
    );
    assert_eq!(
        second.get("outcome").and_then(|v| v.as_str()),
        Some("alreadyMarked")
    );
    assert_eq!(
        second.pointer("/match/studentId").and_then(|v| v.as_str()),
        Some(student_id.as_str())
    );

    let records = request_ok(&mut stdin, &mut reader, "4", "attendance.records", json!({}));
    assert_eq!(
        records.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );
}

#[test]
fn tick_after_stop_touches_nothing() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let face = descriptor(0.3);
    let _ = enroll(&mut stdin, &mut reader, "1", "Late Tick", "R-024", face.clone());
    arm_pipeline(&mut stdin, &mut reader);
    let _ = request_ok(&mut stdin, &mut reader, "2", "camera.stop", json!({}));

    // The in-flight frame sampled before the stop arrives afterwards.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "recognition.frame",
        json!({ "descriptor": face }),
    );
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("stopped"));

    let records = request_ok(&mut stdin, &mut reader, "4", "attendance.records", json!({}));
    assert_eq!(
        records.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
}

#[test]
fn manual_absence_does_not_block_ai_present() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let face = descriptor(0.3);
    let student_id = enroll(&mut stdin, &mut reader, "1", "Mia Novak", "R-025", face.clone());
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "absent" }),
    );

    arm_pipeline(&mut stdin, &mut reader);
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "recognition.frame",
        json!({ "descriptor": face }),
    );
    // Only a present record counts for the once-per-day rule.
    assert_eq!(result.get("outcome").and_then(|v| v.as_str()), Some("marked"));
}
