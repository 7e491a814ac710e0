use crate::camera::{CameraSession, FailOutcome, MediaTrack, DETECTION_INTERVAL_MS};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn parse_tracks(params: &serde_json::Value) -> Result<Vec<MediaTrack>, &'static str> {
    let Some(items) = params.get("tracks").and_then(|v| v.as_array()) else {
        return Err("missing tracks");
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.get("id").and_then(|v| v.as_str()) else {
            return Err("track id must be a string");
        };
        let kind = item
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or("video");
        out.push(MediaTrack {
            id: id.to_string(),
            kind: kind.to_string(),
            live: true,
        });
    }
    Ok(out)
}

fn handle_camera_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.camera.begin_request() {
        Ok(constraints) => ok(
            &req.id,
            json!({ "phase": state.camera.phase(), "constraints": constraints }),
        ),
        Err(message) => err(&req.id, "camera_busy", message, None),
    }
}

fn handle_camera_opened(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracks = match parse_tracks(&req.params) {
        Ok(v) => v,
        Err(message) => return err(&req.id, "bad_params", message, None),
    };
    match state.camera.activate(tracks) {
        Ok(()) => ok(
            &req.id,
            json!({
                "phase": state.camera.phase(),
                "detectionIntervalMs": DETECTION_INTERVAL_MS,
            }),
        ),
        Err(message) => err(&req.id, "bad_state", message, None),
    }
}

fn handle_camera_failed(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(error_name) = req.params.get("errorName").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing errorName", None);
    };
    let platform_message = req
        .params
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match state.camera.fail(error_name, platform_message) {
        Ok(FailOutcome::RetryWithMinimal) => ok(
            &req.id,
            json!({
                "action": "retry",
                "constraints": CameraSession::minimal_constraints(),
            }),
        ),
        Ok(FailOutcome::Terminal(failure)) => ok(
            &req.id,
            json!({
                "action": "error",
                "phase": state.camera.phase(),
                "failure": failure,
            }),
        ),
        Err(message) => err(&req.id, "bad_state", message, None),
    }
}

fn handle_camera_stop(state: &mut AppState, req: &Request) -> serde_json::Value {
    let stopped = state.camera.stop();
    ok(
        &req.id,
        json!({ "phase": state.camera.phase(), "stoppedTracks": stopped }),
    )
}

fn handle_camera_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let live: Vec<&crate::camera::MediaTrack> = state.camera.live_tracks().collect();
    ok(
        &req.id,
        json!({
            "phase": state.camera.phase(),
            "liveTracks": live,
            "detectionIntervalMs": DETECTION_INTERVAL_MS,
            "lastFailure": state.camera.last_failure(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "camera.start" => Some(handle_camera_start(state, req)),
        "camera.opened" => Some(handle_camera_opened(state, req)),
        "camera.failed" => Some(handle_camera_failed(state, req)),
        "camera.stop" => Some(handle_camera_stop(state, req)),
        "camera.status" => Some(handle_camera_status(state, req)),
        _ => None,
    }
}
