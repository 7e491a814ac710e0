use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::camera::CameraSession;
use crate::db;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Readiness of the externally loaded face model. Load failure is non-fatal:
/// recognition ticks degrade, manual attendance keeps working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed,
}

pub struct AppState {
    pub db: Connection,
    pub camera: CameraSession,
    pub model: ModelStatus,
    /// The "save" target: an in-memory copy of the collections, nothing more.
    pub snapshot: Option<serde_json::Value>,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            db: db::open_memory_db()?,
            camera: CameraSession::new(),
            model: ModelStatus::Loading,
            snapshot: None,
        })
    }
}
