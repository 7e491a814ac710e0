use serde::Serialize;
use serde_json::json;

/// Tick cadence for the detection loop, handed to the front end when the
/// session activates.
pub const DETECTION_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPhase {
    Idle,
    Requesting,
    Active,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    PermissionDenied,
    NoCamera,
    CameraInUse,
    Overconstrained,
    UnsupportedBrowser,
    Unknown,
}

/// Maps the platform's capture error names onto the closed taxonomy.
pub fn classify_error(name: &str) -> ErrorCategory {
    match name {
        "NotAllowedError" | "PermissionDeniedError" => ErrorCategory::PermissionDenied,
        "NotFoundError" | "DevicesNotFoundError" => ErrorCategory::NoCamera,
        "NotReadableError" | "TrackStartError" => ErrorCategory::CameraInUse,
        "OverconstrainedError" | "ConstraintNotSatisfiedError" => ErrorCategory::Overconstrained,
        "TypeError" => ErrorCategory::UnsupportedBrowser,
        _ => ErrorCategory::Unknown,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFailure {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
    /// Operator recovery actions; every terminal failure offers both.
    pub actions: Vec<&'static str>,
}

fn failure_for(category: ErrorCategory, platform_message: &str) -> CameraFailure {
    let (title, message) = match category {
        ErrorCategory::PermissionDenied => (
            "Camera Permission Denied",
            "Please allow camera access to use AI attendance. Use the camera icon in the \
             browser's address bar to grant access, then retry."
                .to_string(),
        ),
        ErrorCategory::NoCamera => (
            "No Camera Found",
            "No camera detected on this device. Connect a camera or use manual attendance entry."
                .to_string(),
        ),
        ErrorCategory::CameraInUse => (
            "Camera In Use",
            "The camera is already in use by another application. Close other apps using the \
             camera and try again."
                .to_string(),
        ),
        ErrorCategory::Overconstrained => (
            "Camera Configuration Error",
            "The camera does not support the requested settings.".to_string(),
        ),
        ErrorCategory::UnsupportedBrowser => (
            "Browser Not Supported",
            "This browser does not support camera access. Use Chrome, Firefox, Edge, or Safari."
                .to_string(),
        ),
        ErrorCategory::Unknown => (
            "Camera Access Failed",
            format!(
                "Camera error: {}. Please try manual attendance entry.",
                if platform_message.is_empty() {
                    "Unknown error"
                } else {
                    platform_message
                }
            ),
        ),
    };
    CameraFailure {
        category,
        title: title.to_string(),
        message,
        actions: vec!["retry", "manual"],
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTrack {
    pub id: String,
    pub kind: String,
    pub live: bool,
}

/// What the front end should do after reporting a capture failure.
#[derive(Debug, Clone)]
pub enum FailOutcome {
    /// One-shot constraint relaxation: re-request with minimal constraints.
    RetryWithMinimal,
    /// Terminal; surface the remediation card and wait for the operator.
    Terminal(CameraFailure),
}

/// Capture lifecycle: `Idle -> Requesting -> {Active | Failed}`. `Failed`
/// goes back to `Requesting` only through an explicit operator retry, and
/// the sole automatic transition is the single overconstrained fallback.
pub struct CameraSession {
    phase: CameraPhase,
    tracks: Vec<MediaTrack>,
    fallback_attempted: bool,
    last_failure: Option<CameraFailure>,
}

impl CameraSession {
    pub fn new() -> Self {
        Self {
            phase: CameraPhase::Idle,
            tracks: Vec::new(),
            fallback_attempted: false,
            last_failure: None,
        }
    }

    pub fn phase(&self) -> CameraPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == CameraPhase::Active
    }

    pub fn last_failure(&self) -> Option<&CameraFailure> {
        self.last_failure.as_ref()
    }

    pub fn live_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.live)
    }

    pub fn preferred_constraints() -> serde_json::Value {
        json!({
            "video": {
                "width": { "ideal": 1280 },
                "height": { "ideal": 720 },
                "facingMode": "user"
            },
            "audio": false
        })
    }

    pub fn minimal_constraints() -> serde_json::Value {
        json!({ "video": true })
    }

    /// Starts (or retries) a capture request. Returns the constraints the
    /// front end should pass to the platform.
    pub fn begin_request(&mut self) -> Result<serde_json::Value, &'static str> {
        match self.phase {
            CameraPhase::Idle | CameraPhase::Failed => {
                self.phase = CameraPhase::Requesting;
                self.fallback_attempted = false;
                self.last_failure = None;
                Ok(Self::preferred_constraints())
            }
            CameraPhase::Requesting => Err("capture request already in flight"),
            CameraPhase::Active => Err("camera already active"),
        }
    }

    /// Capture succeeded; register the platform's media tracks.
    pub fn activate(&mut self, tracks: Vec<MediaTrack>) -> Result<(), &'static str> {
        if self.phase != CameraPhase::Requesting {
            return Err("no capture request in flight");
        }
        self.phase = CameraPhase::Active;
        self.tracks = tracks;
        Ok(())
    }

    /// Capture failed. Overconstrained gets exactly one automatic retry with
    /// minimal constraints; everything else (including a second
    /// overconstrained failure) is terminal until the operator retries.
    pub fn fail(&mut self, error_name: &str, platform_message: &str) -> Result<FailOutcome, &'static str> {
        if self.phase != CameraPhase::Requesting {
            return Err("no capture request in flight");
        }
        let category = classify_error(error_name);
        if category == ErrorCategory::Overconstrained && !self.fallback_attempted {
            self.fallback_attempted = true;
            return Ok(FailOutcome::RetryWithMinimal);
        }
        let failure = failure_for(category, platform_message);
        self.phase = CameraPhase::Failed;
        self.last_failure = Some(failure.clone());
        Ok(FailOutcome::Terminal(failure))
    }

    /// Stops the session and releases every track. Safe from any phase;
    /// returns the ids of tracks that were live.
    pub fn stop(&mut self) -> Vec<String> {
        let stopped: Vec<String> = self
            .tracks
            .iter()
            .filter(|t| t.live)
            .map(|t| t.id.clone())
            .collect();
        for track in &mut self.tracks {
            track.live = false;
        }
        self.phase = CameraPhase::Idle;
        stopped
    }
}

impl Default for CameraSession {
    fn default() -> Self {
        Self::new()
    }
}
