use serde::Serialize;

/// Length of the recognition net's identity vector. Enrollment rejects
/// anything else so the matcher never compares unequal vectors.
pub const DESCRIPTOR_LEN: usize = 128;

/// Maximum descriptor distance at which two faces count as the same person.
/// Strictly-below comparison: a probe at exactly the threshold is a miss.
pub const MATCH_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct EnrolledFace {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub descriptor: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceMatch {
    pub student_id: String,
    pub student_name: String,
    pub roll_number: String,
    pub distance: f32,
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Picks the enrolled face closest to the probe, accepting only distances
/// strictly below [`MATCH_THRESHOLD`]. The incumbent is replaced only on
/// strict improvement, so a tie keeps the first-enrolled student.
pub fn best_match(probe: &[f32], roster: &[EnrolledFace]) -> Option<FaceMatch> {
    let mut best: Option<FaceMatch> = None;
    for face in roster {
        if face.descriptor.len() != probe.len() {
            continue;
        }
        let distance = euclidean_distance(probe, &face.descriptor);
        if distance >= MATCH_THRESHOLD {
            continue;
        }
        let improves = match &best {
            Some(m) => distance < m.distance,
            None => true,
        };
        if improves {
            best = Some(FaceMatch {
                student_id: face.student_id.clone(),
                student_name: face.student_name.clone(),
                roll_number: face.roll_number.clone(),
                distance,
            });
        }
    }
    best
}

/// Parses a JSON descriptor array, enforcing the fixed length.
pub fn parse_descriptor(raw: &serde_json::Value) -> Result<Vec<f32>, String> {
    let Some(items) = raw.as_array() else {
        return Err("descriptor must be an array of numbers".to_string());
    };
    if items.len() != DESCRIPTOR_LEN {
        return Err(format!(
            "descriptor must have exactly {} components, got {}",
            DESCRIPTOR_LEN,
            items.len()
        ));
    }
    let mut out = Vec::with_capacity(DESCRIPTOR_LEN);
    for item in items {
        let Some(v) = item.as_f64() else {
            return Err("descriptor components must be numbers".to_string());
        };
        out.push(v as f32);
    }
    Ok(out)
}
