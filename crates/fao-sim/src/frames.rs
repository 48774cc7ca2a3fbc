//! ---
//! fao_section: "11-simulation"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Camera frame analysis types and activity scoring."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Object count at which a scene is considered fully active.
const SATURATION_OBJECTS: f64 = 40.0;

/// Normalize an object count into an activity level within `[0, 1]`.
pub fn activity_level(object_count: u32) -> f64 {
    if object_count == 0 {
        return 0.0;
    }
    (f64::from(object_count) / SATURATION_OBJECTS).min(1.0)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    UnexpectedObject,
    LowActivity,
    SafetyViolation,
}

impl Anomaly {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anomaly::UnexpectedObject => "unexpected_object",
            Anomaly::LowActivity => "low_activity",
            Anomaly::SafetyViolation => "safety_violation",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anomaly {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unexpected_object" => Ok(Anomaly::UnexpectedObject),
            "low_activity" => Ok(Anomaly::LowActivity),
            "safety_violation" => Ok(Anomaly::SafetyViolation),
            other => Err(format!("unknown anomaly tag: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    #[default]
    Operational,
    NeedsMaintenance,
    Down,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MachineStatus::Operational => "operational",
            MachineStatus::NeedsMaintenance => "needs_maintenance",
            MachineStatus::Down => "down",
        };
        f.write_str(label)
    }
}

/// What a single frame of one camera revealed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraAnalysis {
    pub object_count: u32,
    pub activity_level: f64,
    pub anomalies: Vec<Anomaly>,
    pub people_count: u32,
    pub machine_status: MachineStatus,
}

impl CameraAnalysis {
    /// Build an analysis deriving the activity level from the object count.
    pub fn from_counts(
        object_count: u32,
        anomalies: Vec<Anomaly>,
        people_count: u32,
        machine_status: MachineStatus,
    ) -> Self {
        Self {
            object_count,
            activity_level: activity_level(object_count),
            anomalies,
            people_count,
            machine_status,
        }
    }
}

/// One camera reading produced during an analysis cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub camera_id: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub analysis: CameraAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_saturates_at_forty_objects() {
        assert_eq!(activity_level(0), 0.0);
        assert_eq!(activity_level(10), 0.25);
        assert_eq!(activity_level(40), 1.0);
        assert_eq!(activity_level(59), 1.0);
        for count in 0..500 {
            let level = activity_level(count);
            assert!((0.0..=1.0).contains(&level));
            assert_eq!(level, (count as f64 / 40.0).min(1.0));
        }
    }

    #[test]
    fn anomaly_tags_parse_and_render() {
        for tag in ["unexpected_object", "low_activity", "safety_violation"] {
            let anomaly: Anomaly = tag.parse().unwrap();
            assert_eq!(anomaly.to_string(), tag);
        }
        assert!("smoke".parse::<Anomaly>().is_err());
    }

    #[test]
    fn analysis_serializes_camel_case() {
        let analysis = CameraAnalysis::from_counts(
            20,
            vec![Anomaly::LowActivity],
            3,
            MachineStatus::NeedsMaintenance,
        );
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["objectCount"], 20);
        assert_eq!(value["activityLevel"], 0.5);
        assert_eq!(value["anomalies"][0], "low_activity");
        assert_eq!(value["machineStatus"], "needs_maintenance");
    }
}
