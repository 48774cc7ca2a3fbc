//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "In-memory digital twin of the plant."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use fao_common::config::{AppConfig, FactoryLayout};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

const EFFICIENCY_CEILING: f64 = 0.95;
const EFFICIENCY_STEP: f64 = 0.02;
const DOWNTIME_FLOOR: f64 = 0.01;
const DOWNTIME_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    #[default]
    Pending,
    Accepted,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TwinInsight {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: InsightStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraSummary {
    pub id: String,
    pub location: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DroneSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub battery: u8,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TwinStatistics {
    pub efficiency: f64,
    pub downtime: f64,
    pub throughput: f64,
}

impl Default for TwinStatistics {
    fn default() -> Self {
        Self {
            efficiency: 0.85,
            downtime: 0.05,
            throughput: 120.0,
        }
    }
}

/// Survey payload merged with the time it was applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photogrammetry {
    #[serde(flatten)]
    pub data: Map<String, Value>,
    pub integrated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DigitalTwinSnapshot {
    pub version: u64,
    pub factory_layout: FactoryLayout,
    pub cameras: Vec<CameraSummary>,
    pub drones: Vec<DroneSummary>,
    pub insights: Vec<TwinInsight>,
    pub last_updated: DateTime<Utc>,
    pub statistics: TwinStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photogrammetry: Option<Photogrammetry>,
}

impl DigitalTwinSnapshot {
    pub fn initial(config: &AppConfig) -> Self {
        Self {
            version: 1,
            factory_layout: config.factory_layout.clone(),
            cameras: config
                .cameras
                .iter()
                .map(|camera| CameraSummary {
                    id: camera.id.clone(),
                    location: camera.location.clone(),
                    status: "active".to_owned(),
                })
                .collect(),
            drones: config
                .drones
                .iter()
                .map(|drone| DroneSummary {
                    id: drone.id.clone(),
                    kind: drone.kind.clone(),
                    battery: drone.battery,
                    status: "idle".to_owned(),
                })
                .collect(),
            insights: Vec::new(),
            last_updated: Utc::now(),
            statistics: TwinStatistics::default(),
            photogrammetry: None,
        }
    }
}

fn twin_insight_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("insight-{}-{}", now.timestamp_millis(), &suffix[..6])
}

#[derive(Debug)]
pub struct DigitalTwinStore {
    snapshot: RwLock<DigitalTwinSnapshot>,
}

impl DigitalTwinStore {
    pub fn new(config: &AppConfig) -> Self {
        Self::from_snapshot(DigitalTwinSnapshot::initial(config))
    }

    pub fn from_snapshot(snapshot: DigitalTwinSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Append insights as pending, bump the version and nudge statistics.
    /// Each statistic moves at most once per call, however many insights match.
    pub fn update_model(&self, insights: &[String]) -> u64 {
        let now = Utc::now();
        let mut snapshot = self.snapshot.write();
        snapshot.version += 1;
        snapshot
            .insights
            .extend(insights.iter().map(|text| TwinInsight {
                id: twin_insight_id(now),
                text: text.clone(),
                timestamp: now,
                status: InsightStatus::Pending,
            }));

        let stats = &mut snapshot.statistics;
        if insights.iter().any(|text| text.contains("efficiency")) {
            stats.efficiency = (stats.efficiency + EFFICIENCY_STEP).min(EFFICIENCY_CEILING);
        }
        if insights.iter().any(|text| text.contains("downtime")) {
            stats.downtime = (stats.downtime - DOWNTIME_STEP).max(DOWNTIME_FLOOR);
        }
        snapshot.last_updated = now;
        info!(version = snapshot.version, added = insights.len(), "digital twin updated");
        snapshot.version
    }

    pub fn current_model(&self) -> DigitalTwinSnapshot {
        self.snapshot.read().clone()
    }

    /// Attach a survey payload. Non-object payloads are stored under `data`.
    /// The server timestamp replaces any `integratedAt` key the payload carries.
    pub fn integrate_photogrammetry(&self, payload: Value) {
        let mut data = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_owned(), other);
                map
            }
        };
        data.remove("integratedAt");
        info!(fields = data.len(), "integrating photogrammetry data into digital twin");
        self.snapshot.write().photogrammetry = Some(Photogrammetry {
            data,
            integrated_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> DigitalTwinStore {
        DigitalTwinStore::new(&AppConfig::default())
    }

    #[test]
    fn initial_snapshot_reflects_config() {
        let snapshot = store().current_model();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.cameras.len(), 2);
        assert!(snapshot.cameras.iter().all(|camera| camera.status == "active"));
        assert_eq!(snapshot.drones[0].status, "idle");
        assert_eq!(snapshot.drones[0].battery, 100);
        assert_eq!(snapshot.statistics, TwinStatistics::default());
        assert!(snapshot.insights.is_empty());
    }

    #[test]
    fn update_appends_and_versions() {
        let store = store();
        let first = store.update_model(&["Dock: Install racks".into()]);
        let second = store.update_model(&["Dock: Paint floor".into(), "Dock: Add fans".into()]);
        assert!(second > first);
        let snapshot = store.current_model();
        assert_eq!(snapshot.insights.len(), 3);
        assert!(snapshot.insights.iter().all(|i| i.status == InsightStatus::Pending));
        assert!(snapshot.insights[0].id.starts_with("insight-"));
        assert_eq!(snapshot.insights[0].id.rsplit('-').next().map(str::len), Some(6));
        assert_ne!(snapshot.insights[1].id, snapshot.insights[2].id);
    }

    #[test]
    fn statistics_nudge_once_per_update() {
        let store = store();
        store.update_model(&[
            "A: potential 15% efficiency gain".into(),
            "B: another efficiency gain".into(),
            "C: reduce downtime by 30%".into(),
        ]);
        let stats = store.current_model().statistics;
        assert!((stats.efficiency - 0.87).abs() < 1e-9);
        assert!((stats.downtime - 0.04).abs() < 1e-9);
    }

    #[test]
    fn statistics_respect_bounds() {
        let store = store();
        for _ in 0..20 {
            store.update_model(&["efficiency and downtime".into()]);
        }
        let stats = store.current_model().statistics;
        assert!((stats.efficiency - EFFICIENCY_CEILING).abs() < 1e-9);
        assert!((stats.downtime - DOWNTIME_FLOOR).abs() < 1e-9);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let store = store();
        let before = store.current_model();
        store.update_model(&["x".into()]);
        assert_eq!(before.version, 1);
        assert!(before.insights.is_empty());
    }

    #[test]
    fn photogrammetry_keeps_version_and_serializes_flat() {
        let store = store();
        store.integrate_photogrammetry(json!({"meshId": "m-7", "points": 1200}));
        let snapshot = store.current_model();
        assert_eq!(snapshot.version, 1);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["photogrammetry"]["meshId"], "m-7");
        assert!(value["photogrammetry"]["integratedAt"].is_string());
        assert!(value["factoryLayout"]["zones"].is_array());

        store.integrate_photogrammetry(json!([1, 2]));
        let value = serde_json::to_value(store.current_model()).unwrap();
        assert_eq!(value["photogrammetry"]["data"], json!([1, 2]));
    }

    #[test]
    fn photogrammetry_timestamp_overrides_payload_key() {
        let store = store();
        store.integrate_photogrammetry(json!({"integratedAt": "client", "mesh": 1}));
        let text = serde_json::to_string(&store.current_model()).unwrap();
        assert_eq!(text.matches("\"integratedAt\"").count(), 1);

        let parsed: DigitalTwinSnapshot = serde_json::from_str(&text).unwrap();
        let photogrammetry = parsed.photogrammetry.unwrap();
        assert_eq!(photogrammetry.data.get("mesh"), Some(&json!(1)));
        assert!(!photogrammetry.data.contains_key("integratedAt"));
        assert_eq!(parsed.version, 1);
    }
}
