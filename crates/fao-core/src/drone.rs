//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Drone roster, selection and simulated inspection flights."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use fao_common::config::{DroneConfig, InspectionConfig};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{FactoryError, Result};

pub const MODEL_UPDATE_TAG: &str = "updated_3d_model";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Waypoint {
    pub x: i32,
    pub y: i32,
}

const fn wp(x: i32, y: i32) -> Waypoint {
    Waypoint { x, y }
}

const ASSEMBLY_PATH: &[Waypoint] = &[wp(15, 15), wp(30, 15), wp(45, 15), wp(45, 30), wp(30, 30), wp(15, 30)];
const PACKAGING_PATH: &[Waypoint] = &[wp(85, 15), wp(100, 15), wp(115, 15), wp(115, 30), wp(100, 30), wp(85, 30)];
const STORAGE_PATH: &[Waypoint] = &[wp(145, 15), wp(160, 15), wp(175, 15), wp(175, 25), wp(160, 25), wp(145, 25)];
const SHIPPING_PATH: &[Waypoint] = &[
    wp(15, 85),
    wp(50, 85),
    wp(100, 85),
    wp(150, 85),
    wp(150, 110),
    wp(100, 110),
    wp(50, 110),
    wp(15, 110),
];
const DEFAULT_PATH: &[Waypoint] = &[wp(0, 0), wp(50, 0), wp(50, 50), wp(0, 50)];

/// Fixed survey route for a named area; unknown areas fly the default square.
pub fn inspection_path(area: &str) -> Vec<Waypoint> {
    let path = match area {
        "Assembly" => ASSEMBLY_PATH,
        "Packaging" => PACKAGING_PATH,
        "Storage" => STORAGE_PATH,
        "Shipping" => SHIPPING_PATH,
        _ => DEFAULT_PATH,
    };
    path.to_vec()
}

/// Summary line, optional issue and its probability for an area.
fn area_profile(area: &str) -> (&'static str, &'static str, f64) {
    match area {
        "Assembly" => ("Conveyor belt speed optimal", "Minor misalignment in station 3", 0.3),
        "Packaging" => ("Packaging materials well-stocked", "Label applicator needs calibration", 0.4),
        "Storage" => ("Inventory levels within expected range", "Thermal anomaly in northwest corner", 0.2),
        _ => ("No structural issues detected", "Dock door seal needs replacement", 0.5),
    }
}

fn inspection_findings<R: Rng + ?Sized>(area: &str, points: usize, rng: &mut R) -> Vec<String> {
    let (summary, issue, probability) = area_profile(area);
    let mut findings = vec![
        format!("Completed inspection of {area} area"),
        format!("Covered {points} inspection points"),
        summary.to_owned(),
    ];
    if rng.gen_bool(probability) {
        findings.push(issue.to_owned());
    }
    findings
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InspectionStatus {
    Completed,
    Failed,
    InProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResult {
    pub area: String,
    pub drone_id: String,
    pub status: InspectionStatus,
    pub path: Vec<Waypoint>,
    pub findings: Vec<String>,
    pub model_updates: Vec<String>,
    pub battery_remaining: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DroneStatus {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub capabilities: Vec<String>,
    pub battery: u8,
    pub busy: bool,
}

#[derive(Debug)]
struct DroneRuntime {
    config: DroneConfig,
    battery: u8,
    busy: bool,
}

#[derive(Debug)]
pub struct DroneDispatcher {
    roster: Mutex<IndexMap<String, DroneRuntime>>,
    settings: InspectionConfig,
    rng: Mutex<StdRng>,
}

impl DroneDispatcher {
    pub fn new(drones: &[DroneConfig], settings: InspectionConfig, rng: StdRng) -> Self {
        let roster = drones
            .iter()
            .map(|drone| {
                (
                    drone.id.clone(),
                    DroneRuntime {
                        config: drone.clone(),
                        battery: drone.battery,
                        busy: false,
                    },
                )
            })
            .collect();
        Self {
            roster: Mutex::new(roster),
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub fn fleet_status(&self) -> Vec<DroneStatus> {
        self.roster
            .lock()
            .values()
            .map(|drone| DroneStatus {
                id: drone.config.id.clone(),
                kind: drone.config.kind.clone(),
                capabilities: drone.config.capabilities.clone(),
                battery: drone.battery,
                busy: drone.busy,
            })
            .collect()
    }

    /// Fly an inspection of `area`, preferring `drone_id` when it is free.
    pub async fn inspect_area(&self, area: &str, drone_id: Option<&str>) -> Result<InspectionResult> {
        let reservation = self.reserve(drone_id)?;
        info!(area, drone = %reservation.drone_id, "initiating drone inspection");

        let path = inspection_path(area);
        if !self.settings.flight_delay.is_zero() {
            tokio::time::sleep(self.settings.flight_delay).await;
        }
        let findings = inspection_findings(area, path.len(), &mut *self.rng.lock());

        let drone_id = reservation.drone_id.clone();
        let battery_remaining = reservation.complete();
        debug!(drone = %drone_id, battery_remaining, "inspection finished");

        Ok(InspectionResult {
            area: area.to_owned(),
            drone_id,
            status: InspectionStatus::Completed,
            path,
            findings,
            model_updates: vec![MODEL_UPDATE_TAG.to_owned()],
            battery_remaining,
        })
    }

    /// Select and mark a drone busy in one critical section.
    fn reserve(&self, requested: Option<&str>) -> Result<Reservation<'_>> {
        let mut roster = self.roster.lock();
        let requested = requested
            .and_then(|id| roster.get(id))
            .filter(|drone| !drone.busy)
            .map(|drone| drone.config.id.clone());
        let selected = requested.or_else(|| {
            roster
                .values()
                .find(|drone| !drone.busy && drone.battery > self.settings.min_battery)
                .map(|drone| drone.config.id.clone())
        });
        let drone_id = selected.ok_or(FactoryError::NoAvailableDrone)?;
        if let Some(drone) = roster.get_mut(&drone_id) {
            drone.busy = true;
        }
        Ok(Reservation {
            dispatcher: self,
            drone_id,
            completed: false,
        })
    }
}

/// A drone held busy for one flight. Dropping it without completing releases
/// the drone with its battery untouched.
struct Reservation<'a> {
    dispatcher: &'a DroneDispatcher,
    drone_id: String,
    completed: bool,
}

impl Reservation<'_> {
    fn complete(mut self) -> u8 {
        self.completed = true;
        let mut roster = self.dispatcher.roster.lock();
        match roster.get_mut(&self.drone_id) {
            Some(drone) => {
                drone.battery = drone.battery.saturating_sub(self.dispatcher.settings.battery_cost);
                drone.busy = false;
                drone.battery
            }
            None => 0,
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if let Some(drone) = self.dispatcher.roster.lock().get_mut(&self.drone_id) {
            drone.busy = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn drone(id: &str, battery: u8) -> DroneConfig {
        DroneConfig {
            id: id.into(),
            kind: "quadcopter".into(),
            capabilities: vec!["video".into()],
            battery,
        }
    }

    fn settings(delay_ms: u64) -> InspectionConfig {
        InspectionConfig {
            flight_delay: Duration::from_millis(delay_ms),
            ..InspectionConfig::default()
        }
    }

    fn dispatcher(drones: &[DroneConfig], delay_ms: u64) -> DroneDispatcher {
        DroneDispatcher::new(drones, settings(delay_ms), StdRng::seed_from_u64(8))
    }

    #[test]
    fn paths_follow_area_table() {
        assert_eq!(inspection_path("Assembly").len(), 6);
        assert_eq!(inspection_path("Shipping").len(), 8);
        assert_eq!(inspection_path("Shipping")[4], Waypoint { x: 150, y: 110 });
        assert_eq!(inspection_path("Roof"), DEFAULT_PATH.to_vec());
        assert_eq!(inspection_path("assembly"), DEFAULT_PATH.to_vec());
    }

    #[test]
    fn findings_start_with_summary_lines() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let findings = inspection_findings("Storage", 6, &mut rng);
            assert_eq!(findings[0], "Completed inspection of Storage area");
            assert_eq!(findings[1], "Covered 6 inspection points");
            assert_eq!(findings[2], "Inventory levels within expected range");
            assert!(findings.len() == 3 || findings[3] == "Thermal anomaly in northwest corner");
        }
    }

    #[tokio::test]
    async fn inspection_drains_battery_and_releases_drone() {
        let dispatcher = dispatcher(&[drone("drone-1", 100)], 0);
        let result = dispatcher.inspect_area("Assembly", None).await.unwrap();
        assert_eq!(result.drone_id, "drone-1");
        assert_eq!(result.status, InspectionStatus::Completed);
        assert_eq!(result.battery_remaining, 85);
        assert_eq!(result.model_updates, vec![MODEL_UPDATE_TAG]);
        let fleet = dispatcher.fleet_status();
        assert_eq!(fleet[0].battery, 85);
        assert!(!fleet[0].busy);
    }

    #[tokio::test]
    async fn automatic_selection_skips_low_battery() {
        let dispatcher = dispatcher(&[drone("drone-1", 20), drone("drone-2", 21)], 0);
        let result = dispatcher.inspect_area("Packaging", None).await.unwrap();
        assert_eq!(result.drone_id, "drone-2");
        assert_eq!(result.battery_remaining, 6);
        let err = dispatcher.inspect_area("Packaging", None).await.unwrap_err();
        assert!(matches!(err, FactoryError::NoAvailableDrone));
    }

    #[tokio::test]
    async fn requested_drone_ignores_battery_floor() {
        let dispatcher = dispatcher(&[drone("drone-1", 100), drone("drone-2", 10)], 0);
        let result = dispatcher.inspect_area("Dock", Some("drone-2")).await.unwrap();
        assert_eq!(result.drone_id, "drone-2");
        assert_eq!(result.battery_remaining, 0);
        assert_eq!(result.path.len(), 4);
    }

    #[tokio::test]
    async fn unknown_requested_drone_falls_back() {
        let dispatcher = dispatcher(&[drone("drone-1", 100)], 0);
        let result = dispatcher.inspect_area("Storage", Some("drone-9")).await.unwrap();
        assert_eq!(result.drone_id, "drone-1");
    }

    #[tokio::test]
    async fn concurrent_flights_never_share_a_drone() {
        let dispatcher = Arc::new(dispatcher(&[drone("drone-1", 100)], 50));
        let first = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.inspect_area("Assembly", None).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(dispatcher.fleet_status()[0].busy);
        let second = dispatcher.inspect_area("Assembly", Some("drone-1")).await;
        assert!(matches!(second, Err(FactoryError::NoAvailableDrone)));
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.battery_remaining, 85);
    }

    #[tokio::test]
    async fn abandoned_flight_releases_drone() {
        let dispatcher = dispatcher(&[drone("drone-1", 100)], 1_000);
        let flight = dispatcher.inspect_area("Assembly", None);
        let outcome = tokio::time::timeout(Duration::from_millis(20), flight).await;
        assert!(outcome.is_err());
        let fleet = dispatcher.fleet_status();
        assert!(!fleet[0].busy);
        assert_eq!(fleet[0].battery, 100);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(InspectionStatus::InProgress).unwrap(),
            "in-progress"
        );
    }
}
