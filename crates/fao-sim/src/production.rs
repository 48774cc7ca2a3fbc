//! ---
//! fao_section: "11-simulation"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Toy production line simulator."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use parking_lot::Mutex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

const BASE_OUTPUT_PER_HOUR: f64 = 100.0;
const BASE_EFFICIENCY: f64 = 0.85;
const BASE_QUALITY: f64 = 0.95;
const QUALITY_LOSS_PER_SPEED: f64 = 0.05;
const OVERSPEED_DOWNTIME_MINUTES: u32 = 10;

pub const NO_BOTTLENECKS: &str = "No significant bottlenecks detected";

/// Outcome of one production run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub hours: f64,
    pub speed_factor: f64,
    pub units_produced: i64,
    pub defects: i64,
    /// Percentage of good units.
    pub quality_rate: f64,
    /// Percentage of nominal line efficiency.
    pub efficiency: f64,
    /// Minutes.
    pub downtime: u32,
    pub bottlenecks: Vec<String>,
}

/// Toy line model: output scales with speed, quality degrades with it.
#[derive(Debug)]
pub struct ProductionSimulator {
    rng: Mutex<StdRng>,
}

impl ProductionSimulator {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Run the line for `hours` at `speed` times nominal. Inputs are not validated;
    /// non-positive hours yield non-positive output.
    pub fn run_simulation(&self, hours: f64, speed: f64) -> SimulationReport {
        info!(hours, speed, "running production simulation");

        let efficiency = BASE_EFFICIENCY * speed;
        let quality_rate = quality_rate(speed);

        let units_produced = (BASE_OUTPUT_PER_HOUR * hours * efficiency).floor() as i64;
        let defects = (units_produced as f64 * (1.0 - quality_rate)).floor() as i64;

        let mut rng = self.rng.lock();
        let overspeed = if speed > 1.0 {
            OVERSPEED_DOWNTIME_MINUTES
        } else {
            0
        };
        let downtime = rng.gen_range(0..20) + overspeed;
        let bottlenecks = identify_bottlenecks(speed, &mut *rng);

        SimulationReport {
            hours,
            speed_factor: speed,
            units_produced,
            defects,
            quality_rate: quality_rate * 100.0,
            efficiency: efficiency * 100.0,
            downtime,
            bottlenecks,
        }
    }
}

/// Share of good units at the given speed, clamped into `[0, 1]`.
pub fn quality_rate(speed: f64) -> f64 {
    (BASE_QUALITY - QUALITY_LOSS_PER_SPEED * (speed - 1.0)).clamp(0.0, 1.0)
}

fn identify_bottlenecks<R: Rng + ?Sized>(speed: f64, rng: &mut R) -> Vec<String> {
    let mut bottlenecks = Vec::new();
    if speed > 1.2 {
        bottlenecks.push("Assembly line cannot keep up with demand".to_owned());
    }
    if speed > 1.5 {
        bottlenecks.push("Packaging station causing backlog".to_owned());
    }
    if rng.gen_bool(0.3) {
        bottlenecks.push("Quality control is understaffed".to_owned());
    }
    if rng.gen_bool(0.2) {
        bottlenecks.push("Material supply inconsistent".to_owned());
    }
    if bottlenecks.is_empty() {
        bottlenecks.push(NO_BOTTLENECKS.to_owned());
    }
    bottlenecks
}
