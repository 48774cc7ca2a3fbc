//! ---
//! fao_section: "11-simulation"
//! fao_subsection: "01-bootstrap"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Simulation runtime module exports and shared types."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
//! Observation sources and the toy production simulator.
//!
//! Camera readings come from an [`ObservationSource`]: either the randomized
//! [`SyntheticFeed`] or a [`ReplayFeed`] backed by a recorded scenario file.

pub mod frames;
pub mod generator;
pub mod production;
pub mod replay;

use async_trait::async_trait;
use fao_common::config::CameraConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use frames::{activity_level, Anomaly, CameraAnalysis, MachineStatus, Observation};
pub use generator::SyntheticFeed;
pub use production::{ProductionSimulator, SimulationReport, NO_BOTTLENECKS};
pub use replay::{ReplayFeed, ReplayRecord};

/// Produces one analysis for a camera per capture call.
#[async_trait]
pub trait ObservationSource: Send + Sync + 'static {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn capture(&self, camera: &CameraConfig) -> anyhow::Result<CameraAnalysis>;
}

/// Build a random generator from an optional seed. `salt` decorrelates
/// components that share the configured seed.
pub fn seeded_rng(seed: Option<u64>, salt: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(salt)),
        None => StdRng::from_entropy(),
    }
}
