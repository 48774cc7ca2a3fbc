//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Owned service graph and the analysis cycle."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::sync::Arc;

use fao_common::config::AppConfig;
use fao_sim::{seeded_rng, ObservationSource, ProductionSimulator, ReplayFeed, SimulationReport, SyntheticFeed};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::camera::CameraAggregator;
use crate::cost_benefit::{CostBenefit, CostBenefitEstimator, CostBenefitLookup};
use crate::drone::{DroneDispatcher, DroneStatus, InspectionResult};
use crate::errors::{FactoryError, Result};
use crate::insights::{InsightBackend, InsightCache, InsightGenerator};
use crate::twin::{DigitalTwinSnapshot, DigitalTwinStore};

const CAMERA_SALT: u64 = 1;
const COST_SALT: u64 = 2;
const DRONE_SALT: u64 = 3;
const PRODUCTION_SALT: u64 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedInsight {
    pub insight: String,
    pub cost_benefit: CostBenefit,
}

/// Every service the HTTP surface needs, built once from configuration.
#[derive(Debug)]
pub struct FactoryState {
    config: AppConfig,
    cameras: CameraAggregator,
    insights: InsightGenerator,
    costs: CostBenefitEstimator,
    twin: DigitalTwinStore,
    drones: DroneDispatcher,
    production: ProductionSimulator,
}

impl FactoryState {
    /// Build from config, picking the replay source when a scenario file is set.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let seed = config.simulation.random_seed;
        let source: Arc<dyn ObservationSource> = match &config.simulation.replay_file {
            Some(path) => Arc::new(ReplayFeed::from_path(path).map_err(FactoryError::Replay)?),
            None => Arc::new(SyntheticFeed::new(seeded_rng(seed, CAMERA_SALT))),
        };
        let backend = InsightBackend::from_config(&config.ai)?;
        Ok(Self::new(config, source, backend))
    }

    pub fn new(config: AppConfig, source: Arc<dyn ObservationSource>, backend: InsightBackend) -> Self {
        let seed = config.simulation.random_seed;
        let cache = Arc::new(InsightCache::new());
        let state = Self {
            cameras: CameraAggregator::new(config.cameras.clone(), source),
            insights: InsightGenerator::new(backend, Arc::clone(&cache)),
            costs: CostBenefitEstimator::new(cache, seeded_rng(seed, COST_SALT)),
            twin: DigitalTwinStore::new(&config),
            drones: DroneDispatcher::new(&config.drones, config.inspection.clone(), seeded_rng(seed, DRONE_SALT)),
            production: ProductionSimulator::new(seeded_rng(seed, PRODUCTION_SALT)),
            config,
        };
        info!(
            cameras = state.config.cameras.len(),
            drones = state.config.drones.len(),
            insights = state.insights.backend().kind(),
            "factory state ready"
        );
        state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn insight_generator(&self) -> &InsightGenerator {
        &self.insights
    }

    /// Capture, generate insights, fold them into the twin and estimate each one.
    pub async fn analyze_factory(&self) -> Vec<AnalyzedInsight> {
        info!("starting factory analysis");
        let observations = self.cameras.process_feeds().await;
        let insights = self.insights.generate_insights(&observations).await;
        self.twin.update_model(&insights);
        insights
            .into_iter()
            .take(self.config.analysis.top_insights)
            .map(|insight| AnalyzedInsight {
                cost_benefit: self.costs.estimate(&insight),
                insight,
            })
            .collect()
    }

    pub fn cost_benefit(&self, suggestion_id: &str) -> Result<CostBenefitLookup> {
        self.costs.cost_benefit(suggestion_id)
    }

    pub fn digital_twin(&self) -> DigitalTwinSnapshot {
        self.twin.current_model()
    }

    pub fn integrate_photogrammetry(&self, payload: serde_json::Value) {
        self.twin.integrate_photogrammetry(payload);
    }

    pub async fn inspect_area(&self, area: &str, drone_id: Option<&str>) -> Result<InspectionResult> {
        self.drones.inspect_area(area, drone_id).await
    }

    pub fn fleet_status(&self) -> Vec<DroneStatus> {
        self.drones.fleet_status()
    }

    pub fn simulate_production(&self, hours: f64, speed: f64) -> SimulationReport {
        self.production.run_simulation(hours, speed)
    }
}
