//! ---
//! fao_section: "02-factory-services"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Factory services crate root."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
//! Factory services: camera aggregation, insight generation, cost-benefit
//! estimates, drone dispatch and the digital twin, wired together by
//! [`FactoryState`].

pub mod backend;
pub mod camera;
pub mod cost_benefit;
pub mod drone;
pub mod errors;
pub mod insights;
pub mod state;
pub mod twin;

pub use backend::ChatCompletionClient;
pub use camera::CameraAggregator;
pub use cost_benefit::{CostBenefit, CostBenefitEstimator, CostBenefitLookup};
pub use drone::{DroneDispatcher, DroneStatus, InspectionResult, InspectionStatus, Waypoint};
pub use errors::{FactoryError, Result};
pub use insights::{InsightBackend, InsightCache, InsightGenerator};
pub use state::{AnalyzedInsight, FactoryState};
pub use twin::{DigitalTwinSnapshot, DigitalTwinStore, InsightStatus, TwinInsight, TwinStatistics};
