//! ---
//! fao_section: "01-core-functionality"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Shared primitives and utilities for the factory runtime."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
//! Shared primitives for the Factory AI Optimize workspace.
//! This crate exposes configuration loading and logging bootstrap
//! consumed by the services, the daemon and the control CLI.

pub mod config;
pub mod logging;

pub use config::{
    AiConfig, AnalysisConfig, ApiConfig, AppConfig, CameraConfig, DroneConfig, FactoryLayout,
    InspectionConfig, LayoutZone, LimitsConfig, LoadedAppConfig, LoggingConfig, SimulationConfig,
};
pub use logging::{init_cli, init_tracing, LogFormat};
