//! ---
//! fao_section: "01-core-functionality"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "Shared primitives and utilities for the factory runtime."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use tracing::debug;

use crate::logging::LogFormat;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_AI_MODEL: &str = "AI_MODEL";
pub const ENV_MAX_CONCURRENT: &str = "MAX_CONCURRENT_PROCESSES";
pub const ENV_RETENTION_DAYS: &str = "DATA_RETENTION_DAYS";
pub const ENV_FACTORY_LAYOUT: &str = "FACTORY_LAYOUT";
pub const ENV_PORT: &str = "PORT";

fn default_cameras() -> Vec<CameraConfig> {
    vec![
        CameraConfig {
            id: "cam-1".to_owned(),
            url: "rtsp://camera1.prod".to_owned(),
            location: "Assembly Line A".to_owned(),
            field_of_view_deg: default_field_of_view(),
        },
        CameraConfig {
            id: "cam-2".to_owned(),
            url: "rtsp://camera2.prod".to_owned(),
            location: "Packaging Zone".to_owned(),
            field_of_view_deg: default_field_of_view(),
        },
    ]
}

fn default_drones() -> Vec<DroneConfig> {
    vec![DroneConfig {
        id: "drone-1".to_owned(),
        kind: "quadcopter".to_owned(),
        capabilities: vec!["video".to_owned(), "thermal".to_owned()],
        battery: default_battery(),
    }]
}

fn default_field_of_view() -> f64 {
    90.0
}

fn default_battery() -> u8 {
    100
}

fn default_ai_model() -> String {
    "gpt-4-vision".to_owned()
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_ai_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_insights() -> usize {
    5
}

fn default_flight_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_battery_cost() -> u8 {
    15
}

fn default_min_battery() -> u8 {
    20
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_api_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_max_concurrent() -> usize {
    4
}

fn default_retention_days() -> u32 {
    30
}

/// Primary configuration object for the factory services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraConfig>,
    #[serde(default = "default_drones")]
    pub drones: Vec<DroneConfig>,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub inspection: InspectionConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub factory_layout: FactoryLayout,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
///
/// `source` is `None` when no candidate file existed and built-in defaults were used.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "FAO_CONFIG";

    /// Load configuration together with the effective source path, then apply
    /// process environment overrides.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        let mut loaded = Self::locate(candidates)?;
        loaded
            .config
            .apply_env_overrides(|key| std::env::var(key).ok())?;
        loaded.config.validate()?;
        Ok(loaded)
    }

    fn locate<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using built-in defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply the environment variables understood by the service on top of
    /// the file configuration. `lookup` abstracts the environment for tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = value(ENV_API_KEY) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = value(ENV_AI_MODEL) {
            self.ai.model = model;
        }
        if let Some(raw) = value(ENV_MAX_CONCURRENT) {
            self.limits.max_concurrent_processes = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_CONCURRENT} must be an integer, got '{raw}'"))?;
        }
        if let Some(raw) = value(ENV_RETENTION_DAYS) {
            self.limits.data_retention_days = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_RETENTION_DAYS} must be an integer, got '{raw}'"))?;
        }
        if let Some(raw) = value(ENV_FACTORY_LAYOUT) {
            self.factory_layout = serde_json::from_str(&raw)
                .with_context(|| format!("{ENV_FACTORY_LAYOUT} must be a JSON layout document"))?;
        }
        if let Some(raw) = value(ENV_PORT) {
            let port: u16 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} must be a port number, got '{raw}'"))?;
            self.api.listen.set_port(port);
        }
        Ok(())
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.cameras.is_empty() {
            return Err(anyhow!("configuration must contain at least one camera"));
        }
        let mut seen = HashSet::new();
        for camera in &self.cameras {
            if !seen.insert(camera.id.as_str()) {
                return Err(anyhow!("duplicate camera id '{}'", camera.id));
            }
        }
        let mut seen = HashSet::new();
        for drone in &self.drones {
            if !seen.insert(drone.id.as_str()) {
                return Err(anyhow!("duplicate drone id '{}'", drone.id));
            }
            if drone.battery > 100 {
                return Err(anyhow!(
                    "drone '{}' battery must be a percentage, got {}",
                    drone.id,
                    drone.battery
                ));
            }
        }
        if self.analysis.top_insights == 0 {
            return Err(anyhow!("analysis.top_insights must be at least 1"));
        }
        self.api.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cameras: default_cameras(),
            drones: default_drones(),
            ai: AiConfig::default(),
            analysis: AnalysisConfig::default(),
            inspection: InspectionConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            limits: LimitsConfig::default(),
            factory_layout: FactoryLayout::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// A monitored location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    pub id: String,
    #[serde(default)]
    pub url: String,
    pub location: String,
    #[serde(default = "default_field_of_view")]
    pub field_of_view_deg: f64,
}

/// A fleet unit available for inspections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DroneConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_battery")]
    pub battery: u8,
}

#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl AiConfig {
    /// An external text-generation backend is used only when a key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            base_url: default_ai_base_url(),
            request_timeout: default_ai_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_top_insights")]
    pub top_insights: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_insights: default_top_insights(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionConfig {
    #[serde(default = "default_flight_delay")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub flight_delay: Duration,
    #[serde(default = "default_battery_cost")]
    pub battery_cost: u8,
    #[serde(default = "default_min_battery")]
    pub min_battery: u8,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            flight_delay: default_flight_delay(),
            battery_cost: default_battery_cost(),
            min_battery: default_min_battery(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulationConfig {
    /// Fixed seed for every random draw; entropy-seeded when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Recorded camera analyses replayed instead of synthetic draws.
    #[serde(default)]
    pub replay_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_api_listen(),
            static_dir: None,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                return Err(anyhow!(
                    "api static_dir {} does not exist or is not a directory",
                    dir.display()
                ));
            }
        }
        Ok(())
    }
}

/// Operational hints echoed for operators; no scheduler consumes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_processes: usize,
    #[serde(default = "default_retention_days")]
    pub data_retention_days: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_processes: default_max_concurrent(),
            data_retention_days: default_retention_days(),
        }
    }
}

/// Floor plan served by `/factory-layout` and embedded in the digital twin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactoryLayout {
    pub name: String,
    #[serde(default)]
    pub zones: Vec<LayoutZone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutZone {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutZone {
    fn new(name: &str, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            name: name.to_owned(),
            x,
            y,
            width,
            height,
        }
    }
}

impl Default for FactoryLayout {
    fn default() -> Self {
        Self {
            name: "Main Plant".to_owned(),
            zones: vec![
                LayoutZone::new("Assembly", 10.0, 10.0, 40.0, 25.0),
                LayoutZone::new("Packaging", 80.0, 10.0, 40.0, 25.0),
                LayoutZone::new("Storage", 140.0, 10.0, 40.0, 20.0),
                LayoutZone::new("Shipping", 10.0, 80.0, 145.0, 35.0),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::str::FromStr;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_mirror_demo_plant() {
        let config = AppConfig::default();
        assert_eq!(config.cameras.len(), 2);
        assert_eq!(config.cameras[0].location, "Assembly Line A");
        assert_eq!(config.drones[0].id, "drone-1");
        assert_eq!(config.drones[0].battery, 100);
        assert_eq!(config.ai.model, "gpt-4-vision");
        assert!(!config.ai.is_configured());
        assert_eq!(config.api.listen.port(), 3000);
        assert_eq!(config.inspection.flight_delay, Duration::from_millis(2000));
        config.validate().unwrap();
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = AppConfig::from_str(
            r#"
            [[cameras]]
            id = "cam-9"
            location = "Paint Shop"

            [inspection]
            flight_delay = 0

            [simulation]
            random_seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.cameras.len(), 1);
        assert_eq!(config.cameras[0].field_of_view_deg, 90.0);
        assert_eq!(config.inspection.flight_delay, Duration::ZERO);
        assert_eq!(config.inspection.battery_cost, 15);
        assert_eq!(config.simulation.random_seed, Some(7));
        assert_eq!(config.drones.len(), 1);
    }

    #[test]
    fn rejects_duplicate_drone_ids() {
        let err = AppConfig::from_str(
            r#"
            [[drones]]
            id = "d"
            type = "quadcopter"

            [[drones]]
            id = "d"
            type = "hexacopter"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate drone id"));
    }

    #[test]
    fn rejects_empty_camera_list() {
        let mut config = AppConfig::default();
        config.cameras.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply_on_top_of_file() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                (ENV_API_KEY, "sk-test"),
                (ENV_AI_MODEL, "gpt-4o-mini"),
                (ENV_MAX_CONCURRENT, "8"),
                (ENV_RETENTION_DAYS, "7"),
                (ENV_PORT, "8088"),
                (
                    ENV_FACTORY_LAYOUT,
                    r#"{"name":"Annex","zones":[{"name":"Dock","x":0,"y":0,"width":5,"height":5}]}"#,
                ),
            ]))
            .unwrap();
        assert!(config.ai.is_configured());
        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert_eq!(config.limits.max_concurrent_processes, 8);
        assert_eq!(config.limits.data_retention_days, 7);
        assert_eq!(config.api.listen.port(), 8088);
        assert_eq!(config.factory_layout.name, "Annex");
        assert_eq!(config.factory_layout.zones[0].name, "Dock");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[(ENV_API_KEY, "  "), (ENV_AI_MODEL, "")]))
            .unwrap();
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.ai.model, "gpt-4-vision");
    }

    #[test]
    fn invalid_env_number_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[(ENV_MAX_CONCURRENT, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_CONCURRENT));
    }

    #[test]
    fn locate_reads_first_existing_candidate() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(
            file,
            "[[cameras]]\nid = \"cam-x\"\nlocation = \"Loading Bay\""
        )?;
        file.flush()?;
        let missing = PathBuf::from("does/not/exist.toml");
        let loaded = AppConfig::locate(&[missing, file.path().to_path_buf()])?;
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert_eq!(loaded.config.cameras[0].id, "cam-x");
        Ok(())
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let ai = AiConfig {
            api_key: Some("sk-secret".into()),
            ..AiConfig::default()
        };
        let rendered = format!("{ai:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("redacted"));
    }
}
